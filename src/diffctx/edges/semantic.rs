//! Semantic edge builder: import/definition/reference edges, generalized
//! across language families by regex rather than a per-language AST.
//!
//! Ported from `edges/semantic/*.py`: one reference-resolution pass, run
//! once per language family with that family's extension set and weight
//! constants (`edges/semantic/python.py`, `rust.py`, `go.py`,
//! `javascript.py`, `jvm.py`, `php.py`, `ruby.py`, `c_family.py`,
//! `dotnet.py`, `swift.py`, `shell.py` each define their own `weight`/
//! `*_weight`/`reverse_weight_factor` class attributes rather than sharing
//! one global constant). The per-language source files each re-derive the
//! same call/import/type-reference regex shapes for their syntax; rather
//! than hand-translate eleven near-identical regex sets, this keeps the
//! single generalized scanner and varies the weight profile and file-type
//! gate per family, folding each family's distinct "same enclosing scope"
//! bonus (same crate/package/namespace/module/directory) into one
//! `same_scope_weight` field.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::{Fragment, FragmentId};

/// Per-language-family weight profile, grounded on that family's reference
/// module. `same_scope_weight` is `None` for families whose reference
/// implementation has no same-crate/package/namespace bonus (Python,
/// JavaScript, C family).
pub struct LanguageProfile {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub call_weight: f64,
    pub symbol_ref_weight: f64,
    pub type_ref_weight: f64,
    pub reverse_weight_factor: f64,
    pub same_scope_weight: Option<f64>,
}

pub static PYTHON: LanguageProfile = LanguageProfile {
    name: "python",
    extensions: &[".py", ".pyi", ".pyw"],
    call_weight: 0.85,
    symbol_ref_weight: 0.95,
    type_ref_weight: 0.60,
    reverse_weight_factor: 0.50,
    same_scope_weight: None,
};

pub static RUST: LanguageProfile = LanguageProfile {
    name: "rust",
    extensions: &[".rs"],
    call_weight: 0.75,
    symbol_ref_weight: 0.60,
    type_ref_weight: 0.65,
    reverse_weight_factor: 0.40,
    same_scope_weight: Some(0.50),
};

pub static GO: LanguageProfile = LanguageProfile {
    name: "go",
    extensions: &[".go"],
    call_weight: 0.75,
    symbol_ref_weight: 0.60,
    type_ref_weight: 0.65,
    reverse_weight_factor: 0.40,
    same_scope_weight: Some(0.55),
};

pub static JAVASCRIPT: LanguageProfile = LanguageProfile {
    name: "javascript",
    extensions: &[".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs", ".mts", ".cts"],
    call_weight: 0.70,
    symbol_ref_weight: 0.75,
    type_ref_weight: 0.65,
    reverse_weight_factor: 0.50,
    same_scope_weight: None,
};

pub static JVM: LanguageProfile = LanguageProfile {
    name: "jvm",
    extensions: &[".java", ".kt", ".kts", ".scala", ".sc"],
    call_weight: 0.70,
    symbol_ref_weight: 0.75,
    type_ref_weight: 0.60,
    reverse_weight_factor: 0.40,
    same_scope_weight: Some(0.55),
};

pub static PHP: LanguageProfile = LanguageProfile {
    name: "php",
    extensions: &[".php", ".phtml", ".php3", ".php4", ".php5", ".php7", ".phps"],
    call_weight: 0.70,
    symbol_ref_weight: 0.75,
    type_ref_weight: 0.60,
    reverse_weight_factor: 0.40,
    same_scope_weight: Some(0.55),
};

pub static RUBY: LanguageProfile = LanguageProfile {
    name: "ruby",
    extensions: &[".rb", ".rake", ".gemspec"],
    call_weight: 0.70,
    symbol_ref_weight: 0.75,
    type_ref_weight: 0.60,
    reverse_weight_factor: 0.40,
    same_scope_weight: Some(0.50),
};

pub static C_FAMILY: LanguageProfile = LanguageProfile {
    name: "c_family",
    extensions: &[
        ".c", ".h", ".cpp", ".hpp", ".cc", ".cxx", ".hxx", ".c++", ".h++", ".hh", ".ipp", ".tpp", ".m", ".mm",
    ],
    call_weight: 0.70,
    symbol_ref_weight: 0.65,
    type_ref_weight: 0.50,
    reverse_weight_factor: 0.40,
    same_scope_weight: None,
};

pub static DOTNET: LanguageProfile = LanguageProfile {
    name: "dotnet",
    extensions: &[".cs", ".fs", ".fsi", ".fsx"],
    call_weight: 0.70,
    symbol_ref_weight: 0.75,
    type_ref_weight: 0.60,
    reverse_weight_factor: 0.40,
    same_scope_weight: Some(0.55),
};

pub static SWIFT: LanguageProfile = LanguageProfile {
    name: "swift",
    extensions: &[".swift"],
    call_weight: 0.75,
    symbol_ref_weight: 0.60,
    type_ref_weight: 0.65,
    reverse_weight_factor: 0.40,
    same_scope_weight: Some(0.50),
};

pub static SHELL: LanguageProfile = LanguageProfile {
    name: "shell",
    extensions: &[".sh", ".bash", ".zsh", ".ksh", ".fish", ".ps1", ".psm1", ".psd1"],
    call_weight: 0.55,
    symbol_ref_weight: 0.65,
    type_ref_weight: 0.0,
    reverse_weight_factor: 0.35,
    same_scope_weight: None,
};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:use|import|from|require|source)\s+([A-Za-z_][A-Za-z0-9_:./]*)"#).unwrap()
});

static CALL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[:<]\s*([A-Z][A-Za-z0-9_]*)\b").unwrap());

/// `path_to_module`: strip a leading `src`/`lib`/`packages` segment and any
/// extension, mirroring `edges/base.py::path_to_module`.
fn path_to_module(path: &Path) -> String {
    let mut comps: Vec<&str> = path.components().filter_map(|c| c.as_os_str().to_str()).collect();
    if matches!(comps.first(), Some(&"src") | Some(&"lib") | Some(&"packages")) {
        comps.remove(0);
    }
    let joined = comps.join("/");
    let without_ext = joined.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(&joined);
    without_ext.trim_end_matches("/__init__").replace('/', ".")
}

fn matches_profile(path: &Path, profile: &LanguageProfile) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| profile.extensions.iter().any(|p| p.trim_start_matches('.').eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Top-level directory a fragment's file lives under, used as a
/// language-agnostic stand-in for "same crate"/"same package"/"same
/// namespace"/"same module"/"same directory" — each family's reference
/// builder derives this from language-specific declarations (a `mod.rs`,
/// a `package` statement, a `.csproj`); this scanner has none of that, so
/// it approximates with the shared top-level directory instead.
fn scope_of(path: &Path) -> Option<String> {
    path.parent().map(|p| p.to_string_lossy().into_owned()).filter(|s| !s.is_empty())
}

/// One language family's semantic edge builder: call/symbol-ref/type-ref
/// resolution plus import-based file discovery, scoped to `profile`'s
/// extension set and weighted per `profile`'s constants.
pub struct SemanticEdgeBuilder {
    pub profile: &'static LanguageProfile,
}

impl EdgeBuilder for SemanticEdgeBuilder {
    fn category(&self) -> Category {
        Category::Semantic
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();
        let profile = self.profile;

        let family_frags: Vec<&Fragment> = ctx.fragments.iter().filter(|f| matches_profile(f.path(), profile)).collect();
        if family_frags.is_empty() {
            return edges;
        }

        // name -> defining fragment ids, scoped to this family.
        let mut defs: HashMap<String, Vec<FragmentId>> = HashMap::new();
        for frag in &family_frags {
            if let Some(name) = &frag.symbol_name {
                defs.entry(name.clone()).or_default().push(frag.id.clone());
            }
        }

        for frag in &family_frags {
            if profile.call_weight > 0.0 {
                for caps in CALL_RE.captures_iter(&frag.content) {
                    let name = caps.get(1).unwrap().as_str();
                    self.add_ref_edges(&mut edges, frag, name, defs.get(name), profile.call_weight);
                }
            }
            if profile.type_ref_weight > 0.0 {
                for caps in TYPE_RE.captures_iter(&frag.content) {
                    let name = caps.get(1).unwrap().as_str();
                    self.add_ref_edges(&mut edges, frag, name, defs.get(name), profile.type_ref_weight);
                }
            }
            for ident in &frag.identifiers {
                if let Some(targets) = defs.get(ident) {
                    self.add_ref_edges(&mut edges, frag, ident, Some(targets), profile.symbol_ref_weight);
                }
            }
        }

        if let Some(same_scope_weight) = profile.same_scope_weight {
            let mut by_scope: HashMap<String, Vec<&Fragment>> = HashMap::new();
            for frag in &family_frags {
                if let Some(scope) = scope_of(frag.path()) {
                    by_scope.entry(scope).or_default().push(frag);
                }
            }
            for frags in by_scope.values() {
                for a in frags {
                    for b in frags {
                        if a.id == b.id || a.path() == b.path() {
                            continue;
                        }
                        add_edge(&mut edges, a.id.clone(), b.id.clone(), same_scope_weight);
                    }
                }
            }
        }

        edges
    }

    fn discover_related_files(&self, ctx: &BuildContext<'_>, changed: &[PathBuf]) -> Vec<PathBuf> {
        let profile = self.profile;
        let family_changed: Vec<&PathBuf> = changed.iter().filter(|p| matches_profile(p, profile)).collect();
        if family_changed.is_empty() {
            return Vec::new();
        }

        let mut modules: HashMap<String, PathBuf> = HashMap::new();
        for path in ctx.by_path.keys() {
            if matches_profile(path, profile) {
                modules.insert(path_to_module(path), path.clone());
            }
        }

        let mut out = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for changed_path in family_changed {
            let content: String =
                ctx.fragments_in(changed_path).map(|f| f.content.as_str()).collect::<Vec<_>>().join("\n");

            // Forward: files this one imports.
            for caps in IMPORT_RE.captures_iter(&content) {
                let imported = caps.get(1).unwrap().as_str().replace(['/', ':'], ".");
                for (module, path) in &modules {
                    if (module == &imported || imported.ends_with(module.as_str())) && seen.insert(path.clone()) {
                        out.push(path.clone());
                    }
                }
            }

            // Backward: files that import this one.
            let this_module = path_to_module(changed_path);
            if this_module.is_empty() {
                continue;
            }
            for path in ctx.by_path.keys() {
                if path == changed_path || !matches_profile(path, profile) {
                    continue;
                }
                let other_content: String =
                    ctx.fragments_in(path).map(|f| f.content.as_str()).collect::<Vec<_>>().join("\n");
                if IMPORT_RE
                    .captures_iter(&other_content)
                    .any(|c| c.get(1).unwrap().as_str().contains(this_module.as_str()))
                    && seen.insert(path.clone())
                {
                    out.push(path.clone());
                }
            }
        }

        out
    }
}

impl SemanticEdgeBuilder {
    fn add_ref_edges(
        &self,
        edges: &mut EdgeMap,
        referencing: &Fragment,
        name: &str,
        targets: Option<&Vec<FragmentId>>,
        weight: f64,
    ) {
        let Some(targets) = targets else { return };
        for target in targets {
            if *target == referencing.id {
                continue;
            }
            // Skip self-definition: a fragment referencing the very name it defines.
            if referencing.symbol_name.as_deref() == Some(name) {
                continue;
            }
            add_edge(edges, referencing.id.clone(), target.clone(), weight);
            add_edge(edges, target.clone(), referencing.id.clone(), weight * self.profile.reverse_weight_factor);
        }
    }
}

/// One builder per language family, in the order the reference
/// implementation's `edges/semantic/__init__.py` registers them.
pub fn family_builders() -> Vec<SemanticEdgeBuilder> {
    vec![
        SemanticEdgeBuilder { profile: &PYTHON },
        SemanticEdgeBuilder { profile: &RUST },
        SemanticEdgeBuilder { profile: &GO },
        SemanticEdgeBuilder { profile: &JAVASCRIPT },
        SemanticEdgeBuilder { profile: &JVM },
        SemanticEdgeBuilder { profile: &PHP },
        SemanticEdgeBuilder { profile: &RUBY },
        SemanticEdgeBuilder { profile: &C_FAMILY },
        SemanticEdgeBuilder { profile: &DOTNET },
        SemanticEdgeBuilder { profile: &SWIFT },
        SemanticEdgeBuilder { profile: &SHELL },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_to_module_strips_src_prefix_and_extension() {
        assert_eq!(path_to_module(Path::new("src/utils/tax.rs")), "utils.tax");
    }

    #[test]
    fn path_to_module_strips_init() {
        assert_eq!(path_to_module(Path::new("pkg/__init__.py")), "pkg");
    }

    #[test]
    fn matches_profile_is_case_insensitive_and_family_scoped() {
        assert!(matches_profile(Path::new("a.RS"), &RUST));
        assert!(!matches_profile(Path::new("a.py"), &RUST));
    }

    #[test]
    fn rust_and_python_profiles_carry_distinct_weights() {
        assert_ne!(RUST.call_weight, PYTHON.call_weight);
        assert!(RUST.same_scope_weight.is_some());
        assert!(PYTHON.same_scope_weight.is_none());
    }
}
