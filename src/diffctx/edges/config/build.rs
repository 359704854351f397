//! Build-system edge builder: links Makefile/CMake targets to the source
//! files and sub-includes they reference.
//!
//! Ported from `edges/config/build.py`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::Fragment;

const TARGET_WEIGHT: f64 = 0.50;
const FILE_REF_WEIGHT: f64 = 0.60;

static MAKE_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^([a-zA-Z0-9_.-]+):\s*(.*)$").unwrap());
static MAKE_INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*include\s+(.+)$").unwrap());
static CMAKE_ADD_EXE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)add_executable\(\s*\S+\s+([^)]+)\)").unwrap());
static CMAKE_ADD_LIB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)add_library\(\s*\S+\s+([^)]+)\)").unwrap());
static CMAKE_ADD_SUBDIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)add_subdirectory\(\s*['"]?([^'")\s]+)"#).unwrap());
static CMAKE_INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)^\s*include\(\s*['"]?([^'")\s]+)"#).unwrap());
static SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "h", "hpp", "hxx"];

fn is_makefile(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name == "Makefile" || name == "makefile" || name == "GNUmakefile" || name.ends_with(".mk")
}

fn is_cmake_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name == "CMakeLists.txt" || path.extension().and_then(|e| e.to_str()) == Some("cmake")
}

fn extract_make_sources(content: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for caps in MAKE_TARGET_RE.captures_iter(content) {
        let target = &caps[1];
        if target.starts_with('.') || target.contains('%') {
            continue;
        }
        for dep in caps[2].split_whitespace() {
            refs.push(dep.to_string());
        }
    }
    for caps in MAKE_INCLUDE_RE.captures_iter(content) {
        for inc in caps[1].split_whitespace() {
            refs.push(inc.trim_matches(['$', '(', ')']).to_string());
        }
    }
    refs
}

fn extract_cmake_sources(content: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for re in [&*CMAKE_ADD_EXE_RE, &*CMAKE_ADD_LIB_RE] {
        for caps in re.captures_iter(content) {
            for src in caps[1].split_whitespace() {
                refs.push(src.to_string());
            }
        }
    }
    for caps in CMAKE_ADD_SUBDIR_RE.captures_iter(content) {
        refs.push(format!("{}/CMakeLists.txt", caps[1].trim_end_matches('/')));
    }
    for caps in CMAKE_INCLUDE_RE.captures_iter(content) {
        refs.push(caps[1].to_string());
    }
    refs
}

pub struct BuildSystemEdgeBuilder;

impl EdgeBuilder for BuildSystemEdgeBuilder {
    fn category(&self) -> Category {
        Category::Config
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();

        let makefiles: Vec<&Fragment> = ctx.fragments.iter().filter(|f| is_makefile(f.path())).collect();
        let cmake_files: Vec<&Fragment> = ctx.fragments.iter().filter(|f| is_cmake_file(f.path())).collect();
        if makefiles.is_empty() && cmake_files.is_empty() {
            return edges;
        }

        for mf in &makefiles {
            let refs = extract_make_sources(&mf.content);
            link_refs(&mut edges, mf, &refs, ctx.fragments, TARGET_WEIGHT);
        }
        for cf in &cmake_files {
            let refs = extract_cmake_sources(&cf.content);
            link_refs(&mut edges, cf, &refs, ctx.fragments, TARGET_WEIGHT);
        }

        for builder_frag in makefiles.iter().chain(cmake_files.iter()) {
            let base_dir = builder_frag.path().parent();
            for src in ctx.fragments {
                let is_source_ext = src
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| SOURCE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false);
                if is_source_ext && src.path().parent() == base_dir {
                    add_edge(&mut edges, builder_frag.id.clone(), src.id.clone(), FILE_REF_WEIGHT * 0.5);
                }
            }
        }

        edges
    }
}

fn link_refs(edges: &mut EdgeMap, from: &Fragment, refs: &[String], fragments: &[Fragment], weight: f64) {
    if refs.is_empty() {
        return;
    }
    let base_dir = from.path().parent();
    for other in fragments {
        if other.id == from.id {
            continue;
        }
        let name = other.path().file_name().and_then(|n| n.to_str()).unwrap_or("");
        let matches_ref = refs.iter().any(|r| {
            let candidate = r.trim_start_matches("./");
            candidate == name || other.path().to_string_lossy().ends_with(candidate)
        });
        if matches_ref && (base_dir.is_none() || other.path().parent() == base_dir || other.path().starts_with(base_dir.unwrap())) {
            add_edge(edges, from.id.clone(), other.id.clone(), FILE_REF_WEIGHT);
        } else if matches_ref {
            add_edge(edges, from.id.clone(), other.id.clone(), weight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_makefile_and_cmake_names() {
        assert!(is_makefile(Path::new("Makefile")));
        assert!(is_makefile(Path::new("rules.mk")));
        assert!(is_cmake_file(Path::new("CMakeLists.txt")));
    }

    #[test]
    fn extract_make_sources_reads_target_dependencies() {
        let content = "app: main.o utils.o\n\tgcc -o app main.o utils.o\n";
        let refs = extract_make_sources(content);
        assert!(refs.contains(&"main.o".to_string()));
        assert!(refs.contains(&"utils.o".to_string()));
    }
}
