//! Terraform edge builder: links variable/local/resource/module references
//! to their declarations, and module blocks to the directories their
//! `source` points at.
//!
//! Ported from `edges/config/terraform.py`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::Fragment;

const WEIGHT: f64 = 0.60;
const MODULE_SOURCE_WEIGHT: f64 = WEIGHT * 0.8;

static EXTENSIONS: &[&str] = &["tf", "tfvars", "hcl"];

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?m)^variable\s+"([^"]+)""#).unwrap());
static RESOURCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^resource\s+"([^"]+)"\s+"([^"]+)""#).unwrap());
static DATA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?m)^data\s+"([^"]+)"\s+"([^"]+)""#).unwrap());
static MODULE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?m)^module\s+"([^"]+)""#).unwrap());
static MODULE_SOURCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?m)source\s*=\s*"([^"]+)""#).unwrap());

static VAR_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"var\.(\w+)").unwrap());
static LOCAL_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"local\.(\w+)").unwrap());
static DATA_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"data\.(\w+)\.(\w+)").unwrap());
static RESOURCE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^.\w])(\w+)\.(\w+)\.(\w+)").unwrap());
static MODULE_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"module\.(\w+)").unwrap());

static RESOURCE_REF_SKIP: &[&str] = &["var", "local", "data", "module", "path", "terraform"];

fn is_terraform_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Extracts `locals { ... }` block bodies by brace counting (regex alone
/// can't balance nested braces in attribute values).
fn extract_locals_blocks(content: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let bytes = content.as_bytes();
    let mut search_from = 0usize;
    while let Some(rel) = content[search_from..].find("locals") {
        let start = search_from + rel;
        let after = &content[start + "locals".len()..];
        let Some(brace_rel) = after.find('{') else { break };
        let open = start + "locals".len() + brace_rel;
        let mut depth = 0i32;
        let mut end = open;
        for (i, &b) in bytes[open..].iter().enumerate() {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = open + i;
                        break;
                    }
                }
                _ => {}
            }
        }
        if end > open {
            blocks.push(content[open + 1..end].to_string());
        }
        search_from = end.max(open + 1);
    }
    blocks
}

struct Declarations {
    variables: HashMap<String, Vec<usize>>,
    locals: HashMap<String, Vec<usize>>,
    resources: HashMap<(String, String), Vec<usize>>,
    data_sources: HashMap<(String, String), Vec<usize>>,
    modules: HashMap<String, Vec<usize>>,
}

fn collect_declarations(fragments: &[&Fragment], indices: &[usize]) -> Declarations {
    let mut decl = Declarations {
        variables: HashMap::new(),
        locals: HashMap::new(),
        resources: HashMap::new(),
        data_sources: HashMap::new(),
        modules: HashMap::new(),
    };
    for &idx in indices {
        let frag = fragments[idx];
        for caps in VARIABLE_RE.captures_iter(&frag.content) {
            decl.variables.entry(caps[1].to_string()).or_default().push(idx);
        }
        for caps in RESOURCE_RE.captures_iter(&frag.content) {
            decl.resources.entry((caps[1].to_string(), caps[2].to_string())).or_default().push(idx);
        }
        for caps in DATA_RE.captures_iter(&frag.content) {
            decl.data_sources.entry((caps[1].to_string(), caps[2].to_string())).or_default().push(idx);
        }
        for caps in MODULE_RE.captures_iter(&frag.content) {
            decl.modules.entry(caps[1].to_string()).or_default().push(idx);
        }
        for block in extract_locals_blocks(&frag.content) {
            static LOCAL_KEY_RE: LazyLock<Regex> =
                LazyLock::new(|| Regex::new(r#"(?m)^\s*([a-zA-Z_][a-zA-Z0-9_-]*)\s*="#).unwrap());
            for caps in LOCAL_KEY_RE.captures_iter(&block) {
                decl.locals.entry(caps[1].to_string()).or_default().push(idx);
            }
        }
    }
    decl
}

pub struct TerraformEdgeBuilder;

impl EdgeBuilder for TerraformEdgeBuilder {
    fn category(&self) -> Category {
        Category::Config
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();

        let indices: Vec<usize> =
            ctx.fragments.iter().enumerate().filter(|(_, f)| is_terraform_file(f.path())).map(|(i, _)| i).collect();
        if indices.is_empty() {
            return edges;
        }

        let fragments: Vec<&Fragment> = ctx.fragments.iter().collect();
        let decl = collect_declarations(&fragments, &indices);

        for &idx in &indices {
            let frag = fragments[idx];

            for caps in VAR_REF_RE.captures_iter(&frag.content) {
                link_decl(&mut edges, frag, decl.variables.get(&caps[1]), &fragments, WEIGHT);
            }
            for caps in LOCAL_REF_RE.captures_iter(&frag.content) {
                link_decl(&mut edges, frag, decl.locals.get(&caps[1]), &fragments, WEIGHT);
            }
            for caps in DATA_REF_RE.captures_iter(&frag.content) {
                let key = (caps[1].to_string(), caps[2].to_string());
                link_decl(&mut edges, frag, decl.data_sources.get(&key), &fragments, WEIGHT);
            }
            for caps in MODULE_REF_RE.captures_iter(&frag.content) {
                link_decl(&mut edges, frag, decl.modules.get(&caps[1]), &fragments, WEIGHT);
            }
            for caps in RESOURCE_REF_RE.captures_iter(&frag.content) {
                let kind = &caps[1];
                if RESOURCE_REF_SKIP.contains(&kind) {
                    continue;
                }
                let key = (kind.to_string(), caps[2].to_string());
                link_decl(&mut edges, frag, decl.resources.get(&key), &fragments, WEIGHT);
            }
        }

        for &idx in &indices {
            let frag = fragments[idx];
            let Some(module_dir) = frag.path().parent() else { continue };
            for caps in MODULE_SOURCE_RE.captures_iter(&frag.content) {
                let source = &caps[1];
                if !(source.starts_with("./") || source.starts_with("../")) {
                    continue;
                }
                let target_dir = module_dir.join(source);
                for (other_idx, other) in fragments.iter().enumerate() {
                    if other_idx == idx {
                        continue;
                    }
                    if other.path().starts_with(&target_dir) {
                        add_edge(&mut edges, frag.id.clone(), other.id.clone(), MODULE_SOURCE_WEIGHT);
                    }
                }
            }
        }

        edges
    }
}

fn link_decl(edges: &mut EdgeMap, from: &Fragment, targets: Option<&Vec<usize>>, fragments: &[&Fragment], weight: f64) {
    let Some(targets) = targets else { return };
    for &idx in targets {
        let target = fragments[idx];
        if target.id == from.id {
            continue;
        }
        add_edge(edges, from.id.clone(), target.id.clone(), weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_terraform_extensions() {
        assert!(is_terraform_file(Path::new("main.tf")));
        assert!(is_terraform_file(Path::new("prod.tfvars")));
        assert!(!is_terraform_file(Path::new("main.rs")));
    }

    #[test]
    fn extract_locals_blocks_balances_nested_braces() {
        let content = "locals {\n  tags = {\n    env = \"prod\"\n  }\n  name = \"x\"\n}\n";
        let blocks = extract_locals_blocks(content);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("name"));
    }
}
