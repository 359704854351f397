//! Helm edge builder: links chart templates to the values they interpolate,
//! to named templates they `include`, and to `Chart.yaml`.
//!
//! Ported from `edges/config/helm.py`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::Fragment;

const WEIGHT: f64 = 0.70;

static VALUES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*\.Values\.([a-zA-Z0-9_.]+)\s*\}\}").unwrap());
static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\{\s*(?:include|template)\s+"([^"]+)""#).unwrap());
static DEFINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?m)^\{\{-?\s*define\s+"([^"]+)""#).unwrap());
static YAML_KEY_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^(\s*)([a-zA-Z_][a-zA-Z0-9_-]*)\s*:"#).unwrap());

fn is_template(path: &Path) -> bool {
    let has_templates_segment = path.components().any(|c| c.as_os_str() == "templates");
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "yaml" | "yml" | "tpl"))
        .unwrap_or(false);
    has_templates_segment && ext_ok
}

fn is_values_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_lowercase();
    name == "values.yaml" || name == "values.yml" || name.starts_with("values-") || name.starts_with("values_")
}

fn is_chart_yaml(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_lowercase();
    name == "chart.yaml" || name == "chart.yml"
}

/// Extracts dotted key paths from a values file using indentation depth to
/// reconstruct nesting (YAML itself is indentation-sensitive, so a stack of
/// `(indent, key)` suffices without a full parser).
fn extract_value_paths(content: &str) -> Vec<String> {
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut paths = Vec::new();
    for caps in YAML_KEY_PATH_RE.captures_iter(content) {
        let indent = caps[1].len();
        let key = caps[2].to_string();
        while stack.last().is_some_and(|(i, _)| *i >= indent) {
            stack.pop();
        }
        let full = if let Some((_, parent)) = stack.last() {
            format!("{parent}.{key}")
        } else {
            key.clone()
        };
        paths.push(full.clone());
        stack.push((indent, full));
    }
    paths
}

pub struct HelmEdgeBuilder;

impl EdgeBuilder for HelmEdgeBuilder {
    fn category(&self) -> Category {
        Category::Config
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();

        let templates: Vec<&Fragment> = ctx.fragments.iter().filter(|f| is_template(f.path())).collect();
        if templates.is_empty() {
            return edges;
        }

        let values_files: Vec<&Fragment> = ctx.fragments.iter().filter(|f| is_values_file(f.path())).collect();
        let chart_files: Vec<&Fragment> = ctx.fragments.iter().filter(|f| is_chart_yaml(f.path())).collect();

        let mut value_index: HashMap<String, Vec<&Fragment>> = HashMap::new();
        for vf in &values_files {
            for path in extract_value_paths(&vf.content) {
                value_index.entry(path).or_default().push(vf);
            }
        }

        let mut define_index: HashMap<String, Vec<&Fragment>> = HashMap::new();
        for tmpl in &templates {
            for caps in DEFINE_RE.captures_iter(&tmpl.content) {
                define_index.entry(caps[1].to_string()).or_default().push(tmpl);
            }
        }

        for tmpl in &templates {
            for caps in VALUES_RE.captures_iter(&tmpl.content) {
                let key = &caps[1];
                for (path, targets) in &value_index {
                    if path == key || path.starts_with(&format!("{key}.")) || key.starts_with(&format!("{path}.")) {
                        for target in targets {
                            add_edge(&mut edges, tmpl.id.clone(), target.id.clone(), WEIGHT);
                        }
                    }
                }
            }
            for caps in INCLUDE_RE.captures_iter(&tmpl.content) {
                let name = &caps[1];
                if let Some(targets) = define_index.get(name) {
                    for target in targets {
                        if target.id != tmpl.id {
                            add_edge(&mut edges, tmpl.id.clone(), target.id.clone(), WEIGHT);
                        }
                    }
                }
            }
            for chart in &chart_files {
                let same_chart = tmpl
                    .path()
                    .parent()
                    .and_then(|p| p.parent())
                    .zip(chart.path().parent())
                    .map(|(a, b)| a == b)
                    .unwrap_or(false);
                if same_chart {
                    add_edge(&mut edges, tmpl.id.clone(), chart.id.clone(), WEIGHT * 0.6);
                }
            }
        }

        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_templates_and_values_and_chart_files() {
        assert!(is_template(Path::new("mychart/templates/deployment.yaml")));
        assert!(!is_template(Path::new("mychart/values.yaml")));
        assert!(is_values_file(Path::new("values-prod.yaml")));
        assert!(is_chart_yaml(Path::new("mychart/Chart.yaml")));
    }

    #[test]
    fn extract_value_paths_tracks_nesting_by_indent() {
        let content = "image:\n  repository: nginx\n  tag: latest\nreplicas: 3\n";
        let paths = extract_value_paths(content);
        assert!(paths.contains(&"image.repository".to_string()));
        assert!(paths.contains(&"image.tag".to_string()));
        assert!(paths.contains(&"replicas".to_string()));
    }
}
