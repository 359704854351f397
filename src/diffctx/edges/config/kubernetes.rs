//! Kubernetes manifest edge builder: links configMap/secret references,
//! service selectors, and image references across manifests.
//!
//! Ported from `edges/config/kubernetes.py`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::Fragment;

const WEIGHT: f64 = 0.65;
const CONFIGMAP_SECRET_WEIGHT: f64 = 0.70;
const SERVICE_WEIGHT: f64 = 0.60;
const SELECTOR_WEIGHT: f64 = 0.55;
const IMAGE_WEIGHT: f64 = 0.40;

static K8S_KINDS: &[&str] = &[
    "deployment", "statefulset", "daemonset", "replicaset", "pod", "job", "cronjob", "service", "ingress",
    "configmap", "secret", "persistentvolumeclaim", "persistentvolume", "namespace", "serviceaccount",
    "role", "rolebinding", "clusterrole", "clusterrolebinding", "networkpolicy", "horizontalpodautoscaler",
];

static KIND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^kind:\s*(\w+)").unwrap());
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?m)^\s*name:\s*['"]?([a-zA-Z0-9_.-]+)"#).unwrap());
static CONFIGMAP_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"configMapKeyRef:\s*\n\s*name:\s*['"]?([a-zA-Z0-9_.-]+)"#).unwrap());
static SECRET_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"secretKeyRef:\s*\n\s*name:\s*['"]?([a-zA-Z0-9_.-]+)"#).unwrap());
static CONFIGMAP_VOLUME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"configMap:\s*\n\s*name:\s*['"]?([a-zA-Z0-9_.-]+)"#).unwrap());
static SECRET_VOLUME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"secret:\s*\n\s*secretName:\s*['"]?([a-zA-Z0-9_.-]+)"#).unwrap());
static SERVICE_NAME_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"serviceName:\s*['"]?([a-zA-Z0-9_.-]+)"#).unwrap());
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?m)^\s*image:\s*['"]?([^\s'"]+)"#).unwrap());
static LABELS_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(?:labels|selector|matchLabels):\s*$").unwrap());
static LABEL_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*([a-zA-Z0-9_./-]+):\s*['"]?([a-zA-Z0-9_.-]+)"#).unwrap());

fn is_k8s_manifest(path: &Path, content: &str) -> bool {
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "yaml" | "yml"))
        .unwrap_or(false);
    if !ext_ok {
        return false;
    }
    KIND_RE
        .captures(content)
        .map(|c| K8S_KINDS.contains(&c[1].to_lowercase().as_str()))
        .unwrap_or(false)
}

fn manifest_name(content: &str) -> Option<String> {
    NAME_RE.captures(content).map(|c| c[1].to_string())
}

/// Finds `labels:`/`selector:`/`matchLabels:` blocks and reads the
/// more-indented `key: value` lines that follow, by indentation rather than
/// a regex backreference (the block's body indent isn't known up front).
fn extract_label_pairs(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        let Some(caps) = LABELS_HEADER_RE.captures(lines[i]) else {
            i += 1;
            continue;
        };
        let header_indent = caps[1].len();
        i += 1;
        while i < lines.len() {
            let line = lines[i];
            if line.trim().is_empty() {
                i += 1;
                continue;
            }
            let indent = line.len() - line.trim_start().len();
            if indent <= header_indent {
                break;
            }
            if let Some(pair) = LABEL_PAIR_RE.captures(line) {
                pairs.push((pair[1].to_string(), pair[2].to_string()));
            }
            i += 1;
        }
    }
    pairs
}

pub struct KubernetesEdgeBuilder;

impl EdgeBuilder for KubernetesEdgeBuilder {
    fn category(&self) -> Category {
        Category::Config
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();

        let manifests: Vec<&Fragment> =
            ctx.fragments.iter().filter(|f| is_k8s_manifest(f.path(), &f.content)).collect();
        if manifests.len() < 2 {
            return edges;
        }

        let mut by_name: HashMap<String, Vec<&Fragment>> = HashMap::new();
        for m in &manifests {
            if let Some(name) = manifest_name(&m.content) {
                by_name.entry(name).or_default().push(m);
            }
        }

        for m in &manifests {
            for re in [&*CONFIGMAP_REF_RE, &*CONFIGMAP_VOLUME_RE] {
                link_by_name(&mut edges, m, re, &by_name, CONFIGMAP_SECRET_WEIGHT);
            }
            for re in [&*SECRET_REF_RE, &*SECRET_VOLUME_RE] {
                link_by_name(&mut edges, m, re, &by_name, CONFIGMAP_SECRET_WEIGHT);
            }
            link_by_name(&mut edges, m, &SERVICE_NAME_REF_RE, &by_name, SERVICE_WEIGHT);

            if let Some(caps) = IMAGE_RE.captures(&m.content) {
                let image = &caps[1];
                for other in &manifests {
                    if other.id == m.id {
                        continue;
                    }
                    if IMAGE_RE.captures(&other.content).map(|c| &c[1] == image).unwrap_or(false) {
                        add_edge(&mut edges, m.id.clone(), other.id.clone(), IMAGE_WEIGHT);
                    }
                }
            }

            let pairs = extract_label_pairs(&m.content);
            if !pairs.is_empty() {
                for other in &manifests {
                    if other.id == m.id {
                        continue;
                    }
                    let other_pairs = extract_label_pairs(&other.content);
                    if pairs.iter().any(|p| other_pairs.contains(p)) {
                        add_edge(&mut edges, m.id.clone(), other.id.clone(), SELECTOR_WEIGHT);
                    }
                }
            }
        }

        edges
    }
}

fn link_by_name(edges: &mut EdgeMap, from: &Fragment, re: &Regex, by_name: &HashMap<String, Vec<&Fragment>>, weight: f64) {
    for caps in re.captures_iter(&from.content) {
        let name = &caps[1];
        if let Some(targets) = by_name.get(name) {
            for target in targets {
                if target.id != from.id {
                    add_edge(edges, from.id.clone(), target.id.clone(), weight);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_kinds_only() {
        assert!(is_k8s_manifest(Path::new("svc.yaml"), "kind: Service\nmetadata:\n  name: foo\n"));
        assert!(!is_k8s_manifest(Path::new("values.yaml"), "image:\n  repository: nginx\n"));
    }

    #[test]
    fn extract_label_pairs_reads_selector_block() {
        let content = "selector:\n  app: web\n  tier: frontend\nkind: Service\n";
        let pairs = extract_label_pairs(content);
        assert!(pairs.contains(&("app".to_string(), "web".to_string())));
    }
}
