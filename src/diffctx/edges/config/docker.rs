//! Docker/Compose edge builder: links Dockerfiles and compose files to the
//! sources, env files, and build contexts they reference.
//!
//! Ported from `edges/config/docker.py`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::{Fragment, FragmentId};

const WEIGHT: f64 = 0.55;
const COPY_WEIGHT: f64 = 0.65;
const COMPOSE_WEIGHT: f64 = 0.50;

static DOCKERFILE_COPY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^(?:COPY|ADD)\s+(?:--\S+\s+)*(\S+)\s+").unwrap());
static DOCKERFILE_ENV_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?mi)^ENV\s+(\w+)").unwrap());
static DOCKERFILE_ARG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?mi)^ARG\s+(\w+)").unwrap());
static COMPOSE_BUILD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s+build:\s*['"]?([^'"#\n]+)"#).unwrap());
static COMPOSE_CONTEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s+context:\s*['"]?([^'"#\n]+)"#).unwrap());
static COMPOSE_VOLUME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s+-\s*['"]?([./][^:'"\n]+):"#).unwrap());

fn is_dockerfile(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_lowercase();
    name == "dockerfile" || name.starts_with("dockerfile.") || name.ends_with(".dockerfile")
}

fn is_compose_file(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|n| n.to_str()).map(|s| s.to_lowercase()).as_deref(),
        Some("docker-compose.yml") | Some("docker-compose.yaml") | Some("compose.yml") | Some("compose.yaml")
    )
}

fn strip_dot_slash(s: &str) -> &str {
    let mut s = s;
    while let Some(rest) = s.strip_prefix("./") {
        s = rest;
    }
    s
}

fn normalize_path(base_dir: &Path, rel: &str) -> PathBuf {
    let rel = strip_dot_slash(rel.trim().trim_matches(['\'', '"']));
    let normalized = base_dir.join(rel);
    if normalized.components().any(|c| c.as_os_str() == "..") {
        return base_dir.to_path_buf();
    }
    normalized
}

pub struct DockerEdgeBuilder;

impl EdgeBuilder for DockerEdgeBuilder {
    fn category(&self) -> Category {
        Category::Config
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();

        let dockerfiles: Vec<&Fragment> = ctx.fragments.iter().filter(|f| is_dockerfile(f.path())).collect();
        let compose_files: Vec<&Fragment> = ctx.fragments.iter().filter(|f| is_compose_file(f.path())).collect();
        if dockerfiles.is_empty() && compose_files.is_empty() {
            return edges;
        }

        let mut path_to_frags: HashMap<&Path, Vec<&Fragment>> = HashMap::new();
        for frag in ctx.fragments {
            path_to_frags.entry(frag.path()).or_default().push(frag);
        }

        for df in &dockerfiles {
            add_copy_edges(df, &path_to_frags, &mut edges);
            add_env_edges(df, &path_to_frags, &mut edges);
        }
        for cf in &compose_files {
            link_nearby_dockerfiles(cf, &dockerfiles, &mut edges);
            link_compose_build(cf, &path_to_frags, &mut edges);
            link_compose_context(cf, &path_to_frags, &mut edges);
            link_compose_volumes(cf, &path_to_frags, &mut edges);
        }

        edges
    }

    fn discover_related_files(&self, ctx: &BuildContext<'_>, changed: &[PathBuf]) -> Vec<PathBuf> {
        let docker_changed: Vec<&PathBuf> =
            changed.iter().filter(|p| is_dockerfile(p) || is_compose_file(p)).collect();
        if docker_changed.is_empty() {
            return Vec::new();
        }

        let mut refs: Vec<String> = Vec::new();
        for path in &docker_changed {
            let content: String = ctx.fragments_in(path).map(|f| f.content.as_str()).collect::<Vec<_>>().join("\n");
            if is_dockerfile(path) {
                for caps in DOCKERFILE_COPY_RE.captures_iter(&content) {
                    let src = caps.get(1).unwrap().as_str();
                    if !src.starts_with("--") && !src.starts_with('$') {
                        refs.push(strip_dot_slash(src.trim().trim_matches(['\'', '"'])).to_string());
                    }
                }
            }
            if is_compose_file(path) {
                for re in [&*COMPOSE_BUILD_RE, &*COMPOSE_VOLUME_RE] {
                    for caps in re.captures_iter(&content) {
                        refs.push(strip_dot_slash(caps.get(1).unwrap().as_str().trim()).to_string());
                    }
                }
            }
        }

        let changed_set: std::collections::HashSet<&PathBuf> = changed.iter().collect();
        let mut out = Vec::new();
        for path in ctx.by_path.keys() {
            if changed_set.contains(path) {
                continue;
            }
            if refs.iter().any(|r| path.to_string_lossy().ends_with(r.as_str())) {
                out.push(path.clone());
            }
        }
        out
    }
}

fn add_copy_edges(df: &Fragment, path_to_frags: &HashMap<&Path, Vec<&Fragment>>, edges: &mut EdgeMap) {
    let base_dir = df.path().parent().unwrap_or_else(|| Path::new(""));
    for caps in DOCKERFILE_COPY_RE.captures_iter(&df.content) {
        let src = caps.get(1).unwrap().as_str();
        if src.starts_with("--") || src.starts_with('$') {
            continue;
        }
        link_copy_source(df, base_dir, src, path_to_frags, edges);
    }
}

fn link_copy_source(df: &Fragment, base_dir: &Path, src: &str, path_to_frags: &HashMap<&Path, Vec<&Fragment>>, edges: &mut EdgeMap) {
    let target = normalize_path(base_dir, src);
    if let Some(frags) = path_to_frags.get(target.as_path()) {
        for frag in frags {
            add_edge(edges, df.id.clone(), frag.id.clone(), COPY_WEIGHT);
        }
    }
    if src.contains('*') {
        return;
    }
    let suffix = strip_dot_slash(src);
    if suffix.is_empty() || suffix == "." {
        return;
    }
    for (path, frags) in path_to_frags {
        if path.to_string_lossy().ends_with(suffix) {
            for frag in frags {
                add_edge(edges, df.id.clone(), frag.id.clone(), COPY_WEIGHT * 0.8);
            }
        }
    }
}

fn add_env_edges(df: &Fragment, path_to_frags: &HashMap<&Path, Vec<&Fragment>>, edges: &mut EdgeMap) {
    let has_env_or_arg =
        DOCKERFILE_ENV_RE.is_match(&df.content) || DOCKERFILE_ARG_RE.is_match(&df.content);
    if !has_env_or_arg {
        return;
    }
    for (path, frags) in path_to_frags {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_lowercase();
        let is_env_suffix = path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("env")).unwrap_or(false);
        if is_env_suffix || name.starts_with(".env") {
            for frag in frags {
                add_edge(edges, df.id.clone(), frag.id.clone(), WEIGHT);
            }
        }
    }
}

fn link_nearby_dockerfiles(cf: &Fragment, dockerfiles: &[&Fragment], edges: &mut EdgeMap) {
    let base_dir = cf.path().parent().unwrap_or_else(|| Path::new(""));
    for df in dockerfiles {
        let df_parent = df.path().parent();
        if df_parent == Some(base_dir) || df_parent.and_then(|p| p.parent()) == Some(base_dir) {
            add_edge(edges, cf.id.clone(), df.id.clone(), COMPOSE_WEIGHT);
        }
    }
}

fn link_compose_build(cf: &Fragment, path_to_frags: &HashMap<&Path, Vec<&Fragment>>, edges: &mut EdgeMap) {
    let base_dir = cf.path().parent().unwrap_or_else(|| Path::new(""));
    for caps in COMPOSE_BUILD_RE.captures_iter(&cf.content) {
        let build_path = caps.get(1).unwrap().as_str().trim();
        if build_path.is_empty() || build_path.starts_with('$') {
            continue;
        }
        let dockerfile_path = normalize_path(base_dir, build_path).join("Dockerfile");
        if let Some(frags) = path_to_frags.get(dockerfile_path.as_path()) {
            for frag in frags {
                add_edge(edges, cf.id.clone(), frag.id.clone(), COMPOSE_WEIGHT);
            }
        }
    }
}

fn link_compose_context(cf: &Fragment, path_to_frags: &HashMap<&Path, Vec<&Fragment>>, edges: &mut EdgeMap) {
    let base_dir = cf.path().parent().unwrap_or_else(|| Path::new(""));
    for caps in COMPOSE_CONTEXT_RE.captures_iter(&cf.content) {
        let context_path = caps.get(1).unwrap().as_str().trim();
        if context_path.is_empty() || context_path.starts_with('$') {
            continue;
        }
        let target_dir = normalize_path(base_dir, context_path);
        for (path, frags) in path_to_frags {
            if path.starts_with(&target_dir) {
                for frag in frags {
                    add_edge(edges, cf.id.clone(), frag.id.clone(), COMPOSE_WEIGHT * 0.7);
                }
            }
        }
    }
}

fn link_compose_volumes(cf: &Fragment, path_to_frags: &HashMap<&Path, Vec<&Fragment>>, edges: &mut EdgeMap) {
    let base_dir = cf.path().parent().unwrap_or_else(|| Path::new(""));
    for caps in COMPOSE_VOLUME_RE.captures_iter(&cf.content) {
        let vol_path = caps.get(1).unwrap().as_str().trim();
        if vol_path.is_empty() {
            continue;
        }
        let target = normalize_path(base_dir, vol_path);
        if let Some(frags) = path_to_frags.get(target.as_path()) {
            for frag in frags {
                add_edge(edges, cf.id.clone(), frag.id.clone(), COMPOSE_WEIGHT * 0.6);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_dockerfile_and_compose_names() {
        assert!(is_dockerfile(Path::new("Dockerfile")));
        assert!(is_dockerfile(Path::new("dockerfile.prod")));
        assert!(is_compose_file(Path::new("docker-compose.yml")));
        assert!(!is_compose_file(Path::new("values.yaml")));
    }

    #[test]
    fn copy_source_links_by_exact_and_suffix_path() {
        use crate::diffctx::types::FragmentKind;

        let df = Fragment::new(
            FragmentId::new("Dockerfile", 1, 3),
            FragmentKind::Config,
            "FROM rust:1\nCOPY src/main.rs /app/main.rs\n".to_string(),
            vec![],
        );
        let target = Fragment::new(
            FragmentId::new("src/main.rs", 1, 1),
            FragmentKind::Function,
            "fn main() {}\n".to_string(),
            vec![],
        );
        let mut path_to_frags: HashMap<&Path, Vec<&Fragment>> = HashMap::new();
        path_to_frags.entry(target.path()).or_default().push(&target);
        let mut edges = EdgeMap::new();
        add_copy_edges(&df, &path_to_frags, &mut edges);
        assert!(!edges.is_empty());
    }
}
