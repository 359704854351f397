//! CI/CD edge builder: links pipeline definitions to the scripts and files
//! they invoke.
//!
//! Ported from `edges/config/cicd.py`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::Fragment;

const SCRIPT_WEIGHT: f64 = 0.60;

static GITLAB_INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*-\s*local:\s*['"]?([^'"\n]+)"#).unwrap());
static JENKINS_SH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"sh\s+['"]([^'"]+)['"]"#).unwrap());
static SCRIPT_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:bash|sh|python|python3|node|ruby)\s+([^\s'\"]+\.\w+)").unwrap());
static FILE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]?((?:\./|scripts/|bin/|tools/)[^\s'"]+)"#).unwrap());

fn is_github_actions(path: &Path) -> bool {
    let parts: Vec<_> = path.components().map(|c| c.as_os_str().to_string_lossy().to_string()).collect();
    parts.windows(2).any(|w| w[0] == ".github" && w[1] == "workflows")
}

fn is_gitlab_ci(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(".gitlab-ci.yml")
}

fn is_jenkinsfile(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with("Jenkinsfile")).unwrap_or(false)
}

fn is_circleci(path: &Path) -> bool {
    path.to_string_lossy().contains(".circleci/config.yml")
}

fn is_travis(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(".travis.yml")
}

fn is_azure_pipelines(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name == "azure-pipelines.yml" || name == "azure-pipelines.yaml"
}

fn is_pipeline_file(path: &Path) -> bool {
    is_github_actions(path)
        || is_gitlab_ci(path)
        || is_jenkinsfile(path)
        || is_circleci(path)
        || is_travis(path)
        || is_azure_pipelines(path)
}

fn extract_script_refs(content: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for re in [&*SCRIPT_CALL_RE, &*JENKINS_SH_RE] {
        for caps in re.captures_iter(content) {
            refs.push(caps[1].to_string());
        }
    }
    for caps in FILE_REF_RE.captures_iter(content) {
        refs.push(caps[1].to_string());
    }
    for caps in GITLAB_INCLUDE_RE.captures_iter(content) {
        refs.push(caps[1].to_string());
    }
    refs
}

pub struct CicdEdgeBuilder;

impl EdgeBuilder for CicdEdgeBuilder {
    fn category(&self) -> Category {
        Category::Config
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();

        let pipelines: Vec<&Fragment> = ctx.fragments.iter().filter(|f| is_pipeline_file(f.path())).collect();
        if pipelines.is_empty() {
            return edges;
        }

        for pipeline in &pipelines {
            let refs = extract_script_refs(&pipeline.content);
            if refs.is_empty() {
                continue;
            }
            for other in ctx.fragments {
                if other.id == pipeline.id {
                    continue;
                }
                let path_str = other.path().to_string_lossy();
                if refs.iter().any(|r| path_str.ends_with(r.trim_start_matches("./"))) {
                    add_edge(&mut edges, pipeline.id.clone(), other.id.clone(), SCRIPT_WEIGHT);
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
    fn detects_pipeline_file_kinds() {
        assert!(is_github_actions(Path::new(".github/workflows/ci.yml")));
        assert!(is_gitlab_ci(Path::new(".gitlab-ci.yml")));
        assert!(is_jenkinsfile(Path::new("Jenkinsfile")));
        assert!(!is_pipeline_file(Path::new("README.md")));
    }

    #[test]
    fn extract_script_refs_finds_interpreter_invocations() {
        let content = "steps:\n  - run: bash scripts/deploy.sh\n";
        let refs = extract_script_refs(content);
        assert!(refs.iter().any(|r| r.ends_with("deploy.sh")));
    }
}
