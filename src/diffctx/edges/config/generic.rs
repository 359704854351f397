//! Config-to-code edge builder: matches configuration keys against code
//! identifiers that reference them.
//!
//! Ported from `edges/config/generic.py`.

use std::sync::LazyLock;

use regex::Regex;

use super::super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::FragmentKind;

const CONFIG_TO_CODE_WEIGHT: f64 = 0.45;
const CODE_TO_CONFIG_REVERSE: f64 = 0.70;
const MIN_KEY_LEN: usize = 6;

static STOPWORDS: &[&str] = &[
    "name", "type", "value", "default", "enabled", "version", "description", "id",
];

static YAML_TOML_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*([a-zA-Z_][a-zA-Z0-9_-]*)\s*[:=]"#).unwrap());
static JSON_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([a-zA-Z_][a-zA-Z0-9_-]*)"\s*:"#).unwrap());

/// Extracts candidate config keys from a config fragment's content,
/// filtered to ≥6 chars and outside the stopword set.
fn extract_keys(content: &str) -> Vec<String> {
    let mut keys = Vec::new();
    for re in [&*YAML_TOML_KEY_RE, &*JSON_KEY_RE] {
        for caps in re.captures_iter(content) {
            let key = caps.get(1).unwrap().as_str().to_lowercase();
            if key.chars().count() >= MIN_KEY_LEN && !STOPWORDS.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }
    keys
}

fn word_boundary_re(key: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(key))).ok()
}

pub struct ConfigCodeEdgeBuilder;

impl EdgeBuilder for ConfigCodeEdgeBuilder {
    fn category(&self) -> Category {
        Category::Config
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();

        let config_frags: Vec<_> = ctx
            .fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Config)
            .collect();
        if config_frags.is_empty() {
            return edges;
        }

        let code_frags: Vec<_> = ctx
            .fragments
            .iter()
            .filter(|f| f.kind != FragmentKind::Config)
            .collect();

        for config_frag in &config_frags {
            let keys = extract_keys(&config_frag.content);
            for key in &keys {
                let Some(re) = word_boundary_re(key) else { continue };
                let mut matches = 0usize;
                let hits: Vec<_> = code_frags
                    .iter()
                    .filter(|f| re.is_match(&f.content))
                    .collect();
                matches += hits.len();
                if matches == 0 {
                    continue;
                }
                let scaled = CONFIG_TO_CODE_WEIGHT / matches as f64;
                for code_frag in hits {
                    add_edge(&mut edges, config_frag.id.clone(), code_frag.id.clone(), scaled);
                    add_edge(
                        &mut edges,
                        code_frag.id.clone(),
                        config_frag.id.clone(),
                        scaled * CODE_TO_CONFIG_REVERSE,
                    );
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
    fn extract_keys_filters_short_and_stopword_keys() {
        let keys = extract_keys("pool_size: 5\nname: foo\nconnection_timeout: 30\n");
        assert!(keys.contains(&"pool_size".to_string()));
        assert!(keys.contains(&"connection_timeout".to_string()));
        assert!(!keys.contains(&"name".to_string()));
    }
}
