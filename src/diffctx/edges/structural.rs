//! Structural edge builders: containment, test/source pairing, siblings.
//!
//! Ported from `edges/structural/{containment,test,sibling}.py`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::Fragment;

const CONTAINMENT_WEIGHT: f64 = 0.50;
const CONTAINMENT_REVERSE: f64 = 0.70;

/// Links an enclosing fragment to each fragment strictly nested inside it.
pub struct ContainmentEdgeBuilder;

impl EdgeBuilder for ContainmentEdgeBuilder {
    fn category(&self) -> Category {
        Category::Structural
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();
        for frags in ctx.by_path.values() {
            for &i in frags {
                for &j in frags {
                    if i == j {
                        continue;
                    }
                    let outer = &ctx.fragments[i];
                    let inner = &ctx.fragments[j];
                    if outer.contains(inner) && outer.line_count() > inner.line_count() {
                        add_edge(&mut edges, outer.id.clone(), inner.id.clone(), CONTAINMENT_WEIGHT);
                        add_edge(&mut edges, inner.id.clone(), outer.id.clone(), CONTAINMENT_REVERSE);
                    }
                }
            }
        }
        edges
    }
}

// ---------------------------------------------------------------------------
// Test <-> source pairing
// ---------------------------------------------------------------------------

const TEST_NAMING_WEIGHT: f64 = 0.45;
const TEST_IMPORT_WEIGHT: f64 = 0.80;
const TEST_REVERSE_FACTOR: f64 = 0.60;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\n)\s*(?:use|import|from|require)\s+[^\n]*["'/.]?([A-Za-z_][A-Za-z0-9_]*)"#).unwrap()
});

pub struct TestPairingEdgeBuilder;

impl TestPairingEdgeBuilder {
    fn stem(path: &Path) -> Option<String> {
        path.file_stem().and_then(|s| s.to_str()).map(String::from)
    }

    /// Strips a leading/trailing `test`/`spec` marker, returning the
    /// "subject" stem the test file claims to cover, if any.
    fn test_subject(stem: &str) -> Option<String> {
        let lower = stem.to_lowercase();
        for prefix in ["test_", "test"] {
            if let Some(rest) = lower.strip_prefix(prefix) {
                if !rest.is_empty() {
                    return Some(rest.trim_start_matches('_').to_string());
                }
            }
        }
        for suffix in ["_test", ".test", "_spec", ".spec", "test", "spec"] {
            if let Some(rest) = lower.strip_suffix(suffix) {
                if !rest.is_empty() {
                    return Some(rest.trim_end_matches('_').to_string());
                }
            }
        }
        None
    }

    fn is_test_path(path: &Path) -> bool {
        let s = path.to_string_lossy().to_lowercase();
        s.contains("/test") || s.contains("\\test") || s.starts_with("test") || s.contains("_test") || s.contains(".test") || s.contains("_spec") || s.contains(".spec")
    }
}

impl EdgeBuilder for TestPairingEdgeBuilder {
    fn category(&self) -> Category {
        Category::Structural
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();
        let paths: Vec<&PathBuf> = ctx.by_path.keys().collect();

        for &test_path in &paths {
            if !Self::is_test_path(test_path) {
                continue;
            }
            let Some(test_stem) = Self::stem(test_path) else { continue };
            let Some(subject) = Self::test_subject(&test_stem) else { continue };

            for &src_path in &paths {
                if src_path == test_path || Self::is_test_path(src_path) {
                    continue;
                }
                let Some(src_stem) = Self::stem(src_path) else { continue };
                if src_stem.to_lowercase() != subject {
                    continue;
                }

                let direct_import = ctx
                    .fragments_in(test_path)
                    .any(|f| IMPORT_RE.captures_iter(&f.content).any(|c| {
                        c.get(1).map(|m| m.as_str().eq_ignore_ascii_case(&src_stem)).unwrap_or(false)
                    }));

                let weight = if direct_import { TEST_IMPORT_WEIGHT } else { TEST_NAMING_WEIGHT };
                if let (Some(test_frag), Some(src_frag)) =
                    (representative(ctx, test_path), representative(ctx, src_path))
                {
                    add_edge(&mut edges, test_frag.clone(), src_frag.clone(), weight);
                    add_edge(&mut edges, src_frag, test_frag, weight * TEST_REVERSE_FACTOR);
                }
            }
        }
        edges
    }
}

// ---------------------------------------------------------------------------
// Sibling (same-directory) pairing
// ---------------------------------------------------------------------------

const SIBLING_WEIGHT: f64 = 0.05;
const SIBLING_CAP: usize = 20;

pub struct SiblingEdgeBuilder;

impl EdgeBuilder for SiblingEdgeBuilder {
    fn category(&self) -> Category {
        Category::Structural
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut by_dir: HashMap<PathBuf, Vec<&PathBuf>> = HashMap::new();
        for path in ctx.by_path.keys() {
            let dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
            by_dir.entry(dir).or_default().push(path);
        }

        let mut edges = EdgeMap::new();
        for (_dir, mut files) in by_dir {
            files.sort();
            files.truncate(SIBLING_CAP);
            for i in 0..files.len() {
                for j in 0..files.len() {
                    if i == j {
                        continue;
                    }
                    if let (Some(a), Some(b)) = (representative(ctx, files[i]), representative(ctx, files[j])) {
                        add_edge(&mut edges, a, b, SIBLING_WEIGHT);
                    }
                }
            }
        }
        edges
    }
}

/// The fragment with the highest token count in `path`, used as a single
/// representative node for file-granularity structural edges.
fn representative(ctx: &BuildContext<'_>, path: &Path) -> Option<crate::diffctx::types::FragmentId> {
    ctx.fragments_in(path)
        .max_by_key(|f: &&Fragment| f.token_count)
        .map(|f| f.id.clone())
}
