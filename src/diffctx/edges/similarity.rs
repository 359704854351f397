//! Lexical similarity edge builder: TF-IDF cosine similarity over
//! fragment identifiers.
//!
//! Ported from `edges/similarity/lexical.py`.

use std::collections::HashMap;
use std::path::Path;

use super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::FragmentId;

const MIN_SIMILARITY: f64 = 0.1;
const MAX_DF_RATIO: f64 = 0.20;
const IDF_FLOOR: f64 = 1.6;
const MAX_POSTINGS: usize = 200;
const TOP_K: usize = 10;

/// Per-language clamp band applied to the raw cosine score before the
/// minimum-similarity cutoff. Falls back to a conservative default band
/// for extensions with no explicit entry.
fn clamp_band(path: &Path) -> (f64, f64) {
    match path.extension().and_then(|e| e.to_str()) {
        Some("py") | Some("rs") | Some("go") | Some("java") | Some("ts") | Some("js") => (0.10, 0.60),
        Some("md") | Some("rst") | Some("txt") => (0.15, 0.75),
        _ => (0.10, 0.50),
    }
}

pub struct LexicalEdgeBuilder;

impl EdgeBuilder for LexicalEdgeBuilder {
    fn category(&self) -> Category {
        Category::Similarity
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let n = ctx.fragments.len();
        if n < 2 {
            return EdgeMap::new();
        }

        // Document frequency per term, with postings capped at MAX_POSTINGS.
        let mut postings: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, frag) in ctx.fragments.iter().enumerate() {
            for ident in &frag.identifiers {
                let list = postings.entry(ident.as_str()).or_default();
                if list.len() < MAX_POSTINGS {
                    list.push(i);
                }
            }
        }

        let max_df = (n as f64 * MAX_DF_RATIO).max(1.0) as usize;
        let idf: HashMap<&str, f64> = postings
            .iter()
            .filter(|(_, docs)| docs.len() <= max_df)
            .map(|(term, docs)| {
                let raw = ((n as f64) / (1.0 + docs.len() as f64)).ln();
                (*term, raw.max(IDF_FLOOR))
            })
            .collect();

        // TF-IDF vectors, as sparse term -> weight maps.
        let vectors: Vec<HashMap<&str, f64>> = ctx
            .fragments
            .iter()
            .map(|frag| {
                let mut tf: HashMap<&str, f64> = HashMap::new();
                for ident in &frag.identifiers {
                    *tf.entry(ident.as_str()).or_insert(0.0) += 1.0;
                }
                tf.into_iter()
                    .filter_map(|(term, count)| idf.get(term).map(|w| (term, count * w)))
                    .collect()
            })
            .collect();

        let norms: Vec<f64> = vectors
            .iter()
            .map(|v| v.values().map(|x| x * x).sum::<f64>().sqrt())
            .collect();

        let mut edges = EdgeMap::new();

        for i in 0..n {
            if norms[i] == 0.0 {
                continue;
            }
            let mut scored: Vec<(usize, f64)> = Vec::new();
            for j in 0..n {
                if i == j || norms[j] == 0.0 {
                    continue;
                }
                let dot: f64 = vectors[i]
                    .iter()
                    .filter_map(|(term, w)| vectors[j].get(term).map(|w2| w * w2))
                    .sum();
                let cosine = dot / (norms[i] * norms[j]);
                if cosine < MIN_SIMILARITY {
                    continue;
                }
                let (lo, hi) = clamp_band(ctx.fragments[i].path());
                scored.push((j, cosine.clamp(lo, hi)));
            }

            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            scored.truncate(TOP_K);

            let src: FragmentId = ctx.fragments[i].id.clone();
            for (j, weight) in scored {
                add_edge(&mut edges, src.clone(), ctx.fragments[j].id.clone(), weight);
            }
        }

        edges
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as StdHashMap;
    use std::path::PathBuf;

    use super::*;
    use crate::diffctx::types::{Fragment, FragmentKind};

    #[test]
    fn clamp_band_differs_by_extension() {
        assert_ne!(clamp_band(Path::new("a.py")), clamp_band(Path::new("a.md")));
    }

    fn frag(path: &str, idents: &[&str]) -> Fragment {
        Fragment::new(
            FragmentId::new(path, 1, 5),
            FragmentKind::Function,
            String::new(),
            idents.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn near_zero_overlap_pairs_produce_no_edge() {
        // Two fragments sharing no vocabulary at all have cosine 0.0 and
        // are skipped well before the clamp band ever applies. A prior
        // version clamped first, which floored even a near-zero cosine up
        // to the extension's `lo` bound and kept it as "similar."
        let fragments = vec![
            frag("a.rs", &["alpha", "bravo", "charlie"]),
            frag("b.rs", &["delta", "echo", "foxtrot"]),
        ];
        let by_path: StdHashMap<PathBuf, Vec<usize>> =
            [(PathBuf::from("a.rs"), vec![0]), (PathBuf::from("b.rs"), vec![1])].into_iter().collect();
        let ctx = BuildContext::new(Path::new("."), &fragments, &by_path);
        let edges = LexicalEdgeBuilder.build(&ctx);
        assert!(edges.is_empty());
    }

    #[test]
    fn shared_vocabulary_produces_a_clamped_edge() {
        let fragments = vec![frag("a.rs", &["alpha", "bravo"]), frag("b.rs", &["alpha", "bravo"])];
        let by_path: StdHashMap<PathBuf, Vec<usize>> =
            [(PathBuf::from("a.rs"), vec![0]), (PathBuf::from("b.rs"), vec![1])].into_iter().collect();
        let ctx = BuildContext::new(Path::new("."), &fragments, &by_path);
        let edges = LexicalEdgeBuilder.build(&ctx);
        assert!(!edges.is_empty());
        for weight in edges.values() {
            let (lo, hi) = clamp_band(Path::new("a.rs"));
            assert!(*weight >= lo && *weight <= hi);
        }
    }
}
