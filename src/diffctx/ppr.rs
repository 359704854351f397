//! Personalized PageRank over the relationship graph.
//!
//! Ported 1:1 in algorithm from `ppr.py`: dangling-mass redistribution,
//! convergence tolerance / max_iter, L1 normalization, uniform fallback.

use std::collections::HashMap;

use tracing::warn;

use crate::diffctx::graph::Graph;
use crate::diffctx::types::FragmentId;

const DEFAULT_TOLERANCE: f64 = 1e-4;
const DEFAULT_MAX_ITER: usize = 50;

/// Run personalized PageRank seeded at `seeds`, with damping `alpha`.
///
/// Returns a score for every node in `graph`. If no seed is present in the
/// graph, returns the uniform distribution `1/N`.
pub fn personalized_pagerank(
    graph: &Graph,
    seeds: &[FragmentId],
    alpha: f64,
) -> HashMap<FragmentId, f64> {
    personalized_pagerank_with(graph, seeds, alpha, DEFAULT_TOLERANCE, DEFAULT_MAX_ITER)
}

pub fn personalized_pagerank_with(
    graph: &Graph,
    seeds: &[FragmentId],
    alpha: f64,
    tolerance: f64,
    max_iter: usize,
) -> HashMap<FragmentId, f64> {
    let nodes = graph.nodes();
    let n = nodes.len();
    if n == 0 {
        return HashMap::new();
    }

    let seed_set: std::collections::HashSet<&FragmentId> = seeds.iter().collect();
    let present_seeds: Vec<&FragmentId> = nodes.iter().filter(|n| seed_set.contains(n)).collect();

    if present_seeds.is_empty() {
        let uniform = 1.0 / n as f64;
        return nodes.iter().map(|id| (id.clone(), uniform)).collect();
    }

    let p: HashMap<FragmentId, f64> = {
        let share = 1.0 / present_seeds.len() as f64;
        nodes
            .iter()
            .map(|id| (id.clone(), if seed_set.contains(id) { share } else { 0.0 }))
            .collect()
    };

    // Precompute each node's finite out-weight sum (dangling if zero).
    let outsum: HashMap<FragmentId, f64> = nodes
        .iter()
        .map(|id| {
            let sum = graph
                .neighbors(id)
                .map(|edges| edges.values().filter(|w| w.is_finite()).sum::<f64>())
                .unwrap_or(0.0);
            (id.clone(), sum)
        })
        .collect();

    let mut score: HashMap<FragmentId, f64> = nodes.iter().map(|id| (id.clone(), 1.0 / n as f64)).collect();
    let mut converged = false;

    for _ in 0..max_iter {
        let dangling_mass: f64 = nodes
            .iter()
            .filter(|id| outsum[*id] == 0.0)
            .map(|id| score[id])
            .sum();

        let mut next: HashMap<FragmentId, f64> = nodes
            .iter()
            .map(|id| (id.clone(), (1.0 - alpha) * p[id] + alpha * dangling_mass * p[id]))
            .collect();

        for src in nodes {
            let src_sum = outsum[src];
            if src_sum == 0.0 {
                continue;
            }
            let src_score = score[src];
            if let Some(edges) = graph.neighbors(src) {
                for (dst, weight) in edges {
                    if !weight.is_finite() {
                        continue;
                    }
                    *next.get_mut(dst).unwrap() += alpha * src_score * weight / src_sum;
                }
            }
        }

        let delta: f64 = nodes.iter().map(|id| (next[id] - score[id]).abs()).sum();
        score = next;
        if delta < tolerance {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!("personalized pagerank did not converge within {max_iter} iterations");
    }

    let total: f64 = score.values().sum();
    if total > 0.0 {
        for v in score.values_mut() {
            *v /= total;
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffctx::edges::EdgeMap;

    fn id(path: &str) -> FragmentId {
        FragmentId::new(path, 1, 5)
    }

    #[test]
    fn empty_seeds_yield_uniform_distribution() {
        let nodes = vec![id("a.rs"), id("b.rs")];
        let graph = Graph::build(nodes.clone(), EdgeMap::new());
        let scores = personalized_pagerank(&graph, &[], 0.6);
        assert!((scores[&id("a.rs")] - 0.5).abs() < 1e-9);
        assert!((scores[&id("b.rs")] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn scores_sum_to_one_with_seeds() {
        let a = id("a.rs");
        let b = id("b.rs");
        let mut edges = EdgeMap::new();
        edges.insert((a.clone(), b.clone()), 0.8);
        let graph = Graph::build(vec![a.clone(), b.clone()], edges);
        let scores = personalized_pagerank(&graph, &[a.clone()], 0.6);
        let total: f64 = scores.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(scores[&a] > 0.0);
    }

    #[test]
    fn alpha_zero_concentrates_mass_on_seeds() {
        let a = id("a.rs");
        let b = id("b.rs");
        let mut edges = EdgeMap::new();
        edges.insert((a.clone(), b.clone()), 0.9);
        let graph = Graph::build(vec![a.clone(), b.clone()], edges);
        let scores = personalized_pagerank(&graph, &[a.clone()], 0.0);
        assert!((scores[&a] - 1.0).abs() < 1e-6);
        assert!(scores[&b] < 1e-6);
    }
}
