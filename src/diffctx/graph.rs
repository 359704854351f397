//! Relationship graph: merges edge maps, applies hub suppression, exposes
//! neighbor lookup for PPR.
//!
//! Ported from `graph.py`'s union/hub-suppression combinator logic only —
//! its inline edge-builder duplicates are not carried over, per the
//! standardization on the modular `edges/*` package.

use std::collections::HashMap;

use crate::diffctx::edges::EdgeMap;
use crate::diffctx::types::FragmentId;

const HUB_SUPPRESSION_PERCENTILE: f64 = 0.95;

/// Directed, weighted graph over fragment ids.
pub struct Graph {
    nodes: Vec<FragmentId>,
    adjacency: HashMap<FragmentId, HashMap<FragmentId, f64>>,
}

impl Graph {
    /// Build from a fragment universe and a pre-merged edge map, applying
    /// hub suppression to destinations above the 95th-percentile in-degree.
    pub fn build(nodes: Vec<FragmentId>, edges: EdgeMap) -> Self {
        let mut in_degree: HashMap<FragmentId, usize> = HashMap::new();
        for (src, dst) in edges.keys() {
            if src != dst {
                *in_degree.entry(dst.clone()).or_insert(0) += 1;
            }
        }

        let threshold = percentile(&in_degree.values().copied().collect::<Vec<_>>(), HUB_SUPPRESSION_PERCENTILE);

        let mut adjacency: HashMap<FragmentId, HashMap<FragmentId, f64>> = HashMap::new();
        for id in &nodes {
            adjacency.entry(id.clone()).or_default();
        }

        for ((src, dst), weight) in edges {
            if !weight.is_finite() || weight <= 0.0 {
                continue;
            }
            let degree = *in_degree.get(&dst).unwrap_or(&0);
            let adjusted = if (degree as f64) > threshold && degree > 0 {
                weight * (1.0 / (1.0 + degree as f64).ln().max(f64::EPSILON))
            } else {
                weight
            };
            let out = adjacency.entry(src).or_default();
            let entry = out.entry(dst).or_insert(adjusted);
            if adjusted > *entry {
                *entry = adjusted;
            }
        }

        Self { nodes, adjacency }
    }

    pub fn nodes(&self) -> &[FragmentId] {
        &self.nodes
    }

    pub fn neighbors(&self, node: &FragmentId) -> Option<&HashMap<FragmentId, f64>> {
        self.adjacency.get(node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Nearest-rank percentile over an unsorted sample; 0 for empty input.
fn percentile(values: &[usize], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)] as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(path: &str, s: usize, e: usize) -> FragmentId {
        FragmentId::new(path, s, e)
    }

    #[test]
    fn hub_suppression_damps_high_in_degree_destinations() {
        let hub = id("hub.rs", 1, 5);
        let mut nodes = vec![hub.clone()];
        let mut edges = EdgeMap::new();
        for i in 0..40 {
            let src = id(&format!("f{i}.rs"), 1, 5);
            nodes.push(src.clone());
            edges.insert((src, hub.clone()), 0.9);
        }
        let graph = Graph::build(nodes, edges);
        let neighbors = graph.neighbors(&id("f0.rs", 1, 5)).unwrap();
        assert!(neighbors[&hub] < 0.9);
    }

    #[test]
    fn isolated_node_has_no_neighbors() {
        let lonely = id("alone.rs", 1, 5);
        let graph = Graph::build(vec![lonely.clone()], EdgeMap::new());
        assert!(graph.neighbors(&lonely).unwrap().is_empty());
    }
}
