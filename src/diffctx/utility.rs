//! Utility model and concept-coverage state.
//!
//! Ported from `utility.py`: per-concept best-relevance tracking, the
//! square-root coverage objective, and marginal gain/density.

use std::collections::HashMap;

use crate::diffctx::types::Fragment;

/// How strongly a fragment matches a concept: defines it, merely uses it,
/// or doesn't mention it at all.
pub fn match_strength(fragment: &Fragment, concept: &str) -> f64 {
    if fragment.symbol_name.as_deref() == Some(concept) {
        1.0
    } else if fragment.identifiers.iter().any(|i| i == concept) {
        0.5
    } else {
        0.0
    }
}

/// Tracks `max_rel[c]` for each concept as fragments are admitted, and
/// exposes the current global utility `U = sum(sqrt(max_rel[c]))`.
pub struct UtilityState {
    concepts: Vec<String>,
    max_rel: HashMap<String, f64>,
}

impl UtilityState {
    pub fn new(concepts: impl IntoIterator<Item = String>) -> Self {
        let concepts: Vec<String> = concepts.into_iter().collect();
        let max_rel = concepts.iter().map(|c| (c.clone(), 0.0)).collect();
        Self { concepts, max_rel }
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn concepts(&self) -> &[String] {
        &self.concepts
    }

    pub fn current_utility(&self) -> f64 {
        self.max_rel.values().map(|v| v.sqrt()).sum()
    }

    /// Marginal gain of admitting `fragment` at `relevance`, without
    /// mutating state.
    pub fn marginal_gain(&self, fragment: &Fragment, relevance: f64) -> f64 {
        let mut gain = 0.0;
        for concept in &self.concepts {
            let current = *self.max_rel.get(concept).unwrap_or(&0.0);
            let candidate = relevance * match_strength(fragment, concept);
            let new_max = current.max(candidate);
            if new_max > current {
                gain += new_max.sqrt() - current.sqrt();
            }
        }
        gain
    }

    /// Commit `fragment` at `relevance`, updating `max_rel` in place.
    pub fn apply_fragment(&mut self, fragment: &Fragment, relevance: f64) {
        for concept in &self.concepts {
            let candidate = relevance * match_strength(fragment, concept);
            let entry = self.max_rel.entry(concept.clone()).or_insert(0.0);
            if candidate > *entry {
                *entry = candidate;
            }
        }
    }
}

/// `gain / tokens`, or 0 if the fragment has no token cost.
pub fn density(gain: f64, token_count: usize) -> f64 {
    if token_count == 0 {
        0.0
    } else {
        gain / token_count as f64
    }
}
