//! Edge builders: independent analyzers that each emit weighted directed
//! edges between fragments in one category.
//!
//! Ported from the reference implementation's `edges/base.py` (the
//! `EdgeBuilder` ABC) and `edges/__init__.py` (the category dispatcher).
//! Builders never talk to each other; the graph assembler unions their
//! output by taking the max weight per `(src, dst)` pair.

mod config;
mod document;
mod history;
mod semantic;
mod similarity;
mod structural;

pub use config::{
    BuildSystemEdgeBuilder, CicdEdgeBuilder, ConfigCodeEdgeBuilder, DockerEdgeBuilder, HelmEdgeBuilder,
    KubernetesEdgeBuilder, TerraformEdgeBuilder,
};
pub use document::{AnchorLinkEdgeBuilder, CitationEdgeBuilder, DocumentStructureEdgeBuilder};
pub use history::CochangeEdgeBuilder;
pub use semantic::{family_builders as semantic_family_builders, LanguageProfile, SemanticEdgeBuilder};
pub use similarity::LexicalEdgeBuilder;
pub use structural::{ContainmentEdgeBuilder, SiblingEdgeBuilder, TestPairingEdgeBuilder};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::diffctx::types::{Fragment, FragmentId};

/// Which expensive-skip group an edge builder belongs to. `full=true` and
/// quick invocations may opt to skip `Similarity`/`History`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Semantic,
    Structural,
    Config,
    Document,
    Similarity,
    History,
}

/// A `(src, dst) -> weight` edge map, as produced by one builder.
pub type EdgeMap = HashMap<(FragmentId, FragmentId), f64>;

/// Shared context every builder receives: all fragments in the universe
/// (already fragmented, with identifiers populated), keyed by file, plus
/// the repository root for builders that need to read other files.
pub struct BuildContext<'a> {
    pub root: &'a Path,
    pub fragments: &'a [Fragment],
    pub by_path: &'a HashMap<PathBuf, Vec<usize>>,
}

impl<'a> BuildContext<'a> {
    pub fn new(root: &'a Path, fragments: &'a [Fragment], by_path: &'a HashMap<PathBuf, Vec<usize>>) -> Self {
        Self { root, fragments, by_path }
    }

    pub fn fragments_in(&self, path: &Path) -> impl Iterator<Item = &Fragment> {
        self.by_path
            .get(path)
            .into_iter()
            .flatten()
            .map(move |&i| &self.fragments[i])
    }
}

/// One analyzer contributing edges in a single [`Category`].
///
/// Mirrors `edges/base.py`'s `EdgeBuilder`: `weight` and
/// `reverse_weight_factor` are per-builder constants folded into each
/// implementation's `build`, rather than trait-level fields, since several
/// builders (semantic, config) vary their weight per edge kind.
pub trait EdgeBuilder: Send + Sync {
    fn category(&self) -> Category;

    /// Emit edges across the full fragment universe.
    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap;

    /// Given the set of changed files, suggest additional repository-relative
    /// paths worth fragmenting (universe expansion). Default: none.
    fn discover_related_files(&self, _ctx: &BuildContext<'_>, _changed: &[PathBuf]) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Insert `weight` for `(src, dst)`, keeping the maximum on collision.
/// Mirrors `EdgeBuilder.add_edge`. Silently drops self-loops and
/// non-finite/non-positive weights.
pub fn add_edge(map: &mut EdgeMap, src: FragmentId, dst: FragmentId, weight: f64) {
    if src == dst || !weight.is_finite() || weight <= 0.0 {
        return;
    }
    let entry = map.entry((src, dst)).or_insert(weight);
    if weight > *entry {
        *entry = weight;
    }
}

/// Build the default builder roster, in the fixed order the reference
/// implementation's `get_all_builders()` uses: one semantic builder per
/// language family, the structural builders, every config ecosystem
/// builder, the document builders, then the expensive similarity/history
/// builders last.
pub fn default_builders() -> Vec<Box<dyn EdgeBuilder>> {
    let mut builders: Vec<Box<dyn EdgeBuilder>> =
        semantic_family_builders().into_iter().map(|b| Box::new(b) as Box<dyn EdgeBuilder>).collect();
    builders.extend([
        Box::new(ContainmentEdgeBuilder) as Box<dyn EdgeBuilder>,
        Box::new(TestPairingEdgeBuilder),
        Box::new(SiblingEdgeBuilder),
        Box::new(ConfigCodeEdgeBuilder),
        Box::new(DockerEdgeBuilder),
        Box::new(TerraformEdgeBuilder),
        Box::new(HelmEdgeBuilder),
        Box::new(KubernetesEdgeBuilder),
        Box::new(CicdEdgeBuilder),
        Box::new(BuildSystemEdgeBuilder),
        Box::new(DocumentStructureEdgeBuilder),
        Box::new(AnchorLinkEdgeBuilder),
        Box::new(CitationEdgeBuilder),
        Box::new(LexicalEdgeBuilder),
        Box::new(CochangeEdgeBuilder::default()),
    ]);
    builders
}

/// Run every builder and union their edges by max weight. `skip_expensive`
/// drops `Similarity`/`History` (used for `--full` and quick previews).
pub fn collect_all_edges(
    builders: &[Box<dyn EdgeBuilder>],
    ctx: &BuildContext<'_>,
    skip_expensive: bool,
) -> EdgeMap {
    let mut merged: EdgeMap = HashMap::new();
    for builder in builders {
        if skip_expensive
            && matches!(builder.category(), Category::Similarity | Category::History)
        {
            continue;
        }
        let edges = builder.build(ctx);
        for ((src, dst), weight) in edges {
            add_edge(&mut merged, src, dst, weight);
        }
    }
    merged
}

/// Aggregate `discover_related_files` across every builder, deduplicated.
pub fn discover_all_related_files(
    builders: &[Box<dyn EdgeBuilder>],
    ctx: &BuildContext<'_>,
    changed: &[PathBuf],
) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for builder in builders {
        for path in builder.discover_related_files(ctx, changed) {
            if seen.insert(path.clone()) {
                out.push(path);
            }
        }
    }
    out
}
