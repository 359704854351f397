//! Document edge builders: adjacent-section sequencing, anchor links, and
//! citation-key cross-references.
//!
//! Ported from `edges/document/{structure,anchor,citation}.py`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::FragmentKind;

const STRUCTURE_WEIGHT: f64 = 0.30;
const ANCHOR_WEIGHT: f64 = 0.65;
const CITATION_WEIGHT: f64 = 0.25;

/// Links each markdown section to the next section in the same file.
pub struct DocumentStructureEdgeBuilder;

impl EdgeBuilder for DocumentStructureEdgeBuilder {
    fn category(&self) -> Category {
        Category::Document
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();
        for frags in ctx.by_path.values() {
            let mut sections: Vec<_> = frags
                .iter()
                .map(|&i| &ctx.fragments[i])
                .filter(|f| f.kind == FragmentKind::Section)
                .collect();
            sections.sort_by_key(|f| f.start_line());
            for w in sections.windows(2) {
                add_edge(&mut edges, w[0].id.clone(), w[1].id.clone(), STRUCTURE_WEIGHT);
                add_edge(&mut edges, w[1].id.clone(), w[0].id.clone(), STRUCTURE_WEIGHT);
            }
        }
        edges
    }
}

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]\(#([a-zA-Z0-9_-]+)\)").unwrap());
static HEADING_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+(.+)$").unwrap());

fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == ' ' || c == '-' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Links `[text](#slug)` references to the section whose slugified
/// heading matches `slug`.
pub struct AnchorLinkEdgeBuilder;

impl EdgeBuilder for AnchorLinkEdgeBuilder {
    fn category(&self) -> Category {
        Category::Document
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut edges = EdgeMap::new();

        for frags in ctx.by_path.values() {
            let sections: Vec<_> = frags
                .iter()
                .map(|&i| &ctx.fragments[i])
                .filter(|f| f.kind == FragmentKind::Section)
                .collect();

            let mut slug_to_section = HashMap::new();
            for section in &sections {
                if let Some(caps) = HEADING_LINE_RE.captures(&section.content) {
                    let title = caps.get(1).unwrap().as_str();
                    slug_to_section.insert(slugify(title), section.id.clone());
                }
            }

            for section in &sections {
                for caps in LINK_RE.captures_iter(&section.content) {
                    let slug = caps.get(1).unwrap().as_str();
                    if let Some(target) = slug_to_section.get(slug) {
                        add_edge(&mut edges, section.id.clone(), target.clone(), ANCHOR_WEIGHT);
                    }
                }
            }
        }

        edges
    }
}

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[@([a-zA-Z0-9_:-]+)\]").unwrap());

/// Links fragments that cite the same `[@key]` to each other, hub-and-spoke
/// off the first citing fragment (mirrors the reference builder, which
/// fans every later citer out from the first one rather than an all-pairs
/// clique).
pub struct CitationEdgeBuilder;

impl EdgeBuilder for CitationEdgeBuilder {
    fn category(&self) -> Category {
        Category::Document
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let mut by_key: HashMap<String, Vec<&crate::diffctx::types::Fragment>> = HashMap::new();
        for frag in ctx.fragments {
            for caps in CITATION_RE.captures_iter(&frag.content) {
                let key = caps[1].to_string();
                let frags = by_key.entry(key).or_default();
                if !frags.iter().any(|f| f.id == frag.id) {
                    frags.push(frag);
                }
            }
        }

        let mut edges = EdgeMap::new();
        for frags in by_key.values() {
            if frags.len() < 2 {
                continue;
            }
            let hub = &frags[0];
            for other in &frags[1..] {
                add_edge(&mut edges, hub.id.clone(), other.id.clone(), CITATION_WEIGHT);
                add_edge(&mut edges, other.id.clone(), hub.id.clone(), CITATION_WEIGHT);
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_matches_github_heading_anchors() {
        assert_eq!(slugify("Getting Started"), "getting-started");
    }

    #[test]
    fn citation_links_fragments_sharing_a_key() {
        let fragments = vec![
            crate::diffctx::types::Fragment::new(
                crate::diffctx::types::FragmentId::new("a.md", 1, 3),
                FragmentKind::Section,
                "see [@smith2020] for details\n".to_string(),
                vec![],
            ),
            crate::diffctx::types::Fragment::new(
                crate::diffctx::types::FragmentId::new("b.md", 1, 3),
                FragmentKind::Section,
                "also [@smith2020]\n".to_string(),
                vec![],
            ),
        ];
        let by_path = HashMap::new();
        let ctx = BuildContext::new(std::path::Path::new("."), &fragments, &by_path);
        let edges = CitationEdgeBuilder.build(&ctx);
        assert!(!edges.is_empty());
    }
}
