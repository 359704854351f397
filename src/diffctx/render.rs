//! Renderer: flattens the selected fragments into the output tree.
//!
//! Ported from `render.py`'s `build_partial_tree`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::diffctx::types::{Fragment, FragmentKind};

/// `DiffContext`, the public output schema (§6).
#[derive(Debug, Clone, Serialize)]
pub struct DiffContext {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub fragment_count: usize,
    pub fragments: Vec<FragmentOut>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FragmentOut {
    pub path: String,
    pub lines: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub content: String,
    pub preview: String,
}

const PREVIEW_MAX: usize = 150;
const SYMBOL_MAX: usize = 50;

static DEF_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:fn|func|function|def|class|struct|enum|trait|interface|impl|type)\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+(.+)$").unwrap());

fn extract_symbol(fragment: &Fragment) -> Option<String> {
    if let Some(name) = &fragment.symbol_name {
        return Some(name.clone());
    }
    match fragment.kind {
        FragmentKind::Section => HEADING_RE
            .captures(&fragment.content)
            .map(|c| truncate(c.get(1).unwrap().as_str().trim(), SYMBOL_MAX)),
        _ => DEF_NAME_RE
            .captures(&fragment.content)
            .map(|c| c.get(1).unwrap().as_str().to_string()),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn preview(content: &str) -> String {
    let collapsed: String = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= PREVIEW_MAX {
        collapsed
    } else {
        let mut truncated: String = collapsed.chars().take(PREVIEW_MAX).collect();
        truncated.push_str("...");
        truncated
    }
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the final [`DiffContext`] from the selected fragments.
pub fn build_partial_tree(root: &Path, mut selected: Vec<Fragment>, no_content: bool) -> DiffContext {
    selected.sort_by(|a, b| {
        let pa = relative_slash_path(root, a.path());
        let pb = relative_slash_path(root, b.path());
        pa.cmp(&pb).then(a.start_line().cmp(&b.start_line()))
    });

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    let fragments: Vec<FragmentOut> = selected
        .iter()
        .map(|f| FragmentOut {
            path: relative_slash_path(root, f.path()),
            lines: format!("{}-{}", f.start_line(), f.end_line()),
            kind: f.kind.as_str().to_string(),
            symbol: extract_symbol(f),
            content: if no_content { String::new() } else { f.content.clone() },
            preview: preview(&f.content),
        })
        .collect();

    DiffContext {
        name,
        kind: "diff_context",
        fragment_count: fragments.len(),
        fragments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffctx::types::FragmentId;

    #[test]
    fn preview_collapses_whitespace_and_truncates() {
        let long = "word ".repeat(100);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert!(p.len() <= PREVIEW_MAX + 3);
    }

    #[test]
    fn empty_selection_yields_empty_context() {
        let ctx = build_partial_tree(Path::new("/repo"), Vec::new(), false);
        assert_eq!(ctx.fragment_count, 0);
        assert_eq!(ctx.kind, "diff_context");
    }

    #[test]
    fn no_content_clears_content_but_keeps_preview() {
        let frag = Fragment::new(
            FragmentId::new("/repo/a.rs", 1, 2),
            FragmentKind::Function,
            "fn foo() {}\n".to_string(),
            vec!["foo".to_string()],
        )
        .with_symbol("foo");
        let ctx = build_partial_tree(Path::new("/repo"), vec![frag], true);
        assert_eq!(ctx.fragments[0].content, "");
        assert!(!ctx.fragments[0].preview.is_empty());
        assert_eq!(ctx.fragments[0].symbol.as_deref(), Some("foo"));
    }
}
