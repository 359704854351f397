//! Fragmenter registry: turns `(path, content)` into an ordered set of
//! [`Fragment`]s via a prioritized chain of strategies.
//!
//! Ported from the reference implementation's `fragments.py`. No AST
//! dependency is introduced; the syntax-tree strategy is approximated by
//! regex extraction of definitions, matching this crate's existing
//! `symbols.rs` approach.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::diffctx::concepts::{extract_identifiers, Profile};
use crate::diffctx::types::{Fragment, FragmentId, FragmentKind};

const MIN_FRAGMENT_LINES: usize = 2;
const GENERIC_MAX_LINES: usize = 200;
const MIN_FRAGMENT_WORDS: usize = 10;

/// A single fragmenting strategy. Strategies are tried in descending
/// `priority` order; the first whose `can_handle` returns true is used,
/// falling through to the next if it yields no fragments.
pub trait Fragmenter: Send + Sync {
    fn priority(&self) -> i32;
    fn can_handle(&self, path: &Path) -> bool;
    fn fragment(&self, path: &Path, content: &str) -> Vec<Fragment>;
}

fn ends_with_any(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_lowercase();
            exts.iter().any(|x| *x == lower)
        })
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Regex-based code fragmenter (definitions + gap fragments)
// ---------------------------------------------------------------------------

static DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?(?:export\s+)?(?:default\s+)?(fn|func|function|def|class|struct|enum|trait|interface|impl|type|module|mod)\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
    .unwrap()
});

const CODE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "ts", "tsx", "go", "java", "kt", "kts", "scala", "c", "h", "cc",
    "cpp", "hpp", "cs", "rb", "php", "swift", "sh", "bash",
];

pub struct RegexCodeFragmenter;

impl Fragmenter for RegexCodeFragmenter {
    fn priority(&self) -> i32 {
        100
    }

    fn can_handle(&self, path: &Path) -> bool {
        ends_with_any(path, CODE_EXTENSIONS)
    }

    fn fragment(&self, path: &Path, content: &str) -> Vec<Fragment> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        // Collect (start_line, keyword, name) for each definition match,
        // then compute each span as running until the next definition (or
        // EOF), matching the "nested/sequential definitions" approximation
        // used when no real AST is available.
        let mut defs: Vec<(usize, &str, &str)> = Vec::new();
        for caps in DEF_RE.captures_iter(content) {
            let m = caps.get(0).unwrap();
            let line_no = content[..m.start()].matches('\n').count() + 1;
            let keyword = caps.get(1).unwrap().as_str();
            let name = caps.get(2).unwrap().as_str();
            defs.push((line_no, keyword, name));
        }

        if defs.is_empty() {
            return GenericFragmenter.fragment(path, content);
        }

        let total = lines.len();
        let mut fragments = Vec::new();
        let mut covered = vec![false; total + 1];
        let mut seen_end_by_kind: std::collections::HashSet<(FragmentKind, usize)> =
            std::collections::HashSet::new();

        for (i, &(start, keyword, name)) in defs.iter().enumerate() {
            let next_start = defs.get(i + 1).map(|d| d.0).unwrap_or(total + 1);
            let mut end = next_start.saturating_sub(1).max(start);
            end = end.min(total);
            if end - start + 1 < MIN_FRAGMENT_LINES {
                continue;
            }

            let kind = keyword_to_kind(keyword);
            if !seen_end_by_kind.insert((kind, end)) {
                continue;
            }

            for l in start..=end {
                if l <= total {
                    covered[l] = true;
                }
            }

            let snippet = join_with_newline(&lines[start - 1..end]);
            let identifiers = extract_identifiers(&snippet, Profile::Code);
            let frag = Fragment::new(
                FragmentId::new(path, start, end),
                kind,
                snippet,
                identifiers.into_iter().collect(),
            )
            .with_symbol(name);
            fragments.push(frag);
        }

        fragments.extend(gap_fragments(path, &lines, &covered));

        if fragments.is_empty() {
            GenericFragmenter.fragment(path, content)
        } else {
            fragments
        }
    }
}

fn keyword_to_kind(keyword: &str) -> FragmentKind {
    match keyword {
        "fn" | "func" | "function" | "def" => FragmentKind::Function,
        "class" => FragmentKind::Class,
        "struct" => FragmentKind::Struct,
        "enum" => FragmentKind::Enum,
        "trait" | "interface" => FragmentKind::Interface,
        "impl" => FragmentKind::Impl,
        "type" => FragmentKind::Type,
        "module" | "mod" => FragmentKind::Module,
        _ => FragmentKind::Definition,
    }
}

fn join_with_newline(lines: &[&str]) -> String {
    let mut s = lines.join("\n");
    s.push('\n');
    s
}

/// Group uncovered, non-blank-trimmed line runs into `module`/`chunk` gap
/// fragments, so the union of fragments equals the whole non-blank file.
fn gap_fragments(path: &Path, lines: &[&str], covered: &[bool]) -> Vec<Fragment> {
    let total = lines.len();
    let mut uncovered: Vec<usize> = (1..=total).filter(|&l| !covered[l]).collect();
    if uncovered.is_empty() {
        return Vec::new();
    }

    let mut gaps: Vec<(usize, usize)> = Vec::new();
    let mut start = uncovered[0];
    let mut end = uncovered[0];
    uncovered.remove(0);
    for l in uncovered {
        if l == end + 1 {
            end = l;
        } else {
            gaps.push((start, end));
            start = l;
            end = l;
        }
    }
    gaps.push((start, end));

    let mut out = Vec::new();
    for (mut s, mut e) in gaps {
        while s <= e && lines[s - 1].trim().is_empty() {
            s += 1;
        }
        while e >= s && lines[e - 1].trim().is_empty() {
            e -= 1;
        }
        if s > e || e - s + 1 < MIN_FRAGMENT_LINES {
            continue;
        }
        let snippet = join_with_newline(&lines[s - 1..e]);
        if snippet.trim().is_empty() {
            continue;
        }
        let identifiers = extract_identifiers(&snippet, Profile::Code);
        out.push(Fragment::new(
            FragmentId::new(path, s, e),
            FragmentKind::Module,
            snippet,
            identifiers.into_iter().collect(),
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Markdown fragmenter
// ---------------------------------------------------------------------------

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());

pub struct MarkdownFragmenter;

impl Fragmenter for MarkdownFragmenter {
    fn priority(&self) -> i32 {
        90
    }

    fn can_handle(&self, path: &Path) -> bool {
        ends_with_any(path, &["md", "markdown", "mdx"])
    }

    fn fragment(&self, path: &Path, content: &str) -> Vec<Fragment> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let mut headings: Vec<(usize, usize, &str)> = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if let Some(caps) = HEADING_RE.captures(line) {
                let level = caps.get(1).unwrap().as_str().len();
                let title = caps.get(2).unwrap().as_str().trim();
                headings.push((i + 1, level, title));
            }
        }

        if headings.is_empty() {
            return ParagraphFragmenter.fragment(path, content);
        }

        let mut fragments = Vec::new();
        for (idx, &(start, level, _title)) in headings.iter().enumerate() {
            let mut end = lines.len();
            for &(next_start, next_level, _) in &headings[idx + 1..] {
                if next_level <= level {
                    end = next_start - 1;
                    break;
                }
            }
            if end < start {
                continue;
            }
            let snippet = join_with_newline(&lines[start - 1..end]);
            if snippet.trim().is_empty() {
                continue;
            }
            let identifiers = extract_identifiers(&snippet, Profile::Docs);
            fragments.push(Fragment::new(
                FragmentId::new(path, start, end),
                FragmentKind::Section,
                snippet,
                identifiers.into_iter().collect(),
            ));
        }

        if fragments.is_empty() {
            ParagraphFragmenter.fragment(path, content)
        } else {
            fragments
        }
    }
}

// ---------------------------------------------------------------------------
// Config (YAML/TOML/JSON) fragmenter
// ---------------------------------------------------------------------------

static YAML_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z_][a-zA-Z0-9_-]*):\s*").unwrap());
static TOML_SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([a-zA-Z_][a-zA-Z0-9_.-]*)\]").unwrap());
static JSON_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s{0,2}"([^"]+)":\s*"#).unwrap());

pub struct ConfigFragmenter;

impl Fragmenter for ConfigFragmenter {
    fn priority(&self) -> i32 {
        50
    }

    fn can_handle(&self, path: &Path) -> bool {
        ends_with_any(path, &["yaml", "yml", "json", "toml"])
    }

    fn fragment(&self, path: &Path, content: &str) -> Vec<Fragment> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        let key_re: &Regex = match suffix.as_str() {
            "yaml" | "yml" => &YAML_KEY_RE,
            "toml" => &TOML_SECTION_RE,
            _ => &JSON_KEY_RE,
        };

        let mut boundaries: Vec<usize> = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if key_re.is_match(line) {
                boundaries.push(i);
            }
        }

        if boundaries.len() < 2 {
            return GenericFragmenter.fragment(path, content);
        }
        boundaries.push(lines.len());

        let mut fragments = Vec::new();
        for w in boundaries.windows(2) {
            let (start0, end0) = (w[0], w[1] - 1);
            let snippet = join_with_newline(&lines[start0..=end0]);
            if snippet.trim().is_empty() {
                continue;
            }
            let identifiers = extract_identifiers(&snippet, Profile::Data);
            fragments.push(Fragment::new(
                FragmentId::new(path, start0 + 1, end0 + 1),
                FragmentKind::Config,
                snippet,
                identifiers.into_iter().collect(),
            ));
        }

        if fragments.is_empty() {
            GenericFragmenter.fragment(path, content)
        } else {
            fragments
        }
    }
}

// ---------------------------------------------------------------------------
// Paragraph fragmenter
// ---------------------------------------------------------------------------

pub struct ParagraphFragmenter;

impl Fragmenter for ParagraphFragmenter {
    fn priority(&self) -> i32 {
        20
    }

    fn can_handle(&self, path: &Path) -> bool {
        ends_with_any(path, &["txt", "text", "rst", "adoc"])
            || path.extension().is_none()
    }

    fn fragment(&self, path: &Path, content: &str) -> Vec<Fragment> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let mut raw = Vec::new();
        let mut para_start: Option<usize> = None;
        for (i, line) in lines.iter().enumerate() {
            let blank = line.trim().is_empty();
            if !blank && para_start.is_none() {
                para_start = Some(i);
            } else if blank {
                if let Some(ps) = para_start.take() {
                    raw.extend(chunk_paragraph(path, &lines, ps, i - 1));
                }
            }
        }
        if let Some(ps) = para_start {
            raw.extend(chunk_paragraph(path, &lines, ps, lines.len() - 1));
        }

        merge_small(raw)
    }
}

fn chunk_paragraph(path: &Path, lines: &[&str], start: usize, end: usize) -> Vec<Fragment> {
    let length = end - start + 1;
    if length <= GENERIC_MAX_LINES {
        make_paragraph(path, lines, start, end).into_iter().collect()
    } else {
        let mut out = Vec::new();
        let mut chunk_start = start;
        while chunk_start <= end {
            let chunk_end = (chunk_start + GENERIC_MAX_LINES - 1).min(end);
            out.extend(make_paragraph(path, lines, chunk_start, chunk_end));
            chunk_start = chunk_end + 1;
        }
        out
    }
}

fn make_paragraph(path: &Path, lines: &[&str], start: usize, end: usize) -> Option<Fragment> {
    let snippet = join_with_newline(&lines[start..=end]);
    if snippet.trim().is_empty() {
        return None;
    }
    if snippet.split_whitespace().count() < MIN_FRAGMENT_WORDS {
        return None;
    }
    let identifiers = extract_identifiers(&snippet, Profile::Docs);
    Some(Fragment::new(
        FragmentId::new(path, start + 1, end + 1),
        FragmentKind::Paragraph,
        snippet,
        identifiers.into_iter().collect(),
    ))
}

fn merge_small(fragments: Vec<Fragment>) -> Vec<Fragment> {
    const MAX_LINES: usize = 100;
    if fragments.len() <= 1 {
        return fragments;
    }

    let mut merged = Vec::new();
    let mut buffer: Vec<Fragment> = Vec::new();
    let mut buffer_lines = 0usize;

    for frag in fragments {
        if buffer_lines + frag.line_count() <= MAX_LINES {
            buffer_lines += frag.line_count();
            buffer.push(frag);
        } else {
            if !buffer.is_empty() {
                merged.push(combine(std::mem::take(&mut buffer)));
            }
            buffer_lines = frag.line_count();
            buffer.push(frag);
        }
    }
    if !buffer.is_empty() {
        merged.push(combine(buffer));
    }
    merged
}

fn combine(mut frags: Vec<Fragment>) -> Fragment {
    if frags.len() == 1 {
        return frags.pop().unwrap();
    }
    let path = frags[0].path().to_path_buf();
    let start = frags[0].start_line();
    let end = frags[frags.len() - 1].end_line();
    let mut content = String::new();
    let mut idents: std::collections::HashSet<String> = std::collections::HashSet::new();
    for f in &frags {
        content.push_str(f.content.trim_end_matches('\n'));
        content.push('\n');
        idents.extend(f.identifiers.iter().cloned());
    }
    Fragment::new(
        FragmentId::new(path, start, end),
        FragmentKind::Section,
        content,
        idents.into_iter().collect(),
    )
}

// ---------------------------------------------------------------------------
// Generic line-window fragmenter (always succeeds)
// ---------------------------------------------------------------------------

pub struct GenericFragmenter;

impl Fragmenter for GenericFragmenter {
    fn priority(&self) -> i32 {
        0
    }

    fn can_handle(&self, _path: &Path) -> bool {
        true
    }

    fn fragment(&self, path: &Path, content: &str) -> Vec<Fragment> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let total = lines.len();
        let mut fragments = Vec::new();
        let mut start = 1usize;
        while start <= total {
            let end = (start + GENERIC_MAX_LINES - 1).min(total);
            let snippet = join_with_newline(&lines[start - 1..end]);
            let identifiers = extract_identifiers(&snippet, Profile::Code);
            fragments.push(Fragment::new(
                FragmentId::new(path, start, end),
                FragmentKind::Chunk,
                snippet,
                identifiers.into_iter().collect(),
            ));
            start = end + 1;
        }
        fragments
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Build the default, priority-sorted fragmenter chain.
pub fn default_registry() -> Vec<Box<dyn Fragmenter>> {
    let mut chain: Vec<Box<dyn Fragmenter>> = vec![
        Box::new(RegexCodeFragmenter),
        Box::new(MarkdownFragmenter),
        Box::new(ConfigFragmenter),
        Box::new(ParagraphFragmenter),
        Box::new(GenericFragmenter),
    ];
    chain.sort_by_key(|f| std::cmp::Reverse(f.priority()));
    chain
}

/// Fragment a single file's content by walking the registry chain.
pub fn fragment_file(registry: &[Box<dyn Fragmenter>], path: &Path, content: &str) -> Vec<Fragment> {
    for fragmenter in registry {
        if fragmenter.can_handle(path) {
            let result = fragmenter.fragment(path, content);
            if !result.is_empty() {
                return result;
            }
        }
    }
    GenericFragmenter.fragment(path, content)
}

/// Smallest-by-line-count fragment whose range covers `line`, ties broken
/// by lowest start line.
pub fn enclosing_fragment<'a>(fragments: &'a [Fragment], line: usize) -> Option<&'a Fragment> {
    fragments
        .iter()
        .filter(|f| f.start_line() <= line && line <= f.end_line())
        .min_by_key(|f| (f.line_count(), f.start_line()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_fragmenter_always_handles_everything() {
        assert!(GenericFragmenter.can_handle(Path::new("whatever.xyz")));
    }

    #[test]
    fn generic_fragmenter_chunks_long_files() {
        let content = (0..450)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let frags = GenericFragmenter.fragment(Path::new("f.xyz"), &content);
        assert_eq!(frags.len(), 3);
        assert_eq!(frags[0].start_line(), 1);
        assert_eq!(frags[0].end_line(), 200);
        assert_eq!(frags[2].start_line(), 401);
    }

    #[test]
    fn regex_fragmenter_extracts_functions_and_gaps() {
        let content = "use std::io;\n\nfn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n\nfn sub(a: i32, b: i32) -> i32 {\n    a - b\n}\n";
        let frags = RegexCodeFragmenter.fragment(Path::new("lib.rs"), content);
        assert!(frags.iter().any(|f| f.symbol_name.as_deref() == Some("add")));
        assert!(frags.iter().any(|f| f.symbol_name.as_deref() == Some("sub")));
        assert!(frags.iter().any(|f| f.kind == FragmentKind::Module));
    }

    #[test]
    fn markdown_fragmenter_splits_on_headings() {
        let content = "# Title\nintro text\n\n## Section A\nbody a\n\n## Section B\nbody b\n";
        let frags = MarkdownFragmenter.fragment(Path::new("doc.md"), content);
        assert_eq!(frags.len(), 3);
        assert_eq!(frags[0].start_line(), 1);
    }

    #[test]
    fn markdown_without_headings_falls_back_to_paragraphs() {
        let content = "just one paragraph with more than ten distinct words in it total";
        let frags = MarkdownFragmenter.fragment(Path::new("doc.md"), content);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].kind, FragmentKind::Paragraph);
    }

    #[test]
    fn config_fragmenter_splits_yaml_top_level_keys() {
        let content = "database:\n  pool_size: 5\nlogging:\n  level: info\n";
        let frags = ConfigFragmenter.fragment(Path::new("config.yaml"), content);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].kind, FragmentKind::Config);
    }

    #[test]
    fn enclosing_fragment_picks_smallest_covering_range() {
        let frags = vec![
            Fragment::new(FragmentId::new("a.rs", 1, 50), FragmentKind::Module, String::new(), vec![]),
            Fragment::new(FragmentId::new("a.rs", 10, 20), FragmentKind::Function, String::new(), vec![]),
        ];
        let found = enclosing_fragment(&frags, 15).unwrap();
        assert_eq!(found.start_line(), 10);
    }

    #[test]
    fn fragment_file_falls_back_through_registry() {
        let registry = default_registry();
        let frags = fragment_file(&registry, Path::new("notes.unknownext"), "hello world\n");
        assert!(!frags.is_empty());
    }
}
