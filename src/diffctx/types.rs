//! Core data model: fragments, fragment identity, and diff hunks.
//!
//! Fragments never reference each other by pointer — they are keyed by
//! [`FragmentId`] everywhere, including inside the graph, which avoids
//! ownership cycles entirely.

use std::path::{Path, PathBuf};

/// The kind of syntactic or pseudo-syntactic unit a [`Fragment`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FragmentKind {
    Function,
    Class,
    Struct,
    Impl,
    Interface,
    Enum,
    Module,
    Type,
    Variable,
    Record,
    Property,
    Declaration,
    Definition,
    Section,
    Paragraph,
    Config,
    Resource,
    Block,
    Chunk,
}

impl FragmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Impl => "impl",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Module => "module",
            Self::Type => "type",
            Self::Variable => "variable",
            Self::Record => "record",
            Self::Property => "property",
            Self::Declaration => "declaration",
            Self::Definition => "definition",
            Self::Section => "section",
            Self::Paragraph => "paragraph",
            Self::Config => "config",
            Self::Resource => "resource",
            Self::Block => "block",
            Self::Chunk => "chunk",
        }
    }
}

/// Identity of a [`Fragment`]: the `(path, start_line, end_line)` tuple.
///
/// Also the node identity in the relationship graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentId {
    pub path: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
}

impl FragmentId {
    pub fn new(path: impl Into<PathBuf>, start_line: usize, end_line: usize) -> Self {
        Self {
            path: path.into(),
            start_line,
            end_line,
        }
    }
}

impl std::fmt::Display for FragmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}-{}",
            self.path.display(),
            self.start_line,
            self.end_line
        )
    }
}

/// A contiguous span of one file, representing a syntactic or
/// pseudo-syntactic unit.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub id: FragmentId,
    pub kind: FragmentKind,
    /// Verbatim text of the span, terminated by a newline.
    pub content: String,
    /// Lowercase identifier tokens, ≥3 chars, profile-dependent stopwords removed.
    pub identifiers: Vec<String>,
    /// Set by the token counter; unused until the selector runs.
    pub token_count: usize,
    /// Present for named definitions; used by the concept-matching kernel.
    pub symbol_name: Option<String>,
}

impl Fragment {
    pub fn new(id: FragmentId, kind: FragmentKind, content: String, identifiers: Vec<String>) -> Self {
        Self {
            id,
            kind,
            content,
            identifiers,
            token_count: 0,
            symbol_name: None,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol_name = Some(symbol.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.id.path
    }

    pub fn start_line(&self) -> usize {
        self.id.start_line
    }

    pub fn end_line(&self) -> usize {
        self.id.end_line
    }

    pub fn line_count(&self) -> usize {
        self.end_line() - self.start_line() + 1
    }

    /// True if `other`'s line range is fully contained in `self`'s, same file.
    pub fn contains(&self, other: &Fragment) -> bool {
        self.path() == other.path()
            && self.start_line() <= other.start_line()
            && other.end_line() <= self.end_line()
    }

    /// True if `self` and `other` (same file) share at least one line.
    pub fn overlaps(&self, other: &Fragment) -> bool {
        self.path() == other.path()
            && self.start_line() <= other.end_line()
            && other.start_line() <= self.end_line()
    }
}

/// A contiguous edited line range within one file, as produced by the
/// version-control adapter's zero-context diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub path: PathBuf,
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
}

impl DiffHunk {
    pub fn new(
        path: impl Into<PathBuf>,
        old_start: usize,
        old_len: usize,
        new_start: usize,
        new_len: usize,
    ) -> Self {
        Self {
            path: path.into(),
            old_start,
            old_len,
            new_start,
            new_len,
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.new_len == 0 && self.old_len > 0
    }

    pub fn is_addition(&self) -> bool {
        self.old_len == 0 && self.new_len > 0
    }

    pub fn end_line(&self) -> usize {
        if self.new_len == 0 {
            self.new_start
        } else {
            self.new_start + self.new_len - 1
        }
    }

    /// Line interval used to pick seeds inside `path`.
    pub fn core_selection_range(&self) -> (usize, usize) {
        if self.is_deletion() {
            let anchor = self.new_start.max(1);
            (anchor, anchor)
        } else {
            (self.new_start, self.end_line())
        }
    }
}
