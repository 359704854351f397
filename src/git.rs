//! Git integration for ContextSmith.
//!
//! A thin, testable wrapper around the `git` CLI and a parser for its
//! zero-context unified diff output, feeding the `diff` subcommand's
//! context-bundling pipeline (`crate::diffctx`).

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::diffctx::types::DiffHunk as CtxDiffHunk;
use crate::error::{ContextSmithError, Result};

// ---------------------------------------------------------------------------
// Git command execution
// ---------------------------------------------------------------------------

/// Run a git command in the given directory and return its stdout.
///
/// Returns a [`ContextSmithError::Git`] if the command fails or if git
/// is not installed.
fn run_git(args: &[&str], cwd: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| ContextSmithError::Git {
            message: format!("failed to execute git: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ContextSmithError::Git {
            message: if stderr.is_empty() {
                format!("git exited with status {}", output.status)
            } else {
                stderr
            },
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// True if `path` is inside a git repository (does not require a clean tree).
pub fn is_repository(path: &Path) -> bool {
    run_git(&["rev-parse", "--git-dir"], path).is_ok()
}

// ---------------------------------------------------------------------------
// Diff retrieval
// ---------------------------------------------------------------------------

/// Raw zero-context unified diff text for `range` (e.g. "HEAD", "main..feature").
///
/// An empty `range` diffs the working tree against HEAD.
pub fn diff_text(root: &Path, range: &str) -> Result<String> {
    let mut args = vec!["diff", "--no-color", "-U0"];
    if !range.is_empty() {
        args.push(range);
    }
    run_git(&args, root)
}

/// Parse `range`'s diff into lightweight [`CtxDiffHunk`]s, one per changed
/// region, keyed by the new-file path (old path for pure deletions).
pub fn parse_diff(root: &Path, range: &str) -> Result<Vec<CtxDiffHunk>> {
    let raw = diff_text(root, range)?;
    Ok(parse_ctx_hunks(&raw))
}

/// Files touched by `range`, relative to the repository root.
pub fn changed_files(root: &Path, range: &str) -> Result<Vec<PathBuf>> {
    let mut args = vec!["diff", "--name-only"];
    if !range.is_empty() {
        args.push(range);
    }
    let out = run_git(&args, root)?;
    Ok(out.lines().filter(|l| !l.is_empty()).map(PathBuf::from).collect())
}

/// Contents of `relpath` as of `rev` (e.g. "HEAD", a commit SHA).
pub fn file_at_revision(root: &Path, rev: &str, relpath: &Path) -> Result<String> {
    let spec = format!("{rev}:{}", relpath.display());
    run_git(&["show", &spec], root)
}

/// Split a `base..head` or `base...head` range into its two endpoints.
/// Returns `(None, None)` if `range` has no `..` separator (a single ref,
/// diffed against the working tree).
pub fn split_range(range: &str) -> (Option<String>, Option<String>) {
    if let Some(idx) = range.find("...") {
        return (non_empty(&range[..idx]), non_empty(&range[idx + 3..]));
    }
    if let Some(idx) = range.find("..") {
        return (non_empty(&range[..idx]), non_empty(&range[idx + 2..]));
    }
    (None, None)
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Zero-context unified diff parser
// ---------------------------------------------------------------------------

/// Parse zero-context (`-U0`) unified diff text into [`CtxDiffHunk`]s.
fn parse_ctx_hunks(input: &str) -> Vec<CtxDiffHunk> {
    let mut hunks = Vec::new();
    let mut current_path: Option<PathBuf> = None;

    for line in input.lines() {
        if line.starts_with("diff --git ") {
            let (a_path, b_path) = parse_diff_header(line);
            current_path = Some(PathBuf::from(if b_path.is_empty() { a_path } else { b_path }));
            continue;
        }
        if line.starts_with("+++ /dev/null") {
            continue;
        }
        if line.starts_with("--- ") || line.starts_with("+++ ") {
            continue;
        }
        if line.starts_with("@@ ") {
            if let (Some(path), Some((old_start, old_len, new_start, new_len))) =
                (current_path.as_ref(), parse_ctx_hunk_header(line))
            {
                hunks.push(CtxDiffHunk::new(path.clone(), old_start, old_len, new_start, new_len));
            }
            continue;
        }
    }

    hunks
}

/// Extract (a_path, b_path) from a `diff --git a/path b/path` line.
fn parse_diff_header(line: &str) -> (String, String) {
    // Format: "diff --git a/<path> b/<path>"
    let rest = line.strip_prefix("diff --git ").unwrap_or(line);
    let parts: Vec<&str> = rest.splitn(2, " b/").collect();
    let a_path = parts
        .first()
        .unwrap_or(&"")
        .strip_prefix("a/")
        .unwrap_or(parts.first().unwrap_or(&""))
        .to_string();
    let b_path = parts.get(1).unwrap_or(&"").to_string();
    (a_path, b_path)
}

/// Parse `@@ -a,b +c,d @@` into `(old_start, old_len, new_start, new_len)`.
fn parse_ctx_hunk_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let trimmed = line.strip_prefix("@@ ")?;
    let end = trimmed.find(" @@")?;
    let range_str = &trimmed[..end];
    let parts: Vec<&str> = range_str.split(' ').collect();
    if parts.len() < 2 {
        return None;
    }
    let (old_start, old_len) = parse_ctx_range(parts[0].strip_prefix('-')?)?;
    let (new_start, new_len) = parse_ctx_range(parts[1].strip_prefix('+')?)?;
    Some((old_start, old_len, new_start, new_len))
}

/// Parse a range like "10,0" or "10" into (start, count). A zero count in
/// `-U0` output still carries a meaningful start line (the insertion point).
fn parse_ctx_range(s: &str) -> Option<(usize, usize)> {
    if let Some((start, count)) = s.split_once(',') {
        Some((start.parse().ok()?, count.parse().ok()?))
    } else {
        Some((s.parse().ok()?, 1))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_CONTEXT_DIFF: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -12,0 +13,2 @@ fn main() {
+    let x = 1;
+    let y = 2;
@@ -30,2 +33,0 @@ fn main() {
-    old_line_one();
-    old_line_two();";

    #[test]
    fn parse_ctx_hunks_splits_additions_and_deletions() {
        let hunks = parse_ctx_hunks(ZERO_CONTEXT_DIFF);
        assert_eq!(hunks.len(), 2);

        assert!(hunks[0].is_addition());
        assert_eq!(hunks[0].new_start, 13);
        assert_eq!(hunks[0].new_len, 2);

        assert!(hunks[1].is_deletion());
        assert_eq!(hunks[1].old_start, 30);
        assert_eq!(hunks[1].old_len, 2);
        assert_eq!(hunks[1].new_len, 0);
    }

    #[test]
    fn diff_header_parsing() {
        let (a, b) = parse_diff_header("diff --git a/src/lib.rs b/src/lib.rs");
        assert_eq!(a, "src/lib.rs");
        assert_eq!(b, "src/lib.rs");
    }

    #[test]
    fn diff_header_parsing_rename() {
        let (a, b) = parse_diff_header("diff --git a/old_name.rs b/new_name.rs");
        assert_eq!(a, "old_name.rs");
        assert_eq!(b, "new_name.rs");
    }

    #[test]
    fn split_range_handles_two_and_three_dot_ranges() {
        assert_eq!(
            split_range("main..feature"),
            (Some("main".to_string()), Some("feature".to_string()))
        );
        assert_eq!(
            split_range("main...feature"),
            (Some("main".to_string()), Some("feature".to_string()))
        );
    }

    #[test]
    fn split_range_single_ref_has_no_endpoints() {
        assert_eq!(split_range("HEAD"), (None, None));
    }

    #[test]
    fn split_range_open_ended_range() {
        assert_eq!(split_range("..feature"), (None, Some("feature".to_string())));
        assert_eq!(split_range("main.."), (Some("main".to_string()), None));
    }
}
