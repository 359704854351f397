//! Co-change edge builder: files historically modified together.
//!
//! Ported from `edges/history/cochange.py`. Failure to read git history
//! (no repository, shallow clone, git missing) is non-fatal: the builder
//! simply contributes no edges.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;

use super::{add_edge, BuildContext, Category, EdgeBuilder, EdgeMap};
use crate::diffctx::types::FragmentId;

const DEFAULT_COMMITS_LIMIT: usize = 500;
const MAX_FILES_PER_COMMIT: usize = 30;
const MIN_COUNT: usize = 2;
const WEIGHT_CAP: f64 = 0.40;

pub struct CochangeEdgeBuilder {
    commits_limit: usize,
}

impl Default for CochangeEdgeBuilder {
    fn default() -> Self {
        Self {
            commits_limit: DEFAULT_COMMITS_LIMIT,
        }
    }
}

impl CochangeEdgeBuilder {
    pub fn with_commits_limit(commits_limit: usize) -> Self {
        Self { commits_limit }
    }

    fn commit_file_lists(&self, root: &std::path::Path) -> Vec<Vec<PathBuf>> {
        let output = Command::new("git")
            .args([
                "log",
                "--name-only",
                "--format=%x00",
                "-n",
                &self.commits_limit.to_string(),
            ])
            .current_dir(root)
            .output();

        let Ok(output) = output else { return Vec::new() };
        if !output.status.success() {
            return Vec::new();
        }
        let text = String::from_utf8_lossy(&output.stdout);

        text.split('\u{0}')
            .map(|block| {
                block
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(PathBuf::from)
                    .collect::<Vec<_>>()
            })
            .filter(|files: &Vec<PathBuf>| !files.is_empty() && files.len() <= MAX_FILES_PER_COMMIT)
            .collect()
    }
}

impl EdgeBuilder for CochangeEdgeBuilder {
    fn category(&self) -> Category {
        Category::History
    }

    fn build(&self, ctx: &BuildContext<'_>) -> EdgeMap {
        let commits = self.commit_file_lists(ctx.root);
        if commits.is_empty() {
            return EdgeMap::new();
        }

        let mut pair_counts: HashMap<(PathBuf, PathBuf), usize> = HashMap::new();
        for files in &commits {
            let mut in_universe: Vec<&PathBuf> = files.iter().filter(|f| ctx.by_path.contains_key(*f)).collect();
            in_universe.sort();
            in_universe.dedup();
            for i in 0..in_universe.len() {
                for j in (i + 1)..in_universe.len() {
                    let key = (in_universe[i].clone(), in_universe[j].clone());
                    *pair_counts.entry(key).or_insert(0) += 1;
                }
            }
        }

        let mut edges = EdgeMap::new();
        for ((a, b), count) in pair_counts {
            if count < MIN_COUNT {
                continue;
            }
            let weight = (0.1 * (1.0 + count as f64).ln()).min(WEIGHT_CAP);
            if let (Some(fa), Some(fb)) = (representative(ctx, &a), representative(ctx, &b)) {
                add_edge(&mut edges, fa.clone(), fb.clone(), weight);
                add_edge(&mut edges, fb, fa, weight);
            }
        }
        edges
    }
}

fn representative(ctx: &BuildContext<'_>, path: &std::path::Path) -> Option<FragmentId> {
    ctx.fragments_in(path)
        .max_by_key(|f| f.token_count)
        .map(|f| f.id.clone())
}
