//! Recursive directory listing with per-directory confirmation.

use crate::error::require_dir;
use crate::output::{resolve_path, slash_path};
use crate::prompt::Confirm;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the walk root.
    pub relative: PathBuf,
    /// 1 for direct children of the root.
    pub depth: usize,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DirTreeOptions {
    pub include_hidden: bool,
    pub follow_links: bool,
    /// Paths left out of the listing together with their contents, such as
    /// the listing's own output file and directory.
    pub exclude: Vec<PathBuf>,
}

pub struct DirTree {
    options: DirTreeOptions,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

impl DirTree {
    pub fn new(options: DirTreeOptions) -> Self {
        Self { options }
    }

    /// Depth-first listing of everything under `root`, siblings sorted by name.
    ///
    /// `confirm` is asked before each subdirectory is entered; a declined
    /// directory is neither listed nor descended into. Entries that cannot be
    /// read are logged and skipped.
    pub fn walk(&self, root: &Path, confirm: &mut dyn Confirm) -> crate::Result<Vec<TreeEntry>> {
        require_dir(root)?;
        info!("Listing directory structure of {}", root.display());

        let include_hidden = self.options.include_hidden;
        let excluded: HashSet<PathBuf> = self.options.exclude.iter().filter_map(|p| resolve_path(p)).collect();
        let resolved_root = root.canonicalize()?;
        let walk_root = root.to_path_buf();
        let mut walker = WalkDir::new(root)
            .follow_links(self.options.follow_links)
            .sort_by_file_name()
            .min_depth(1)
            .into_iter()
            .filter_entry(move |entry| {
                if !include_hidden && is_hidden(entry) {
                    return false;
                }
                let relative = entry.path().strip_prefix(&walk_root).unwrap_or(entry.path());
                let excluded_here = excluded.contains(&resolved_root.join(relative));
                if excluded_here {
                    debug!("Excluding {}", entry.path().display());
                }
                !excluded_here
            });

        let mut entries = Vec::new();
        loop {
            let entry = match walker.next() {
                None => break,
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    let location = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    warn!("Skipping unreadable entry {}: {}", location, err);
                    continue;
                }
            };

            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or_else(|_| entry.path())
                .to_path_buf();
            let is_dir = entry.file_type().is_dir();

            if is_dir {
                let question = format!("Include directory {}/?", slash_path(&relative));
                if !confirm.confirm(&question) {
                    info!("Skipping directory {}", slash_path(&relative));
                    walker.skip_current_dir();
                    continue;
                }
            }

            debug!("Found {}", slash_path(&relative));
            entries.push(TreeEntry {
                relative,
                depth: entry.depth(),
                is_dir,
            });
        }

        info!("Listed {} entries under {}", entries.len(), root.display());
        Ok(entries)
    }
}

/// One relative path per entry, `/`-separated.
pub fn render_paths(entries: &[TreeEntry]) -> Vec<String> {
    entries.iter().map(|e| slash_path(&e.relative)).collect()
}

/// Box-drawing rendering headed by `root_name/`.
pub fn render_tree(root_name: &str, entries: &[TreeEntry]) -> Vec<String> {
    // Whether each entry is the last among its siblings.
    let mut is_last = vec![false; entries.len()];
    let mut sibling_follows: Vec<bool> = Vec::new();
    for (i, entry) in entries.iter().enumerate().rev() {
        let depth = entry.depth;
        if sibling_follows.len() <= depth {
            sibling_follows.resize(depth + 1, false);
        }
        is_last[i] = !sibling_follows[depth];
        sibling_follows[depth] = true;
        sibling_follows.truncate(depth + 1);
    }

    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(format!("{}/", root_name));

    let mut ancestors_last: Vec<bool> = Vec::new();
    for (entry, last) in entries.iter().zip(is_last) {
        ancestors_last.truncate(entry.depth.saturating_sub(1));

        let mut line = String::new();
        for &ancestor_last in &ancestors_last {
            line.push_str(if ancestor_last { "    " } else { "│   " });
        }
        line.push_str(if last { "└── " } else { "├── " });
        line.push_str(
            &entry
                .relative
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        if entry.is_dir {
            line.push('/');
            ancestors_last.push(last);
        }
        lines.push(line);
    }
    lines
}
