//! In-place line and string edits across every file of one extension.

use crate::error::require_dir;
use crate::lang::extension_of;
use crate::output::write_text;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEdit {
    /// Drop every line whose trimmed text equals this.
    RemoveLine(String),
    /// Replace every line whose trimmed text equals `from` with `to`.
    ReplaceLine { from: String, to: String },
    /// Replace every occurrence of `from`, anywhere in the file.
    ReplaceString { from: String, to: String },
}

#[derive(Debug, Clone)]
pub struct EditedFile {
    pub path: PathBuf,
    pub changes: usize,
}

#[derive(Debug, Clone)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct EditReport {
    pub scanned: usize,
    pub edited: Vec<EditedFile>,
    pub failed: Vec<FailedFile>,
}

impl EditReport {
    pub fn total_changes(&self) -> usize {
        self.edited.iter().map(|f| f.changes).sum()
    }
}

fn line_ending(line: &str) -> &str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

impl LineEdit {
    fn validate(&self) -> Result<()> {
        if let LineEdit::ReplaceString { from, .. } = self {
            if from.is_empty() {
                bail!("the string to replace must not be empty");
            }
        }
        Ok(())
    }

    /// Edited text and the number of changes, or `None` when nothing matched.
    pub fn apply(&self, content: &str, path: &Path) -> Option<(String, usize)> {
        let mut changes = 0;
        let edited = match self {
            LineEdit::ReplaceString { from, to } => {
                changes = content.matches(from.as_str()).count();
                if changes > 0 {
                    info!("Replaced string in file {}: '{}' with '{}' ({}x)", path.display(), from, to, changes);
                }
                content.replace(from.as_str(), to)
            }
            LineEdit::RemoveLine(target) => {
                let mut out = String::with_capacity(content.len());
                for line in content.split_inclusive('\n') {
                    if line.trim() == target {
                        info!("Removed line from file {}: {}", path.display(), line.trim());
                        changes += 1;
                    } else {
                        out.push_str(line);
                    }
                }
                out
            }
            LineEdit::ReplaceLine { from, to } => {
                let mut out = String::with_capacity(content.len());
                for line in content.split_inclusive('\n') {
                    if line.trim() == from {
                        info!("Replaced line in file {}: {} with {}", path.display(), line.trim(), to);
                        out.push_str(to);
                        out.push_str(line_ending(line));
                        changes += 1;
                    } else {
                        out.push_str(line);
                    }
                }
                out
            }
        };
        (changes > 0).then_some((edited, changes))
    }
}

/// Apply `edit` to every file under `dir` with the given extension. Only
/// files that change are rewritten; unreadable files are recorded and skipped.
pub fn edit_files(dir: &Path, extension: &str, edit: &LineEdit) -> Result<EditReport> {
    require_dir(dir)?;
    edit.validate()?;
    let wanted = extension.trim_start_matches('.').to_lowercase();
    info!("Starting to process files in directory: {}", dir.display());

    let mut report = EditReport::default();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                error!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || extension_of(path).as_deref() != Some(wanted.as_str()) {
            continue;
        }

        report.scanned += 1;
        debug!("Processing file: {}", path.display());
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                error!("Error processing file {}: {}", path.display(), err);
                report.failed.push(FailedFile { path: path.to_path_buf(), reason: err.to_string() });
                continue;
            }
        };

        if let Some((edited, changes)) = edit.apply(&content, path) {
            if let Err(err) = write_text(path, &edited) {
                error!("Error processing file {}: {:#}", path.display(), err);
                report.failed.push(FailedFile { path: path.to_path_buf(), reason: format!("{:#}", err) });
                continue;
            }
            report.edited.push(EditedFile { path: path.to_path_buf(), changes });
        }
    }

    info!(
        "Edited {} of {} file(s), {} change(s)",
        report.edited.len(),
        report.scanned,
        report.total_changes()
    );
    Ok(report)
}
