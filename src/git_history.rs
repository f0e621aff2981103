//! Commit history and per-commit diffs for a single file, via the git CLI.

use crate::error::{require_file, ToolError};
use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';
const LOG_FORMAT: &str = "--format=%x1e%H%x1f%an%x1f%ad%x1f%s";

#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub subject: String,
}

#[derive(Debug, Clone)]
pub struct FileChange {
    pub commit: CommitInfo,
    pub diff: String,
}

pub struct GitHistory {
    workdir: PathBuf,
    file_arg: OsString,
}

impl CommitInfo {
    pub fn parsed_date(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.date).ok()
    }
}

fn parse_commit_header(header: &str) -> Option<CommitInfo> {
    let mut fields = header.split(FIELD_SEP);
    let hash = fields.next()?.trim();
    if hash.is_empty() {
        return None;
    }
    Some(CommitInfo {
        hash: hash.to_string(),
        author: fields.next().unwrap_or("").to_string(),
        date: fields.next().unwrap_or("").to_string(),
        subject: fields.next().unwrap_or("").to_string(),
    })
}

/// Split `git log -p` output produced with [`LOG_FORMAT`] into changes.
fn parse_log_with_patches(output: &str) -> Vec<FileChange> {
    output
        .split(RECORD_SEP)
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let (header, diff) = record.split_once('\n').unwrap_or((record, ""));
            let commit = parse_commit_header(header)?;
            Some(FileChange { commit, diff: diff.trim_matches('\n').to_string() })
        })
        .collect()
}

impl GitHistory {
    /// `file` must exist; git runs from its parent directory.
    pub fn new(file: &Path) -> Result<Self> {
        require_file(file)?;
        let workdir = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_arg = file
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| ToolError::missing("file", file))?;
        Ok(Self { workdir, file_arg })
    }

    fn run_git(&self, args: &[&OsStr]) -> Result<String> {
        debug!("git {:?} in {}", args, self.workdir.display());
        let output = Command::new("git")
            .current_dir(&self.workdir)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => ToolError::external("git", "git executable not found in PATH"),
                _ => ToolError::external("git", err.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ToolError::external("git", stderr).into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Every commit touching the file, newest first, following renames.
    pub fn commits(&self) -> Result<Vec<CommitInfo>> {
        let output = self.run_git(&[
            OsStr::new("log"),
            OsStr::new("--follow"),
            OsStr::new("--date=iso-strict"),
            OsStr::new(LOG_FORMAT),
            OsStr::new("--"),
            self.file_arg.as_os_str(),
        ])?;
        Ok(output
            .split(RECORD_SEP)
            .filter_map(|record| parse_commit_header(record.trim_end_matches('\n')))
            .collect())
    }

    /// The patch `commit` applied to the file.
    pub fn diff(&self, commit: &str) -> Result<String> {
        self.run_git(&[
            OsStr::new("show"),
            OsStr::new("--format="),
            OsStr::new("--patch"),
            OsStr::new(commit),
            OsStr::new("--"),
            self.file_arg.as_os_str(),
        ])
        .map(|diff| diff.trim_matches('\n').to_string())
    }

    /// Commits with their diffs, newest first. Renames are followed, so
    /// older diffs show the file under its earlier name.
    pub fn changes(&self) -> Result<Vec<FileChange>> {
        let output = self.run_git(&[
            OsStr::new("log"),
            OsStr::new("--follow"),
            OsStr::new("--patch"),
            OsStr::new("--date=iso-strict"),
            OsStr::new(LOG_FORMAT),
            OsStr::new("--"),
            self.file_arg.as_os_str(),
        ])?;
        let changes = parse_log_with_patches(&output);
        info!("Found {} commit(s) touching {}", changes.len(), self.file_arg.to_string_lossy());
        Ok(changes)
    }
}

/// Console rendering: header per commit, then its diff, then an 80-column rule.
pub fn render_changes(changes: &[FileChange]) -> String {
    let rule = "-".repeat(80);
    let mut out = String::new();
    for change in changes {
        let date = change
            .commit
            .parsed_date()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S %z").to_string())
            .unwrap_or_else(|| change.commit.date.clone());
        out.push_str(&format!("Commit: {}\n", change.commit.hash));
        out.push_str(&format!("Author: {}\n", change.commit.author));
        out.push_str(&format!("Date:   {}\n\n", date));
        out.push_str(&format!("    {}\n\n", change.commit.subject));
        if !change.diff.is_empty() {
            out.push_str(&change.diff);
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');
    }
    out
}
