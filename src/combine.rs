//! Concatenate the text files of a directory into one output file.

use crate::dirtree::{render_tree, TreeEntry};
use crate::error::require_dir;
use crate::lang::{extension_of, fence_tag};
use crate::output::{resolve_path, slash_path};
use anyhow::{anyhow, bail, Context};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use glob::{MatchOptions, Pattern};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const MARKER_OPEN: &str = "==> ";
const MARKER_CLOSE: &str = " <==";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineFormat {
    /// Marker line, exact content, newline. Reversible with [`split_combined`].
    #[default]
    Plain,
    /// Structure tree plus one fenced code block per file.
    Markdown,
}

#[derive(Debug, Clone, Default)]
pub struct CombineOptions {
    /// Extensions to keep, with or without the leading dot. Empty keeps all.
    pub extensions: Vec<String>,
    /// Glob patterns for files or directories to leave out. Each is matched
    /// against the entry's name and its `/`-separated path relative to the
    /// combined directory; a matching directory takes its contents with it.
    pub exclude: Vec<String>,
    pub recursive: bool,
    /// Take dot-files, and with `recursive` dot-directories, as inputs.
    pub include_hidden: bool,
    /// Files or directories never taken as inputs, such as the log directory.
    pub skip_paths: Vec<PathBuf>,
    pub format: CombineFormat,
}

#[derive(Debug, Default)]
pub struct CombineReport {
    pub included: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub bytes_written: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedSection {
    pub name: String,
    pub content: String,
}

pub struct Combiner {
    options: CombineOptions,
    extensions: Vec<String>,
    exclude: Vec<Pattern>,
    skip: HashSet<PathBuf>,
}

const PATH_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// `==> name (N bytes) <==`
pub fn marker_line(name: &str, len: usize) -> String {
    format!("{}{} ({} bytes){}", MARKER_OPEN, name, len, MARKER_CLOSE)
}

impl Combiner {
    pub fn new(options: CombineOptions) -> crate::Result<Self> {
        let extensions = options
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        let exclude = options
            .exclude
            .iter()
            .map(|raw| {
                let pattern = raw.trim_start_matches("./").trim_end_matches('/');
                Pattern::new(pattern).with_context(|| format!("invalid exclude pattern {:?}", raw))
            })
            .collect::<crate::Result<Vec<_>>>()?;
        let skip = options.skip_paths.iter().filter_map(|p| resolve_path(p)).collect();
        Ok(Self { options, extensions, exclude, skip })
    }

    /// Whether the entry at `relative` (under the directory resolved to
    /// `resolved_dir`) may be taken or descended into.
    fn admits(&self, resolved_dir: &Path, relative: &Path) -> bool {
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !self.options.include_hidden && name.starts_with('.') {
            return false;
        }
        let rel = slash_path(relative);
        if let Some(pattern) = self
            .exclude
            .iter()
            .find(|p| p.matches_with(&name, PATH_MATCH) || p.matches_with(&rel, PATH_MATCH))
        {
            debug!("Excluding {} (matches {})", rel, pattern);
            return false;
        }
        if self.skip.contains(&resolved_dir.join(relative)) {
            debug!("Excluding {}", rel);
            return false;
        }
        true
    }

    fn wants(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        extension_of(path)
            .map(|ext| self.extensions.contains(&ext))
            .unwrap_or(false)
    }

    /// Regular files to combine, sorted by path relative to `dir`.
    pub fn collect(&self, dir: &Path) -> crate::Result<Vec<PathBuf>> {
        require_dir(dir)?;

        let resolved_dir = dir.canonicalize()?;
        let mut relative = Vec::new();
        if self.options.recursive {
            let walker = WalkDir::new(dir).min_depth(1).into_iter().filter_entry(|e| {
                e.path()
                    .strip_prefix(dir)
                    .map(|rel| self.admits(&resolved_dir, rel))
                    .unwrap_or(false)
            });
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!("Skipping unreadable entry: {}", err);
                        continue;
                    }
                };
                if entry.file_type().is_file() && self.wants(entry.path()) {
                    if let Ok(rel) = entry.path().strip_prefix(dir) {
                        relative.push(rel.to_path_buf());
                    }
                }
            }
        } else {
            for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!("Skipping unreadable entry in {}: {}", dir.display(), err);
                        continue;
                    }
                };
                let path = entry.path();
                let rel = PathBuf::from(entry.file_name());
                if path.is_file() && self.admits(&resolved_dir, &rel) && self.wants(&path) {
                    relative.push(rel);
                }
            }
        }

        relative.sort();
        Ok(relative.into_iter().map(|rel| dir.join(rel)).collect())
    }

    /// Combine every wanted file of `dir` into `output`.
    ///
    /// Files that cannot be read or are not UTF-8 text are logged and
    /// skipped; the run still completes.
    pub fn combine(&self, dir: &Path, output: &Path) -> crate::Result<CombineReport> {
        let files = self.collect(dir)?;
        info!("Combining {} candidate files from {}", files.len(), dir.display());

        let output_canonical = fs::canonicalize(output).ok();
        let mut report = CombineReport::default();
        let mut sections = Vec::new();

        for path in files {
            if output_canonical.is_some() && fs::canonicalize(&path).ok() == output_canonical {
                continue;
            }
            let name = slash_path(path.strip_prefix(dir).unwrap_or(&path));
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!("Skipping {}: {}", path.display(), err);
                    report.skipped.push(path);
                    continue;
                }
            };
            match String::from_utf8(bytes) {
                Ok(content) => {
                    info!("Processing file: {}", path.display());
                    sections.push(CombinedSection { name, content });
                    report.included.push(path);
                }
                Err(_) => {
                    warn!("Skipping {}: not valid UTF-8 text", path.display());
                    report.skipped.push(path);
                }
            }
        }

        let rendered = match self.options.format {
            CombineFormat::Plain => render_plain(&sections),
            CombineFormat::Markdown => render_markdown(&sections),
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut out = BufWriter::new(
            File::create(output).with_context(|| format!("creating {}", output.display()))?,
        );
        out.write_all(rendered.as_bytes())?;
        out.flush()?;
        report.bytes_written = rendered.len() as u64;

        info!(
            "Combined {} files into {} ({} skipped)",
            report.included.len(),
            output.display(),
            report.skipped.len()
        );
        Ok(report)
    }
}

fn render_plain(sections: &[CombinedSection]) -> String {
    let mut out = String::new();
    for section in sections {
        out.push_str(&marker_line(&section.name, section.content.len()));
        out.push('\n');
        out.push_str(&section.content);
        out.push('\n');
    }
    out
}

fn render_markdown(sections: &[CombinedSection]) -> String {
    let mut entries = Vec::new();
    let mut seen_dirs = HashSet::new();
    for section in sections {
        let path = PathBuf::from(&section.name);
        let components: Vec<_> = path.components().collect();
        let mut prefix = PathBuf::new();
        for (depth, component) in components.iter().enumerate().take(components.len().saturating_sub(1)) {
            prefix.push(component);
            if seen_dirs.insert(prefix.clone()) {
                entries.push(TreeEntry { relative: prefix.clone(), depth: depth + 1, is_dir: true });
            }
        }
        let depth = components.len();
        entries.push(TreeEntry { relative: path, depth, is_dir: false });
    }

    let mut md = format!("# Combined files\n\n**Files:** {}\n\n## Structure\n\n```\n", sections.len());
    for line in render_tree(".", &entries) {
        md.push_str(&line);
        md.push('\n');
    }
    md.push_str("```\n\n");

    for section in sections {
        let fence = if section.content.contains("```") { "````" } else { "```" };
        md.push_str(&format!("## {}\n\n{}{}\n", section.name, fence, fence_tag(Path::new(&section.name))));
        md.push_str(&section.content);
        if !section.content.ends_with('\n') {
            md.push('\n');
        }
        md.push_str(fence);
        md.push_str("\n\n");
    }
    md
}

/// Split plain combined output back into its sections, byte for byte.
pub fn split_combined(text: &str) -> crate::Result<Vec<CombinedSection>> {
    let mut sections = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let line_end = rest
            .find('\n')
            .ok_or_else(|| anyhow!("unterminated marker line"))?;
        let header = &rest[..line_end];
        let inner = header
            .strip_prefix(MARKER_OPEN)
            .and_then(|h| h.strip_suffix(MARKER_CLOSE))
            .ok_or_else(|| anyhow!("malformed marker line: {}", header))?;
        let open = inner
            .rfind(" (")
            .ok_or_else(|| anyhow!("marker without length: {}", header))?;
        let name = &inner[..open];
        let len: usize = inner[open + 2..]
            .strip_suffix(" bytes)")
            .ok_or_else(|| anyhow!("marker without length: {}", header))?
            .parse()
            .with_context(|| format!("bad length in marker: {}", header))?;

        let body_start = line_end + 1;
        let body_end = body_start + len;
        let content = rest
            .get(body_start..body_end)
            .ok_or_else(|| anyhow!("section {} is truncated", name))?;
        if rest.as_bytes().get(body_end) != Some(&b'\n') {
            bail!("section {} is missing its terminator", name);
        }

        sections.push(CombinedSection { name: name.to_string(), content: content.to_string() });
        rest = &rest[body_end + 1..];
    }

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_reverses_plain_rendering() {
        let sections = vec![
            CombinedSection { name: "a.txt".into(), content: "no trailing newline".into() },
            CombinedSection { name: "b c.txt".into(), content: "==> fake (3 bytes) <==\nx\n".into() },
            CombinedSection { name: "empty.txt".into(), content: String::new() },
            CombinedSection { name: "ünï.txt".into(), content: "héllo\n\n".into() },
        ];
        let rendered = render_plain(&sections);
        assert_eq!(split_combined(&rendered).unwrap(), sections);
    }

    #[test]
    fn split_rejects_truncated_output() {
        let rendered = render_plain(&[CombinedSection { name: "a".into(), content: "abcdef".into() }]);
        assert!(split_combined(&rendered[..rendered.len() - 3]).is_err());
        assert!(split_combined("garbage\n").is_err());
    }

    #[test]
    fn markdown_lists_structure_and_fences() {
        let sections = vec![
            CombinedSection { name: "src/main.py".into(), content: "print('hi')".into() },
            CombinedSection { name: "z.txt".into(), content: "plain\n".into() },
        ];
        let md = render_markdown(&sections);
        assert!(md.contains("├── src/\n│   └── main.py\n└── z.txt\n"));
        assert!(md.contains("## src/main.py\n\n```python\nprint('hi')\n```\n"));
        assert!(md.contains("## z.txt\n\n```\nplain\n```\n"));
    }
}
