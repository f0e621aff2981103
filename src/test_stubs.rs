//! pytest stub generation for the functions of a Python source tree.

use crate::error::require_dir;
use crate::output::{resolve_path, write_text};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StubLayout {
    /// One `test_<stem>.py` per source file.
    PerFile,
    /// Everything in `<source-dir-name>-combined-tests.py`.
    #[default]
    Combined,
}

#[derive(Debug, Default)]
pub struct StubReport {
    pub stubs_created: usize,
    pub files_written: Vec<PathBuf>,
}

pub struct StubGenerator {
    def_pattern: Regex,
}

/// Names of the `def` and `async def` functions in `source`, in order,
/// each name once.
pub fn extract_python_functions(source: &str) -> Vec<String> {
    match StubGenerator::new() {
        Ok(generator) => generator.functions(source),
        Err(_) => Vec::new(),
    }
}

fn stub_for(function: &str) -> String {
    format!(
        "\ndef test_{name}():\n    \"\"\"\n    Test {name} function.\n    \"\"\"\n    pass\n",
        name = function
    )
}

fn section_separator(file_name: &str) -> String {
    let rule = "#".repeat(file_name.len() + 6);
    format!("{rule}\n#  {file_name}  #\n{rule}\n")
}

const COMBINED_SUFFIX: &str = "-combined-tests.py";

/// Stub files written by earlier runs, per-file or combined.
fn is_test_module(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("test_") || n.ends_with(COMBINED_SUFFIX))
        .unwrap_or(false)
}

impl StubGenerator {
    pub fn new() -> Result<Self> {
        Ok(Self { def_pattern: Regex::new(r"^\s*(?:async\s+)?def\s+(\w+)\s*\(")? })
    }

    fn functions(&self, source: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        source
            .lines()
            .filter_map(|line| self.def_pattern.captures(line))
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Python files under `source_dir`, leaving out `test_dir` when it sits
    /// inside the source tree.
    fn python_sources(&self, source_dir: &Path, test_dir: &Path) -> Vec<PathBuf> {
        let test_dir = resolve_path(test_dir);
        WalkDir::new(source_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                let inside_tests = entry.depth() > 0
                    && entry.file_type().is_dir()
                    && test_dir.is_some()
                    && entry.path().canonicalize().ok() == test_dir;
                if inside_tests {
                    debug!("Skipping test directory {}", entry.path().display());
                }
                !inside_tests
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().map(|ext| ext == "py").unwrap_or(false))
            .filter(|p| !is_test_module(p))
            .collect()
    }

    /// Write stubs for every function under `source_dir` into `test_dir`.
    /// A function name already stubbed earlier in the run is not repeated.
    pub fn generate(&self, source_dir: &Path, test_dir: &Path, layout: StubLayout) -> Result<StubReport> {
        require_dir(source_dir)?;
        info!("Generating test stubs for {} into {}", source_dir.display(), test_dir.display());

        let mut report = StubReport::default();
        let mut stubbed: HashSet<String> = HashSet::new();
        let mut combined = String::new();

        for path in self.python_sources(source_dir, test_dir) {
            let source = match std::fs::read_to_string(&path) {
                Ok(source) => source,
                Err(err) => {
                    warn!("Error reading {}: {}", path.display(), err);
                    continue;
                }
            };
            let new_functions: Vec<String> = self
                .functions(&source)
                .into_iter()
                .filter(|f| stubbed.insert(f.clone()))
                .collect();
            debug!("{}: {} new function(s)", path.display(), new_functions.len());
            if new_functions.is_empty() {
                continue;
            }

            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let stubs: String = new_functions.iter().map(|f| stub_for(f)).collect();
            report.stubs_created += new_functions.len();

            match layout {
                StubLayout::Combined => {
                    combined.push_str(&section_separator(&file_name));
                    combined.push_str(&stubs);
                    combined.push('\n');
                }
                StubLayout::PerFile => {
                    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
                    let target = test_dir.join(format!("test_{stem}.py"));
                    write_text(&target, &format!("# Auto-generated test stubs for {file_name}\n{stubs}"))?;
                    info!("Output saved to {}", target.display());
                    report.files_written.push(target);
                }
            }
        }

        if layout == StubLayout::Combined {
            let target = test_dir.join(format!("{}{}", dir_name(source_dir)?, COMBINED_SUFFIX));
            write_text(&target, &combined)?;
            info!("Output saved to {}", target.display());
            report.files_written.push(target);
        }

        info!("Generated {} test stubs", report.stubs_created);
        Ok(report)
    }
}

fn dir_name(dir: &Path) -> Result<String> {
    let resolved = dir
        .canonicalize()
        .with_context(|| format!("resolving {}", dir.display()))?;
    Ok(resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string()))
}
