use crate::config::ImportsConfig;
use crate::error::require_dir;
use crate::lang::{detect_language, extension_of};
use anyhow::Result;
use ignore::WalkBuilder;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct FileImports {
    pub path: PathBuf,
    /// De-duplicated, in order of first appearance.
    pub imports: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub files: Vec<FileImports>,
    pub scanned_files: usize,
}

struct LanguagePatterns {
    import_patterns: Vec<Regex>,
    /// Matches the opening line of a grouped import block, e.g. Go's `import (`.
    block_open: Option<Regex>,
    block_item: Option<Regex>,
}

pub struct ImportFinder {
    language_patterns: HashMap<&'static str, LanguagePatterns>,
    extensions: Vec<String>,
    skip_dirs: Vec<String>,
}

impl ImportFinder {
    pub fn new(config: &ImportsConfig) -> Result<Self> {
        let mut language_patterns = HashMap::new();

        language_patterns.insert("python", LanguagePatterns {
            import_patterns: vec![
                Regex::new(r"^\s*from\s+([\w.]+)\s+import\b")?,
                Regex::new(r"^\s*import\s+([\w.]+(?:\s+as\s+\w+)?(?:\s*,\s*[\w.]+(?:\s+as\s+\w+)?)*)")?,
            ],
            block_open: None,
            block_item: None,
        });

        let javascript = || -> Result<LanguagePatterns> {
            Ok(LanguagePatterns {
                import_patterns: vec![
                    Regex::new(r#"^\s*import\s+.*?\s+from\s+['"]([^'"]+)['"]"#)?,
                    Regex::new(r#"^\s*import\s+['"]([^'"]+)['"]"#)?,
                    Regex::new(r#"^\s*export\s+.*?\s+from\s+['"]([^'"]+)['"]"#)?,
                    Regex::new(r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#)?,
                ],
                block_open: None,
                block_item: None,
            })
        };
        language_patterns.insert("javascript", javascript()?);
        language_patterns.insert("typescript", javascript()?);

        language_patterns.insert("rust", LanguagePatterns {
            import_patterns: vec![
                Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([^;]+);")?,
                Regex::new(r"^\s*extern\s+crate\s+(\w+)")?,
            ],
            block_open: None,
            block_item: None,
        });

        language_patterns.insert("go", LanguagePatterns {
            import_patterns: vec![Regex::new(r#"^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#)?],
            block_open: Some(Regex::new(r"^\s*import\s*\(\s*$")?),
            block_item: Some(Regex::new(r#"^\s*(?:[\w.]+\s+)?"([^"]+)""#)?),
        });

        let c_family = || -> Result<LanguagePatterns> {
            Ok(LanguagePatterns {
                import_patterns: vec![Regex::new(r#"^\s*#\s*include\s*[<"]([^>"]+)[>"]"#)?],
                block_open: None,
                block_item: None,
            })
        };
        language_patterns.insert("c", c_family()?);
        language_patterns.insert("cpp", c_family()?);

        Ok(Self {
            language_patterns,
            extensions: config
                .file_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            skip_dirs: config.skip_dirs.clone(),
        })
    }

    fn is_source_file(&self, path: &Path) -> bool {
        let wanted = extension_of(path)
            .map(|ext| self.extensions.contains(&ext))
            .unwrap_or(false);
        wanted
            && detect_language(path)
                .map(|lang| self.language_patterns.contains_key(lang))
                .unwrap_or(false)
    }

    /// Imports declared in `content`, read as `language`, de-duplicated.
    pub fn extract_imports(&self, content: &str, language: &str) -> Vec<String> {
        let Some(patterns) = self.language_patterns.get(language) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut imports = Vec::new();
        let mut push = |module: &str| {
            let module = module.trim();
            if !module.is_empty() && seen.insert(module.to_string()) {
                imports.push(module.to_string());
            }
        };

        let mut in_block = false;
        for line in content.lines() {
            if in_block {
                if line.trim_start().starts_with(')') {
                    in_block = false;
                } else if let Some(item) = patterns.block_item.as_ref().and_then(|re| re.captures(line)) {
                    if let Some(module) = item.get(1) {
                        push(module.as_str());
                    }
                }
                continue;
            }
            if patterns.block_open.as_ref().map(|re| re.is_match(line)).unwrap_or(false) {
                in_block = true;
                continue;
            }

            for pattern in &patterns.import_patterns {
                if let Some(captures) = pattern.captures(line) {
                    if let Some(module) = captures.get(1) {
                        if language == "python" {
                            // `import a, b as c`
                            for part in module.as_str().split(',') {
                                push(part.split_whitespace().next().unwrap_or(""));
                            }
                        } else {
                            push(module.as_str());
                        }
                    }
                }
            }
        }

        imports
    }

    /// Scan `dir` recursively. An empty directory, or one without source
    /// files, gives an empty report.
    pub fn scan(&self, dir: &Path) -> Result<ImportReport> {
        require_dir(dir)?;
        info!("Searching for imports in directory: {}", dir.display());

        let skip_dirs = self.skip_dirs.clone();
        let walker = WalkBuilder::new(dir)
            // Only the configured skip directories prune the scan; ignore
            // files would hide generated or vendored sources.
            .standard_filters(false)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                !(is_dir && entry.depth() > 0 && skip_dirs.iter().any(|s| entry.file_name() == s.as_str()))
            })
            .build();

        let mut report = ImportReport::default();
        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) || !self.is_source_file(path) {
                continue;
            }
            let Some(language) = detect_language(path) else {
                continue;
            };

            report.scanned_files += 1;
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(err) => {
                    warn!("Error reading file {}: {}", path.display(), err);
                    continue;
                }
            };

            let imports = self.extract_imports(&content, language);
            debug!("{}: {} import(s)", path.display(), imports.len());
            if !imports.is_empty() {
                report.files.push(FileImports { path: path.to_path_buf(), imports });
            }
        }

        report.files.sort_by(|a, b| a.path.cmp(&b.path));
        info!(
            "Scanned {} file(s), {} with imports",
            report.scanned_files,
            report.files.len()
        );
        Ok(report)
    }
}

/// Root package of an import path, or `None` for relative and
/// crate-internal imports.
pub fn root_module(import: &str) -> Option<String> {
    let import = import.trim();
    if import.is_empty() || import.starts_with('.') || import.starts_with('/') {
        return None;
    }
    if import.starts_with('@') {
        let mut parts = import.splitn(3, '/');
        let scope = parts.next()?;
        return parts.next().map(|pkg| format!("{}/{}", scope, pkg));
    }
    let root = import
        .split(|c| c == '.' || c == '/' || c == ':' || c == '{')
        .next()?
        .trim();
    match root {
        "" | "crate" | "self" | "super" => None,
        root => Some(root.to_string()),
    }
}

impl ImportReport {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sorted, unique root modules across all files.
    pub fn top_level_modules(&self) -> Vec<String> {
        let modules: BTreeSet<String> = self
            .files
            .iter()
            .flat_map(|f| f.imports.iter())
            .filter_map(|i| root_module(i))
            .collect();
        modules.into_iter().collect()
    }

    /// Grouped listing: the file path, then each import indented.
    pub fn render(&self, base: &Path) -> String {
        let mut out = String::new();
        for file in &self.files {
            let shown = file.path.strip_prefix(base).unwrap_or(&file.path);
            out.push_str(&format!("{}\n", shown.display()));
            for import in &file.imports {
                out.push_str(&format!("    {}\n", import));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finder() -> ImportFinder {
        ImportFinder::new(&ImportsConfig::default()).unwrap()
    }

    #[test]
    fn python_imports_are_split_and_deduplicated() {
        let src = "import os, sys as system\nfrom collections.abc import Mapping\n  import os\nfrom . import sibling\nx = 'import nothing'\n";
        assert_eq!(
            finder().extract_imports(src, "python"),
            vec!["os", "sys", "collections.abc", "."]
        );
    }

    #[test]
    fn javascript_and_rust_patterns() {
        let js = "import React, { useState } from 'react';\nimport './style.css';\nconst fs = require(\"fs\");\nexport { x } from './x';\n";
        assert_eq!(
            finder().extract_imports(js, "javascript"),
            vec!["react", "./style.css", "fs", "./x"]
        );

        let rs = "use std::collections::HashMap;\npub(crate) use crate::config::Config;\nextern crate serde;\n";
        assert_eq!(
            finder().extract_imports(rs, "rust"),
            vec!["std::collections::HashMap", "crate::config::Config", "serde"]
        );
    }

    #[test]
    fn go_import_blocks() {
        let go = "package main\n\nimport (\n\t\"fmt\"\n\tlog \"github.com/sirupsen/logrus\"\n)\n\nimport \"os\"\n";
        assert_eq!(
            finder().extract_imports(go, "go"),
            vec!["fmt", "github.com/sirupsen/logrus", "os"]
        );
    }

    #[test]
    fn root_modules() {
        assert_eq!(root_module("collections.abc").as_deref(), Some("collections"));
        assert_eq!(root_module("std::collections::HashMap").as_deref(), Some("std"));
        assert_eq!(root_module("@scope/pkg/sub").as_deref(), Some("@scope/pkg"));
        assert_eq!(root_module("./local"), None);
        assert_eq!(root_module("crate::config"), None);
        assert_eq!(root_module("stdio.h").as_deref(), Some("stdio"));
    }
}
