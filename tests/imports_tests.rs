use std::fs;
use tempfile::TempDir;
use toolbelt::config::ImportsConfig;
use toolbelt::{ImportFinder, ToolError};

fn finder() -> ImportFinder {
    ImportFinder::new(&ImportsConfig::default()).unwrap()
}

#[test]
fn directory_without_sources_gives_empty_report() {
    let dir = TempDir::new().unwrap();
    let report = finder().scan(dir.path()).unwrap();
    assert!(report.is_empty());
    assert_eq!(report.scanned_files, 0);

    fs::write(dir.path().join("README.md"), "import os\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "from x import y\n").unwrap();
    let report = finder().scan(dir.path()).unwrap();
    assert!(report.is_empty());
    assert!(report.top_level_modules().is_empty());
}

#[test]
fn scans_recursively_and_skips_vendor_dirs() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("app/core")).unwrap();
    fs::create_dir_all(dir.path().join("node_modules/lib")).unwrap();
    fs::create_dir_all(dir.path().join(".venv/lib")).unwrap();
    fs::write(dir.path().join("app/main.py"), "import os\nimport requests\nfrom app.core import db\n").unwrap();
    fs::write(dir.path().join("app/core/db.py"), "import sqlite3\nimport os\n").unwrap();
    fs::write(dir.path().join("app/constants.py"), "X = 1\n").unwrap();
    fs::write(dir.path().join("web.js"), "import express from 'express';\n").unwrap();
    fs::write(dir.path().join("node_modules/lib/index.js"), "require('left-pad');\n").unwrap();
    fs::write(dir.path().join(".venv/lib/site.py"), "import hidden\n").unwrap();

    let report = finder().scan(dir.path()).unwrap();

    assert_eq!(report.scanned_files, 4);
    let files: Vec<String> = report
        .files
        .iter()
        .map(|f| f.path.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(files, vec!["app/core/db.py", "app/main.py", "web.js"]);
    assert_eq!(report.files[1].imports, vec!["os", "requests", "app.core"]);
    assert_eq!(report.top_level_modules(), vec!["app", "express", "os", "requests", "sqlite3"]);

    let rendered = report.render(dir.path());
    assert!(rendered.contains("app/main.py\n    os\n    requests\n    app.core\n") || cfg!(windows));
}

#[test]
fn missing_directory_is_input_not_found() {
    let dir = TempDir::new().unwrap();
    let err = finder().scan(&dir.path().join("gone")).unwrap_err();
    assert!(matches!(err.downcast_ref::<ToolError>(), Some(ToolError::InputNotFound { .. })));
}

#[test]
fn gitignored_sources_are_still_scanned() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    fs::create_dir_all(dir.path().join("gen")).unwrap();
    fs::write(dir.path().join(".gitignore"), "gen/\n").unwrap();
    fs::write(dir.path().join(".ignore"), "*.py\n").unwrap();
    fs::write(dir.path().join("gen/client.py"), "import requests\n").unwrap();

    let report = finder().scan(dir.path()).unwrap();

    assert_eq!(report.scanned_files, 1);
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.top_level_modules(), vec!["requests"]);
}
