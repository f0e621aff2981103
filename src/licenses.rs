//! Dependency manifests, registry license lookups and the markdown report.

use crate::config::RegistryConfig;
use crate::error::ToolError;
use crate::net::Fetcher;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

pub const MISSING: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageSource {
    Conda,
    Pip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    /// Version pinned in the manifest, if any.
    pub version: Option<String>,
    pub source: PackageSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryInfo {
    pub version: Option<String>,
    pub license: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LicenseRow {
    pub package: String,
    pub version: Option<String>,
    pub license: Option<String>,
    pub source: PackageSource,
}

#[derive(Debug, Deserialize)]
struct EnvironmentFile {
    #[serde(default)]
    dependencies: Vec<EnvDependency>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnvDependency {
    Spec(String),
    Nested(HashMap<String, Vec<String>>),
}

const SPECIFIER_CHARS: &[char] = &['<', '>', '=', '!', '~', ' ', ','];

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// One `requirements.txt` line as a pip package. Options, paths and URLs
/// yield `None`.
pub fn parse_requirement_line(line: &str) -> Option<Package> {
    let line = line.split('#').next().unwrap_or("").trim();
    let line = line.split(';').next().unwrap_or("").trim();
    if line.is_empty() || line.starts_with('-') || line.starts_with('.') || line.starts_with('/') || line.contains("://") {
        return None;
    }

    let (name, version) = match line.split_once("==") {
        Some((name, version)) => (name, non_empty(version.split(',').next().unwrap_or(""))),
        None => (line.split(SPECIFIER_CHARS).next().unwrap_or(""), None),
    };
    // Drop extras: `requests[socks]`
    let name = name.split('[').next().unwrap_or("").trim();

    non_empty(name).map(|name| Package { name, version, source: PackageSource::Pip })
}

/// One conda dependency spec (`numpy=1.26`, `python>=3.11`, `conda-forge::pandas`).
pub fn parse_conda_spec(spec: &str) -> Option<Package> {
    let spec = spec.trim();
    let spec = spec.rsplit("::").next().unwrap_or(spec);

    let name_end = spec.find(SPECIFIER_CHARS).unwrap_or(spec.len());
    let name = &spec[..name_end];
    let rest = &spec[name_end..];

    let version = if rest.starts_with('=') {
        let pinned = rest.trim_start_matches('=');
        non_empty(pinned.split('=').next().unwrap_or(""))
    } else {
        None
    };

    non_empty(name).map(|name| Package { name, version, source: PackageSource::Conda })
}

pub struct Manifest;

impl Manifest {
    pub fn parse_requirements(text: &str) -> Vec<Package> {
        text.lines().filter_map(parse_requirement_line).collect()
    }

    pub fn parse_environment(text: &str) -> Result<Vec<Package>> {
        let env: EnvironmentFile = serde_yaml::from_str(text).context("parsing environment file")?;

        let mut packages = Vec::new();
        for dependency in env.dependencies {
            match dependency {
                EnvDependency::Spec(spec) => packages.extend(parse_conda_spec(&spec)),
                EnvDependency::Nested(nested) => {
                    if let Some(pip) = nested.get("pip") {
                        packages.extend(pip.iter().filter_map(|line| parse_requirement_line(line)));
                    }
                }
            }
        }
        Ok(packages)
    }

    /// Parse by file type: `.yml`/`.yaml` as a conda environment, anything
    /// else as pip requirements.
    pub fn from_path(path: &Path) -> Result<Vec<Package>> {
        if !path.is_file() {
            return Err(ToolError::missing("manifest", path).into());
        }
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );
        if is_yaml {
            Self::parse_environment(&text)
        } else {
            Ok(Self::parse_requirements(&text))
        }
    }
}

/// Pull license and version out of a PyPI JSON response.
pub fn parse_pypi(json: &Value) -> RegistryInfo {
    let info = &json["info"];
    let version = info["version"].as_str().and_then(non_empty);

    let license = info["license_expression"]
        .as_str()
        .and_then(non_empty)
        .or_else(|| {
            // Some projects paste the whole license text here.
            info["license"]
                .as_str()
                .and_then(non_empty)
                .filter(|l| l.len() <= 100 && !l.contains('\n'))
        })
        .or_else(|| {
            info["classifiers"].as_array().and_then(|classifiers| {
                classifiers
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|c| c.starts_with("License ::"))
                    .filter_map(|c| c.rsplit(" :: ").next())
                    .find_map(non_empty)
            })
        });

    RegistryInfo { version, license }
}

/// Pull license and version out of an Anaconda API package response.
pub fn parse_anaconda(json: &Value) -> RegistryInfo {
    RegistryInfo {
        version: json["latest_version"].as_str().and_then(non_empty),
        license: json["license"].as_str().and_then(non_empty),
    }
}

pub struct RegistryClient {
    fetcher: Fetcher,
    config: RegistryConfig,
}

impl RegistryClient {
    pub fn new(fetcher: Fetcher, config: RegistryConfig) -> Self {
        Self { fetcher, config }
    }

    pub async fn lookup(&self, package: &Package) -> Result<RegistryInfo> {
        match package.source {
            PackageSource::Pip => {
                let url = format!("{}/pypi/{}/json", self.config.pypi_url.trim_end_matches('/'), package.name);
                Ok(parse_pypi(&self.fetcher.get_json(&url).await?))
            }
            PackageSource::Conda => {
                let url = format!(
                    "{}/package/{}/{}",
                    self.config.anaconda_url.trim_end_matches('/'),
                    self.config.conda_channel,
                    package.name
                );
                Ok(parse_anaconda(&self.fetcher.get_json(&url).await?))
            }
        }
    }

    /// One row per package, in input order. A failed lookup is logged and
    /// leaves the registry fields empty.
    pub async fn fetch_all(&self, packages: &[Package]) -> Vec<LicenseRow> {
        let mut rows = Vec::with_capacity(packages.len());
        for package in packages {
            let info = match self.lookup(package).await {
                Ok(info) => {
                    info!(
                        "{}: license {}",
                        package.name,
                        info.license.as_deref().unwrap_or(MISSING)
                    );
                    info
                }
                Err(err) => {
                    warn!("License lookup for {} failed, recording as unknown: {:#}", package.name, err);
                    RegistryInfo::default()
                }
            };
            rows.push(LicenseRow {
                package: package.name.clone(),
                version: package.version.clone().or(info.version),
                license: info.license,
                source: package.source,
            });
        }
        rows
    }
}

fn cell(value: Option<&str>) -> String {
    value.unwrap_or(MISSING).replace('|', "\\|")
}

/// `| Package | Version | License |` table, `n/a` for anything missing.
pub fn render_markdown(rows: &[LicenseRow]) -> String {
    let mut md = String::from("# Package licenses\n\n");
    md.push_str("| Package | Version | License |\n");
    md.push_str("|---|---|---|\n");
    for row in rows {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            cell(Some(&row.package)),
            cell(row.version.as_deref()),
            cell(row.license.as_deref())
        ));
    }
    md
}

/// Packages from whichever of the two manifests exist. Fails only when
/// neither does.
pub fn load_manifests(environment: &Path, requirements: &Path) -> Result<Vec<Package>> {
    let mut packages = Vec::new();
    let mut found = false;
    for path in [environment, requirements] {
        if path.is_file() {
            found = true;
            let parsed = Manifest::from_path(path)?;
            info!("Read {} package(s) from {}", parsed.len(), path.display());
            packages.extend(parsed);
        } else {
            warn!("Manifest {} not found, skipping", path.display());
        }
    }
    if !found {
        return Err(ToolError::missing("manifest", requirements).into());
    }
    Ok(packages)
}
