use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub http: HttpConfig,
    pub registry: RegistryConfig,
    pub imports: ImportsConfig,
    pub walk: WalkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub pypi_url: String,
    pub anaconda_url: String,
    pub conda_channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportsConfig {
    pub file_extensions: Vec<String>,
    pub skip_dirs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    pub include_hidden: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            log_dir: PathBuf::from("./logs"),
            http: HttpConfig::default(),
            registry: RegistryConfig::default(),
            imports: ImportsConfig::default(),
            walk: WalkConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: format!("toolbelt/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            pypi_url: "https://pypi.org".to_string(),
            anaconda_url: "https://api.anaconda.org".to_string(),
            conda_channel: "conda-forge".to_string(),
        }
    }
}

impl Default for ImportsConfig {
    fn default() -> Self {
        Self {
            file_extensions: vec![
                "py".to_string(),
                "js".to_string(),
                "jsx".to_string(),
                "ts".to_string(),
                "tsx".to_string(),
                "rs".to_string(),
                "go".to_string(),
                "c".to_string(),
                "h".to_string(),
                "cpp".to_string(),
                "hpp".to_string(),
            ],
            skip_dirs: vec![
                ".git".to_string(),
                ".conda".to_string(),
                ".venv".to_string(),
                "venv".to_string(),
                "__pycache__".to_string(),
                "node_modules".to_string(),
                "target".to_string(),
            ],
        }
    }
}

impl Config {
    /// Get the default config file path (~/.toolbelt.toml)
    pub fn default_config_path() -> crate::Result<PathBuf> {
        let home_dir = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(PathBuf::from(home_dir).join(".toolbelt.toml"))
    }

    /// Load config from the default location, falling back to defaults if the file doesn't exist
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::default_config_path()?;

        let config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    /// Load config from a specific file path
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to a file
    pub fn to_file(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `TOOLBELT_OUTPUT_DIR` and `TOOLBELT_LOG_DIR` win over the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = env::var("TOOLBELT_OUTPUT_DIR") {
            if !dir.is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = env::var("TOOLBELT_LOG_DIR") {
            if !dir.is_empty() {
                self.log_dir = PathBuf::from(dir);
            }
        }
        self
    }

    /// Resolve a bare output file name against `output_dir`. Paths with a
    /// directory component are used as given.
    pub fn output_path(&self, name: &Path) -> PathBuf {
        match name.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => name.to_path_buf(),
            _ => self.output_dir.join(name),
        }
    }

    /// Create a config file with all available options documented
    pub fn create_documented_config() -> String {
        format!(r#"# toolbelt configuration file
# Every key is optional; missing keys fall back to the defaults shown here.

# Where generated files (listings, combined files, scraped pages, reports) go.
# Overridden by TOOLBELT_OUTPUT_DIR.
output_dir = "./output"

# Where each tool appends its <tool>.log file.
# Overridden by TOOLBELT_LOG_DIR.
log_dir = "./logs"

[http]
# Per-request timeout for scraping and registry lookups
timeout_seconds = 30

# User-Agent header sent with every request
user_agent = "toolbelt/{version}"

[registry]
# PyPI base URL; lookups go to <pypi_url>/pypi/<package>/json
pypi_url = "https://pypi.org"

# Anaconda API base URL; lookups go to <anaconda_url>/package/<channel>/<package>
anaconda_url = "https://api.anaconda.org"
conda_channel = "conda-forge"

[imports]
# Source file extensions scanned by `toolbelt imports`
file_extensions = ["py", "js", "jsx", "ts", "tsx", "rs", "go", "c", "h", "cpp", "hpp"]

# Directory names never descended into
skip_dirs = [".git", ".conda", ".venv", "venv", "__pycache__", "node_modules", "target"]

[walk]
# Include dot-files and dot-directories in `toolbelt dirtree` and `toolbelt combine`
include_hidden = false
"#, version = env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_config_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::create_documented_config()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.output_dir, defaults.output_dir);
        assert_eq!(parsed.log_dir, defaults.log_dir);
        assert_eq!(parsed.http.timeout_seconds, defaults.http.timeout_seconds);
        assert_eq!(parsed.http.user_agent, defaults.http.user_agent);
        assert_eq!(parsed.registry.pypi_url, defaults.registry.pypi_url);
        assert_eq!(parsed.imports.file_extensions, defaults.imports.file_extensions);
        assert_eq!(parsed.imports.skip_dirs, defaults.imports.skip_dirs);
        assert!(!parsed.walk.include_hidden);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let parsed: Config = toml::from_str("output_dir = \"out\"\n[http]\ntimeout_seconds = 5\n").unwrap();
        assert_eq!(parsed.output_dir, PathBuf::from("out"));
        assert_eq!(parsed.log_dir, PathBuf::from("./logs"));
        assert_eq!(parsed.http.timeout_seconds, 5);
        assert_eq!(parsed.registry.conda_channel, "conda-forge");
    }

    #[test]
    fn output_path_only_joins_bare_names() {
        let config = Config::default();
        assert_eq!(config.output_path(Path::new("a.txt")), PathBuf::from("./output/a.txt"));
        assert_eq!(config.output_path(Path::new("reports/a.txt")), PathBuf::from("reports/a.txt"));
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("toolbelt.toml");
        let mut config = Config::default();
        config.walk.include_hidden = true;
        config.to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert!(loaded.walk.include_hidden);
    }
}
