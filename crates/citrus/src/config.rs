//! citrus.toml configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Configuration file structure (citrus.toml).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub bundler: BundlerConfig,
}

#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    /// Markdown page sources
    #[serde(default = "default_pages")]
    pub pages: PathBuf,

    /// Build output
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Raw files copied verbatim
    #[serde(default = "default_public")]
    pub public: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            pages: default_pages(),
            output: default_output(),
            public: default_public(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BundlerConfig {
    #[serde(default = "default_command")]
    pub command: PathBuf,
    #[serde(default = "default_minify")]
    pub minify: bool,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            minify: default_minify(),
        }
    }
}

fn default_pages() -> PathBuf {
    PathBuf::from("pages")
}
fn default_output() -> PathBuf {
    PathBuf::from("dist")
}
fn default_public() -> PathBuf {
    PathBuf::from("public")
}
fn default_command() -> PathBuf {
    PathBuf::from("esbuild")
}
fn default_minify() -> bool {
    true
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = parse(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

fn parse(content: &str) -> Result<ConfigFile, toml::de::Error> {
    toml::from_str(content)
}
