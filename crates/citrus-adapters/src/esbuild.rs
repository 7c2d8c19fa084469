//! Bundler backed by the esbuild CLI.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;

use citrus_core::{AssetId, BundleError, Bundler, Bundles, Entrypoints, Path};

/// Configuration for [`EsbuildBundler`].
#[derive(Debug, Clone)]
pub struct EsbuildConfig {
    /// esbuild executable
    pub command: PathBuf,

    /// Minify output (production mode)
    pub minify: bool,

    /// Extra arguments passed through to esbuild
    pub extra_args: Vec<String>,
}

impl Default for EsbuildConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("esbuild"),
            minify: true,
            extra_args: vec![],
        }
    }
}

/// Bundles every page's assets in one esbuild run.
///
/// Each page gets a generated entry module under `.cache/` that imports its assets.
/// Bundled files land directly in the output directory with content-hashed names.
#[derive(Debug, Clone, Default)]
pub struct EsbuildBundler {
    config: EsbuildConfig,
}

impl EsbuildBundler {
    pub fn new(config: EsbuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EsbuildConfig {
        &self.config
    }
}

#[async_trait]
impl Bundler for EsbuildBundler {
    async fn output_bundles(
        &self,
        entrypoints: &Entrypoints,
        output_dir: &Path,
    ) -> Result<Bundles, BundleError> {
        let pages: Vec<(&AssetId, &Vec<Path>)> = entrypoints
            .iter()
            .filter(|(_, modules)| !modules.is_empty())
            .collect();

        if pages.is_empty() {
            return Ok(Bundles::new());
        }

        let out = output_dir
            .to_absolute_native()
            .map_err(|e| BundleError::single(format!("Failed to resolve {}: {}", output_dir, e)))?;
        let cache = out.join(".cache");
        tokio::fs::create_dir_all(&cache)
            .await
            .map_err(|e| BundleError::single(format!("Failed to create {}: {}", cache.display(), e)))?;

        // Entry module path (relative to the output dir) -> page id
        let mut entries: HashMap<String, AssetId> = HashMap::new();
        for (page_id, modules) in &pages {
            let entry = format!(".cache/{}.entry.js", page_id);
            let source = entry_module(modules)?;
            tokio::fs::write(out.join(&entry), source)
                .await
                .map_err(|e| BundleError::single(format!("Failed to write {}: {}", entry, e)))?;
            entries.insert(entry, (*page_id).clone());
        }

        let mut entry_files: Vec<&String> = entries.keys().collect();
        entry_files.sort();

        let mut command = Command::new(&self.config.command);
        command
            .current_dir(&out)
            .args(entry_files)
            .arg("--bundle")
            .arg("--format=iife")
            .arg("--outdir=.")
            .arg("--entry-names=[name]-[hash]")
            .arg("--metafile=.cache/meta.json")
            .arg("--log-level=error");
        if self.config.minify {
            command.arg("--minify");
        }
        command.args(&self.config.extra_args);

        tracing::info!("Bundling {} pages with {}", pages.len(), self.config.command.display());

        let output = command.output().await.map_err(|e| {
            BundleError::single(format!(
                "Failed to run {}: {}",
                self.config.command.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut errors = parse_diagnostics(&stderr);
            if errors.is_empty() {
                errors.push(format!("esbuild exited with {}", output.status));
            }
            return Err(BundleError::new(errors));
        }

        let metafile = tokio::fs::read_to_string(cache.join("meta.json"))
            .await
            .map_err(|e| BundleError::single(format!("Failed to read esbuild metafile: {}", e)))?;

        bundles_from_metafile(&metafile, &entries)
    }
}

/// Source of an entry module importing every asset by absolute path.
fn entry_module(modules: &[Path]) -> Result<String, BundleError> {
    let mut source = String::new();
    for module in modules {
        let absolute = module
            .to_absolute_native()
            .map_err(|e| BundleError::single(format!("Failed to resolve {}: {}", module, e)))?;
        let specifier = serde_json::to_string(&absolute.to_string_lossy())
            .map_err(|e| BundleError::single(e.to_string()))?;
        source.push_str(&format!("import {};\n", specifier));
    }
    Ok(source)
}

static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:\S+\s+)?\[ERROR\]\s*(.+?)\s*$").expect("valid diagnostic pattern")
});

/// Split esbuild stderr into one message per `[ERROR]` diagnostic.
///
/// Falls back to the whole trimmed stderr when no diagnostic line is found.
fn parse_diagnostics(stderr: &str) -> Vec<String> {
    let errors: Vec<String> = ERROR_LINE
        .captures_iter(stderr)
        .map(|c| c[1].to_string())
        .collect();

    if !errors.is_empty() {
        return errors;
    }

    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        vec![]
    } else {
        vec![trimmed.to_string()]
    }
}

#[derive(Debug, Deserialize)]
struct Metafile {
    #[serde(default)]
    outputs: BTreeMap<String, MetaOutput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaOutput {
    entry_point: Option<String>,
    css_bundle: Option<String>,
}

/// Map esbuild outputs back to page ids.
fn bundles_from_metafile(
    metafile: &str,
    entries: &HashMap<String, AssetId>,
) -> Result<Bundles, BundleError> {
    let metafile: Metafile = serde_json::from_str(metafile)
        .map_err(|e| BundleError::single(format!("Invalid esbuild metafile: {}", e)))?;

    let mut bundles = Bundles::new();
    for (file, output) in metafile.outputs {
        let Some(page_id) = output.entry_point.as_ref().and_then(|e| entries.get(e)) else {
            continue;
        };

        let assets = bundles.entry(page_id.clone()).or_default();
        assets.push(Path::from_url(&file).rooted());
        if let Some(css) = output.css_bundle {
            assets.push(Path::from_url(&css).rooted());
        }
    }

    Ok(bundles)
}
