//! Static site build command.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use citrus_adapters::{EsbuildBundler, EsbuildConfig, MarkdownRenderer};
use citrus_build::Application;
use citrus_markdown::{parse_page, ParsedPage};

use crate::config::ConfigFile;

/// Run the build command.
pub async fn run(config: ConfigFile, output: Option<PathBuf>, minify: Option<bool>) -> Result<()> {
    tracing::info!("Building static site...");

    let pages_dir = &config.site.pages;
    if !pages_dir.exists() {
        anyhow::bail!("Pages directory not found: {}", pages_dir.display());
    }

    let bundler = EsbuildBundler::new(EsbuildConfig {
        command: config.bundler.command.clone(),
        minify: minify.unwrap_or(config.bundler.minify),
        ..Default::default()
    });

    let mut app = Application::new(MarkdownRenderer::new()).with_bundler(Arc::new(bundler));

    for (url, page) in discover_pages(pages_dir)? {
        tracing::debug!("Found page {}", url);
        app.page(&url, page);
    }

    for (url, body) in public_files(&config.site.public)? {
        app.file(&url, body);
    }

    let output_dir = output.unwrap_or_else(|| config.site.output.clone());
    let report = app.build(&output_dir).await?;

    tracing::info!(
        "Built {} pages with {} components and {} styles in {}ms",
        report.pages,
        report.components,
        report.styles,
        report.duration_ms
    );

    tracing::info!("Output: {}", report.output_dir.display());

    Ok(())
}

/// Every markdown page under `dir` with its URL, in path order.
fn discover_pages(dir: &Path) -> Result<Vec<(String, ParsedPage)>> {
    let mut pages = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_page_source(path) {
            continue;
        }

        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let page =
            parse_page(&source).with_context(|| format!("Failed to parse {}", path.display()))?;

        let url = match page.frontmatter().slug {
            Some(slug) => slug,
            None => page_url(path.strip_prefix(dir)?),
        };
        pages.push((url, page));
    }

    Ok(pages)
}

fn is_page_source(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("mdx")
    )
}

/// URL of a page source relative to the pages directory.
///
/// `index` files map to their directory.
fn page_url(relative: &Path) -> String {
    let mut segments = url_segments(&relative.with_extension(""));
    if segments.last().map(String::as_str) == Some("index") {
        segments.pop();
    }
    format!("/{}", segments.join("/"))
}

fn url_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Every file under `dir` with its URL. A missing directory has no files.
fn public_files(dir: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    if !dir.exists() {
        tracing::warn!("Public directory not found: {}", dir.display());
        return Ok(vec![]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let body = fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        let url = format!("/{}", url_segments(entry.path().strip_prefix(dir)?).join("/"));
        files.push((url, body));
    }

    Ok(files)
}
