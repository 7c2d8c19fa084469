//! Preview server command.

use std::path::PathBuf;

use anyhow::Result;
use citrus_server::{PreviewConfig, PreviewServer};

use crate::config::ConfigFile;

/// Run the serve command.
pub async fn run(config: ConfigFile, port: u16, dir: Option<PathBuf>, open: bool) -> Result<()> {
    let root = dir.unwrap_or(config.site.output);
    if !root.exists() {
        anyhow::bail!(
            "Directory not found: {}. Run 'citrus build' first.",
            root.display()
        );
    }

    let server = PreviewServer::new(PreviewConfig {
        root,
        port,
        open,
        ..Default::default()
    });

    server.start().await?;

    Ok(())
}
