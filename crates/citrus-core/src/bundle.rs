//! Bundler port.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use crate::digest::AssetId;
use crate::path::Path;

/// Page id to the asset modules submitted for that page, in registration order.
pub type Entrypoints = BTreeMap<AssetId, Vec<Path>>;

/// Page id to the bundled files the page must include.
pub type Bundles = HashMap<AssetId, Vec<Path>>;

/// One or more bundler failures, all kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Bundling failed with {} error(s): {}", .errors.len(), .errors.join("; "))]
pub struct BundleError {
    /// Every underlying message, in the order the bundler reported them
    pub errors: Vec<String>,
}

impl BundleError {
    pub fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }

    /// A failure with a single message.
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}

/// Bundles per-page entrypoints into output files.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Bundle every entrypoint into `output_dir` in a single invocation.
    ///
    /// An empty `entrypoints` map yields an empty result without running the
    /// underlying toolchain. Returned paths are hrefs for files under `output_dir`.
    async fn output_bundles(
        &self,
        entrypoints: &Entrypoints,
        output_dir: &Path,
    ) -> Result<Bundles, BundleError>;
}
