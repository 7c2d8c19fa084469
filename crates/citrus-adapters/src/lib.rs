//! Collaborators for citrus builds.
//!
//! [`MarkdownRenderer`] renders markdown pages and turns their directive code blocks into
//! registrations. [`EsbuildBundler`] bundles each page's assets with the esbuild CLI.

pub mod esbuild;
pub mod markdown;

pub use esbuild::{EsbuildBundler, EsbuildConfig};
pub use markdown::MarkdownRenderer;
