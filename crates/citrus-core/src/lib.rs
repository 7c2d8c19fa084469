//! Core types for citrus static builds.
//!
//! Provides the value-equal [`Path`] model, content addressing, and the three ports a
//! build consumes: [`FileSystem`], [`Renderer`] and [`Bundler`].

pub mod bundle;
pub mod digest;
pub mod fs;
pub mod path;
pub mod render;

pub use bundle::{BundleError, Bundler, Bundles, Entrypoints};
pub use digest::{digest, AssetId};
pub use fs::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use path::Path;
pub use render::{Location, PageContext, Registrations, RenderError, Rendered, Renderer};
