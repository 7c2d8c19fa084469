//! Static site builds for citrus.
//!
//! An [`Application`] holds registered pages and raw files. Building it renders every
//! page, materializes the live components and stylesheets the pages registered, bundles
//! them in a single pass and writes one HTML document per page.

pub mod assets;
pub mod builder;
pub mod document;

pub use builder::{Application, BuildError, BuildReport};
