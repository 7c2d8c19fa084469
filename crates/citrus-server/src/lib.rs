//! Preview server for built citrus sites.
//!
//! Serves an output directory over HTTP so a build can be checked in a browser.

pub mod server;

pub use server::{PreviewConfig, PreviewServer, ServerError};
