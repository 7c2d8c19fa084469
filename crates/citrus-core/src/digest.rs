//! Content addressing for build assets.

use std::fmt;

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest identifying an asset or page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(String);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compute the asset id of some bytes or text.
pub fn digest(content: impl AsRef<[u8]>) -> AssetId {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    AssetId(hex::encode(hasher.finalize()))
}
