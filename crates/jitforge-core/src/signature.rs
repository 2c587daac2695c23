//! Content-derived cache keys.

use std::fmt;

/// Fixed-length hex token identifying a fragment's semantic content.
///
/// Used as the cache directory name and to derive the generated type and
/// factory symbol names, so it only ever holds lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(String);

impl Signature {
    /// Hex length of a signature (SHA-256).
    pub const LEN: usize = 64;

    /// Hex-encodes a 256-bit digest.
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// Wraps an already computed hex digest.
    ///
    /// Returns `None` unless `hex` is exactly [`Signature::LEN`] lowercase
    /// hex digits.
    pub fn from_hex(hex: impl Into<String>) -> Option<Self> {
        let hex = hex.into();
        let valid = hex.len() == Self::LEN
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then_some(Self(hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the generated native type.
    pub fn type_name(&self) -> String {
        format!("jit_{}", self.0)
    }

    /// Name of the exported factory function.
    pub fn factory_symbol(&self) -> String {
        format!("create_{}", self.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Signature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
