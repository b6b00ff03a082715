//! Content hashing for fingerprinting build inputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit content hash computed using XXH3.
///
/// Used to fingerprint a layer's input list so that editing the list itself
/// (not just the files it names) invalidates the layer's recorded outputs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Hashes an ordered sequence of strings.
    ///
    /// Each item is terminated with a NUL byte so `["ab", "c"]` and
    /// `["a", "bc"]` hash differently. Order matters.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buf = Vec::new();
        for line in lines {
            buf.extend_from_slice(line.as_ref().as_bytes());
            buf.push(0);
        }
        Self::from_bytes(&buf)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentHash::from_bytes(b"hello world");
        let b = ContentHash::from_bytes(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn line_boundaries_matter() {
        let a = ContentHash::from_lines(["ab", "c"]);
        let b = ContentHash::from_lines(["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn line_order_matters() {
        let a = ContentHash::from_lines(["lists.scm", "strings.scm"]);
        let b = ContentHash::from_lines(["strings.scm", "lists.scm"]);
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_hex() {
        let s = ContentHash::from_bytes(b"test").to_string();
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn serde_roundtrip() {
        let h = ContentHash::from_lines(["a", "b"]);
        let json = serde_json::to_string(&h).unwrap();
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}
