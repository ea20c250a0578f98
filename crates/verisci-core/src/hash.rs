//! Content digests for prompts, outputs, programs and audit trails.
//!
//! A digest is blake3-256 over the raw UTF-8 bytes of the text. Nothing else
//! (timestamps, ids, salts) is folded in, so recomputing from stored text must
//! always reproduce the stored digest.

use blake3::Hasher;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }

    /// Parse a 64-char lowercase or uppercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        if s.len() != 64 {
            return Err(Error::Hash(format!(
                "expected 64 hex chars, got {}",
                s.len()
            )));
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(Error::Hash(format!("non-hex character {c:?}")));
        }
        let mut out = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|e| Error::Hash(e.to_string()))?;
            out[i] = u8::from_str_radix(pair, 16)
                .map_err(|e| Error::Hash(format!("bad hex '{pair}': {e}")))?;
        }
        Ok(Hash256(out))
    }

    /// First 16 hex chars, for status lines.
    pub fn short(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(16);
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// Exported audit trails carry digests as hex so they can be checked with
// standard tooling.
impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash256::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    let out = h.finalize();
    Hash256(out.into())
}

pub fn hash_str(s: &str) -> Hash256 {
    hash_bytes(s.as_bytes())
}

/// Fold an ordered sequence of digests into one root digest.
///
/// Order-sensitive: swapping two leaves changes the root.
pub fn chain_hashes<'a, I>(leaves: I) -> Hash256
where
    I: IntoIterator<Item = &'a Hash256>,
{
    let mut h = Hasher::new();
    for leaf in leaves {
        h.update(&leaf.0);
    }
    Hash256(h.finalize().into())
}
