//! Catalog document identifiers.
//!
//! A [`DocId`] is a 12-byte identifier rendered as 24 lowercase hex
//! characters: a 4-byte unix-seconds prefix followed by 8 random bytes,
//! so freshly generated ids sort roughly by creation time. Incoming
//! identifiers are opaque strings validated by attempting a parse.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// The string was not a valid 24-character hex identifier.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("not a valid 24-character hex identifier")]
pub struct InvalidDocId;

/// Opaque unique identifier for authors and books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId([u8; 12]);

impl DocId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        let secs = chrono::Utc::now().timestamp().max(0) as u32;
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::thread_rng().fill(&mut bytes[4..]);
        DocId(bytes)
    }
}

impl FromStr for DocId {
    type Err = InvalidDocId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 24 {
            return Err(InvalidDocId);
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| InvalidDocId)?;
        Ok(DocId(bytes))
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for DocId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DocId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_renders_24_hex_chars() {
        let id = DocId::generate();
        let s = id.to_string();
        assert_eq!(s.len(), 24);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(DocId::generate(), DocId::generate());
    }

    #[test]
    fn test_parse_roundtrip() {
        let id = DocId::generate();
        let parsed: DocId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_accepts_uppercase_hex() {
        let id: Result<DocId, _> = "65A1B2C3D4E5F60718293A4B".parse();
        assert!(id.is_ok());
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!("abc123".parse::<DocId>(), Err(InvalidDocId));
        assert_eq!("".parse::<DocId>(), Err(InvalidDocId));
        assert_eq!(
            "65a1b2c3d4e5f60718293a4b00".parse::<DocId>(),
            Err(InvalidDocId)
        );
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        assert_eq!("zzzzzzzzzzzzzzzzzzzzzzzz".parse::<DocId>(), Err(InvalidDocId));
        assert_eq!("65a1b2c3d4e5f60718293a4-".parse::<DocId>(), Err(InvalidDocId));
    }

    #[test]
    fn test_serde_as_string() {
        let id = DocId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: DocId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
