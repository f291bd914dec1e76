//! Record identity and ID generation.
//!
//! Generators are injected into the indexer rather than reached through a
//! global, so tests can supply deterministic identities.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique key of an indexed record.
///
/// An empty id means "not assigned yet"; the indexer fills it in on save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<Ulid> for RecordId {
    fn from(value: Ulid) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of fresh record identities.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> RecordId;
}

/// Generates time-ordered ULID identities.
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidGenerator;

impl IdGenerator for UlidGenerator {
    fn generate(&self) -> RecordId {
        RecordId::from(Ulid::new())
    }
}

const SHORT_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Default length of a short id.
pub const DEFAULT_SHORT_ID_LEN: usize = 8;

/// Generates short random lower-case alphanumeric identities.
#[derive(Debug, Clone, Copy)]
pub struct ShortIdGenerator {
    len: usize,
}

impl ShortIdGenerator {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl Default for ShortIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SHORT_ID_LEN)
    }
}

impl IdGenerator for ShortIdGenerator {
    fn generate(&self) -> RecordId {
        let mut rng = rand::rng();
        let id: String = (0..self.len)
            .map(|_| SHORT_ID_ALPHABET[rng.random_range(0..SHORT_ID_ALPHABET.len())] as char)
            .collect();
        RecordId(id)
    }
}
