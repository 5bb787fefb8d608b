//! Session response cache keyed by content fingerprint.

use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};

/// SHA-256 over a length-prefixed encoding of a task discriminator and its inputs.
///
/// Every field is written as an 8-byte big-endian length followed by its bytes,
/// so `("ab", "c")` and `("a", "bc")` never hash the same input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(task: &str, fields: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for field in std::iter::once(&task).chain(fields.iter()) {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unbounded for the life of the session; dropped with it.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<Fingerprint, String>,
}

impl ResponseCache {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&str> {
        self.entries.get(fingerprint).map(String::as_str)
    }

    pub fn store(&mut self, fingerprint: Fingerprint, response: String) {
        self.entries.insert(fingerprint, response);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
