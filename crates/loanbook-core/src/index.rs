//! Secondary lookup indices
//!
//! Indices hold record identifiers only. The owning collection stays the
//! single place a record lives.

use std::collections::HashMap;

/// Maps a key (borrower or equipment ID) to the records referencing it
#[derive(Debug, Default, Clone)]
pub struct ReverseIndex {
    entries: HashMap<String, Vec<String>>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `record_id` under `key`, once
    pub fn insert(&mut self, key: &str, record_id: &str) {
        let ids = self.entries.entry(key.to_string()).or_default();
        if !ids.iter().any(|id| id == record_id) {
            ids.push(record_id.to_string());
        }
    }

    /// Record identifiers under `key`; empty when the key is unknown
    pub fn get(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_is_empty() {
        let index = ReverseIndex::new();
        assert!(index.get("EQ404").is_empty());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut index = ReverseIndex::new();
        index.insert("EQ001", "L001");
        index.insert("EQ001", "L002");
        index.insert("EQ001", "L001");
        assert_eq!(index.get("EQ001"), ["L001", "L002"]);
    }
}
