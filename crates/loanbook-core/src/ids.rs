//! Identifier helpers shared by the registry and the ledger

use std::collections::HashSet;

use crate::storage::codec::{FIELD_DELIMITER, LIST_DELIMITER};

/// Prefix for generated equipment identifiers (`EQ001`)
pub const EQUIPMENT_PREFIX: &str = "EQ";
/// Prefix for generated lending record identifiers (`L001`)
pub const LENDING_PREFIX: &str = "L";
/// Minimum digits in a generated identifier
pub const ID_WIDTH: usize = 3;

/// Next identifier after the highest numbered one carrying `prefix`
///
/// Identifiers that do not follow `<prefix><digits>` are ignored.
pub fn next_sequential_id<'a, I>(prefix: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix))
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|digits| digits.parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    format!("{}{:0width$}", prefix, max + 1, width = ID_WIDTH)
}

/// Drop repeated identifiers, keeping the first occurrence
pub fn dedupe_preserving_order<I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Whether `text` would break the line format if stored as a field
pub fn contains_reserved(text: &str) -> bool {
    text.contains(FIELD_DELIMITER)
        || text.contains(LIST_DELIMITER)
        || text.contains('\n')
        || text.contains('\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id_from_empty() {
        assert_eq!(next_sequential_id(EQUIPMENT_PREFIX, []), "EQ001");
        assert_eq!(next_sequential_id(LENDING_PREFIX, []), "L001");
    }

    #[test]
    fn test_next_id_skips_foreign_ids() {
        let existing = ["EQ001", "EQ017", "CAM-9", "EQ", "EQ0x2"];
        assert_eq!(
            next_sequential_id(EQUIPMENT_PREFIX, existing.iter().copied()),
            "EQ018"
        );
    }

    #[test]
    fn test_next_id_grows_past_width() {
        assert_eq!(next_sequential_id(LENDING_PREFIX, ["L999"]), "L1000");
    }

    #[test]
    fn test_dedupe_preserving_order() {
        let ids = ["EQ002", "EQ001", "EQ002", "EQ003", "EQ001"]
            .iter()
            .map(|s| s.to_string());
        assert_eq!(dedupe_preserving_order(ids), vec!["EQ002", "EQ001", "EQ003"]);
    }

    #[test]
    fn test_contains_reserved() {
        assert!(contains_reserved("Lab, work"));
        assert!(contains_reserved("a;b"));
        assert!(contains_reserved("two\nlines"));
        assert!(!contains_reserved("Lab work - week 3"));
    }
}
