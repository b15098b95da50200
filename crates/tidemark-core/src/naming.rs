//! Deterministic names for indexes and foreign key constraints.
//!
//! The same inputs always produce the same name, so a downgrade can drop
//! exactly the object its upgrade created.

use sha2::{Digest, Sha256};

fn truncated(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

fn short_hash(parts: &[&str], length: usize) -> String {
    let mut encoded = hex::encode(Sha256::digest(parts.join(";").as_bytes()));
    encoded.truncate(length);
    encoded
}

/// Returns the name of an index over `columns` of `table`.
#[must_use]
pub fn index_name(table: &str, columns: &[String], unique: bool) -> String {
    let prefix = if unique { "uid" } else { "idx" };
    let first = columns.first().map_or("", String::as_str);
    let mut parts = vec![table];
    parts.extend(columns.iter().map(String::as_str));
    format!(
        "{prefix}_{}_{}_{}",
        truncated(table, 11),
        truncated(first, 7),
        short_hash(&parts, 6)
    )
}

/// Returns the name of the foreign key constraint `table.column -> target.target_column`.
#[must_use]
pub fn foreign_key_name(table: &str, column: &str, target: &str, target_column: &str) -> String {
    format!(
        "fk_{}_{}_{}",
        truncated(table, 8),
        truncated(target, 8),
        short_hash(&[table, column, target, target_column], 8)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_name_shape() {
        let name = index_name("user", &["username".to_string()], true);
        assert!(name.starts_with("uid_user_usernam_"));
        assert_eq!(name.len(), "uid_user_usernam_".len() + 6);
    }

    #[test]
    fn test_index_name_is_deterministic() {
        let cols = vec!["slug".to_string(), "name".to_string()];
        assert_eq!(
            index_name("category", &cols, false),
            index_name("category", &cols, false)
        );
        assert_ne!(
            index_name("category", &cols, false),
            index_name("category", &["slug".to_string()], false)
        );
    }

    #[test]
    fn test_index_name_truncates_long_table() {
        let name = index_name("configuration_items", &["key".to_string()], false);
        assert!(name.starts_with("idx_configurati_key_"));
    }

    #[test]
    fn test_short_hash_is_lowercase_hex_prefix() {
        let hash = short_hash(&["user", "id"], 8);
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(hex::encode(Sha256::digest(b"user;id")).starts_with(&hash));
    }

    #[test]
    fn test_foreign_key_name() {
        let name = foreign_key_name("category", "user_id", "user", "id");
        assert!(name.starts_with("fk_category_user_"));
        assert_eq!(name.len(), "fk_category_user_".len() + 8);
    }
}
