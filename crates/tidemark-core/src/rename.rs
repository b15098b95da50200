//! Rename detection and resolution.
//!
//! A field that disappears and a field that appears with an otherwise
//! identical descriptor may be a rename. Detection is pure: the differ lists
//! [`RenameCandidate`]s, a [`RenameOracle`] decides, and the resulting
//! [`RenameDecisions`] are fed back into the diff.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, warn};

use crate::error::{GenerateError, OracleError, Result};

/// A removed field and an added field that could be the same column renamed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenameCandidate {
    /// Table owning both fields.
    pub table: String,
    /// Field name in the baseline model.
    pub old: String,
    /// Field name in the current model.
    pub new: String,
}

impl RenameCandidate {
    /// Creates a rename candidate.
    #[must_use]
    pub fn new(table: impl Into<String>, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            old: old.into(),
            new: new.into(),
        }
    }
}

impl fmt::Display for RenameCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}.{}", self.table, self.old, self.table, self.new)
    }
}

/// Decides whether a candidate is an intentional rename.
pub trait RenameOracle {
    /// Returns `true` to treat the candidate as a rename.
    fn confirm_rename(&mut self, candidate: &RenameCandidate) -> std::result::Result<bool, OracleError>;
}

impl<F> RenameOracle for F
where
    F: FnMut(&RenameCandidate) -> bool,
{
    fn confirm_rename(&mut self, candidate: &RenameCandidate) -> std::result::Result<bool, OracleError> {
        Ok(self(candidate))
    }
}

/// An oracle that gives the same answer to every candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAnswer(pub bool);

impl RenameOracle for FixedAnswer {
    fn confirm_rename(&mut self, _candidate: &RenameCandidate) -> std::result::Result<bool, OracleError> {
        Ok(self.0)
    }
}

/// Confirmed renames, keyed by table and old field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameDecisions {
    confirmed: HashMap<(String, String), String>,
}

impl RenameDecisions {
    /// Creates an empty decision set (no renames).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a confirmed rename.
    pub fn confirm(&mut self, candidate: &RenameCandidate) {
        self.confirmed.insert(
            (candidate.table.clone(), candidate.old.clone()),
            candidate.new.clone(),
        );
    }

    /// Returns the new field name for a renamed old field.
    #[must_use]
    pub fn renamed_to(&self, table: &str, old: &str) -> Option<&str> {
        self.confirmed
            .get(&(table.to_string(), old.to_string()))
            .map(String::as_str)
    }

    /// Number of confirmed renames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.confirmed.len()
    }

    /// Whether no rename was confirmed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }
}

/// Asks the oracle about each candidate, in discovery order.
///
/// A field already claimed by a confirmed rename is not offered again, so
/// the first confirmed match wins. An oracle error aborts resolution.
pub fn resolve_renames(
    candidates: &[RenameCandidate],
    oracle: &mut dyn RenameOracle,
) -> Result<RenameDecisions> {
    let mut decisions = RenameDecisions::new();
    let mut claimed_old: HashSet<(&str, &str)> = HashSet::new();
    let mut claimed_new: HashSet<(&str, &str)> = HashSet::new();

    for candidate in candidates {
        let old_key = (candidate.table.as_str(), candidate.old.as_str());
        let new_key = (candidate.table.as_str(), candidate.new.as_str());
        if claimed_old.contains(&old_key) || claimed_new.contains(&new_key) {
            continue;
        }

        let confirmed =
            oracle
                .confirm_rename(candidate)
                .map_err(|source| GenerateError::Oracle {
                    table: candidate.table.clone(),
                    old: candidate.old.clone(),
                    new: candidate.new.clone(),
                    source,
                })?;

        if confirmed {
            debug!(%candidate, "Rename confirmed");
            decisions.confirm(candidate);
            claimed_old.insert(old_key);
            claimed_new.insert(new_key);
        } else {
            warn!(%candidate, "Rename rejected, treating as drop and add");
        }
    }

    Ok(decisions)
}

/// Upgrade-pass renames, replayed by the downgrade pass.
///
/// Maps `(table, new column)` to the old column. Lives only as long as the
/// [`DiffContext`](crate::differ::DiffContext) that owns it.
#[derive(Debug, Clone, Default)]
pub struct RenameCorrelationMap {
    entries: HashMap<(String, String), String>,
}

impl RenameCorrelationMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `new_column` of `table` was `old_column` before.
    pub fn record(&mut self, table: &str, new_column: &str, old_column: &str) {
        self.entries.insert(
            (table.to_string(), new_column.to_string()),
            old_column.to_string(),
        );
    }

    /// Removes and returns the old column recorded for `new_column`.
    pub fn take(&mut self, table: &str, new_column: &str) -> Option<String> {
        self.entries
            .remove(&(table.to_string(), new_column.to_string()))
    }

    /// Whether no correlation is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("input closed")
        }
    }

    impl std::error::Error for Broken {}

    struct FailingOracle;

    impl RenameOracle for FailingOracle {
        fn confirm_rename(
            &mut self,
            _candidate: &RenameCandidate,
        ) -> std::result::Result<bool, OracleError> {
            Err(Box::new(Broken))
        }
    }

    #[test]
    fn test_first_confirmed_match_wins() {
        let candidates = vec![
            RenameCandidate::new("user", "nick", "nickname"),
            RenameCandidate::new("user", "nick", "handle"),
            RenameCandidate::new("user", "alias", "nickname"),
        ];
        let mut asked = Vec::new();
        let mut oracle = |c: &RenameCandidate| {
            asked.push(c.clone());
            true
        };

        let decisions = resolve_renames(&candidates, &mut oracle).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions.renamed_to("user", "nick"), Some("nickname"));
        assert_eq!(decisions.renamed_to("user", "alias"), None);
        assert_eq!(asked.len(), 1);
    }

    #[test]
    fn test_rejected_candidate_frees_fields() {
        let candidates = vec![
            RenameCandidate::new("user", "nick", "nickname"),
            RenameCandidate::new("user", "nick", "handle"),
        ];
        let mut oracle = |c: &RenameCandidate| c.new == "handle";

        let decisions = resolve_renames(&candidates, &mut oracle).unwrap();
        assert_eq!(decisions.renamed_to("user", "nick"), Some("handle"));
    }

    #[test]
    fn test_fixed_answer() {
        let candidates = vec![RenameCandidate::new("user", "nick", "nickname")];
        assert!(resolve_renames(&candidates, &mut FixedAnswer(false))
            .unwrap()
            .is_empty());
        assert_eq!(
            resolve_renames(&candidates, &mut FixedAnswer(true))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_oracle_error_aborts() {
        let candidates = vec![RenameCandidate::new("user", "nick", "nickname")];
        let err = resolve_renames(&candidates, &mut FailingOracle).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Rename confirmation for user.nick -> user.nickname failed: input closed"
        );
    }

    #[test]
    fn test_correlation_map_take_once() {
        let mut map = RenameCorrelationMap::new();
        map.record("user", "nickname", "nick");
        assert_eq!(map.take("user", "nickname").as_deref(), Some("nick"));
        assert_eq!(map.take("user", "nickname"), None);
        assert!(map.is_empty());
    }
}
