//! Migration version identifiers.
//!
//! A version is `{sequence}_{YYYYmmddHHMMSS}_{label}`. The sequence is the
//! only ordering key; timestamp and label are informational.

use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, Timelike};

use crate::error::{MigrateError, Result};

/// Maximum length of a version identifier.
pub const MAX_VERSION_LENGTH: usize = 255;

/// Label of the first version of every application.
pub const INIT_LABEL: &str = "init";

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Identifier of one generated migration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionId {
    /// Position in the application's migration sequence, starting at 0.
    pub sequence: u32,
    /// Generation time, second precision.
    pub timestamp: NaiveDateTime,
    /// Human label.
    pub label: String,
}

impl VersionId {
    /// Creates a version identifier, validating the label and total length.
    pub fn new(sequence: u32, timestamp: NaiveDateTime, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        validate_label(&label)?;

        let version = Self {
            sequence,
            timestamp,
            label,
        };
        let length = version.to_string().len();
        if length > MAX_VERSION_LENGTH {
            return Err(MigrateError::VersionLengthExceeded {
                version: version.to_string(),
                length,
                max: MAX_VERSION_LENGTH,
            });
        }
        Ok(version)
    }

    /// Returns the artifact file name for this version.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{self}.json")
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.sequence,
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.label
        )
    }
}

impl FromStr for VersionId {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || MigrateError::InvalidVersion(s.to_string());
        let mut parts = s.splitn(3, '_');
        let (Some(sequence), Some(timestamp), Some(label)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let sequence = sequence.parse::<u32>().map_err(|_| invalid())?;
        let timestamp =
            NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(|_| invalid())?;
        Self::new(sequence, timestamp, label).map_err(|_| invalid())
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then_with(|| self.timestamp.cmp(&other.timestamp))
            .then_with(|| self.label.cmp(&other.label))
    }
}

fn validate_label(label: &str) -> Result<()> {
    let valid = !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(MigrateError::InvalidLabel(label.to_string()))
    }
}

/// Computes the version following `last`, stamped with `now`.
///
/// Without a previous version the sequence starts at 0 and the label is
/// forced to [`INIT_LABEL`].
pub fn next_version_at(
    last: Option<&VersionId>,
    label: &str,
    now: NaiveDateTime,
) -> Result<VersionId> {
    let timestamp = now.with_nanosecond(0).unwrap_or(now);
    match last {
        None => VersionId::new(0, timestamp, INIT_LABEL),
        Some(previous) => {
            let sequence = previous
                .sequence
                .checked_add(1)
                .ok_or_else(|| MigrateError::InvalidVersion(previous.to_string()))?;
            VersionId::new(sequence, timestamp, label)
        }
    }
}

/// Computes the version following `last`, stamped with the local time.
pub fn next_version(last: Option<&VersionId>, label: &str) -> Result<VersionId> {
    next_version_at(last, label, Local::now().naive_local())
}

/// Supplies the last persisted version of an application.
pub trait VersionSource {
    /// Returns the most recent version of `app`, if any.
    fn last_version(&self, app: &str) -> impl Future<Output = Result<Option<VersionId>>> + Send;
}
