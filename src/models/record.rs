//! Record identifiers, envelopes, and creation timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque identifier minted by the store's key generation.
///
/// Unique within its collection and immutable once assigned. The
/// repository never invents or reuses ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a new record ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A record as seen by callers: id, creation time, and domain fields.
///
/// Serializes flat, the same shape the legacy local store used.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    /// Store-generated identifier.
    pub id: RecordId,
    /// Creation time as an ISO-8601 string (`2024-05-01T10:00:00.000Z`).
    pub created_at: String,
    /// Domain fields.
    #[serde(flatten)]
    pub fields: T,
}

impl<T> Record<T> {
    /// Parses `created_at` back into a UTC timestamp.
    #[must_use]
    pub fn created_at_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp_str(&self.created_at)
    }
}

/// Domain payload stored in a collection subtree.
///
/// The store enforces no schema, so every entry read back is deserialized
/// and then checked with [`CollectionEntry::validate`] before it reaches a
/// caller.
pub trait CollectionEntry: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name used in logs and errors.
    const KIND: &'static str;

    /// Partial update payload. Fields serialized as absent are left untouched.
    type Patch: Serialize + Send + Sync;

    /// Checks domain-level constraints the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the entry is unusable.
    fn validate(&self) -> std::result::Result<(), String>;

    /// Built-in records written the first time the subtree is found absent.
    #[must_use]
    fn seed() -> Vec<Self> {
        Vec::new()
    }
}

/// Formats a timestamp the way callers observe `createdAt`.
#[must_use]
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Converts epoch milliseconds into a UTC timestamp.
#[must_use]
pub fn timestamp_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Normalizes a stored `createdAt` value.
///
/// The store reports server-assigned times as epoch milliseconds, while
/// records written by older clients carry ISO-8601 strings. Both come back
/// as the same canonical string plus the parsed instant used for ordering.
/// Returns `None` for anything that is not a recognizable timestamp.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn normalize_created_at(value: &Value) -> Option<(String, DateTime<Utc>)> {
    let time = match value {
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
            timestamp_from_millis(millis)?
        },
        Value::String(s) => parse_timestamp_str(s)?,
        _ => return None,
    };
    Some((format_timestamp(time), time))
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
