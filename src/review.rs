//! Review records and normalization of heterogeneous review exports.
//!
//! Review sources disagree on field names (`at` vs `date` vs
//! `reviewCreatedTime`, `content` vs `text`, ...). Every record is resolved
//! once, at the ingestion boundary, into a normalized [`Review`] through a
//! ranked list of accepted aliases per field.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};

/// Accepted keys for the review body, highest rank first.
pub const TEXT_FIELD_ALIASES: [&str; 4] = ["content", "text", "review", "body"];

/// Accepted keys for the review timestamp, highest rank first.
pub const TIMESTAMP_FIELD_ALIASES: [&str; 4] = ["at", "date", "reviewCreatedTime", "timestamp"];

const ID_FIELD_ALIASES: [&str; 2] = ["reviewId", "id"];
const AUTHOR_FIELD_ALIASES: [&str; 2] = ["userName", "author"];
const RATING_FIELD_ALIASES: [&str; 2] = ["score", "rating"];

/// A single user review, immutable once acquired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub author: String,
    /// Raw timestamp as delivered by the source.
    pub timestamp: String,
    pub text: String,
    pub rating: Option<f64>,
}

/// Errors raised while normalizing review records.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The input is neither a JSON array nor JSON Lines.
    #[error("invalid review JSON at line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A record is not a JSON object.
    #[error("review record {index} is not a JSON object")]
    NotAnObject { index: usize },

    /// No accepted text field was present.
    #[error("review record {index} has no text field (expected one of {expected}); available keys: {available}")]
    MissingText {
        index: usize,
        expected: String,
        available: String,
    },

    /// No accepted timestamp field was present.
    #[error("review record {index} has no timestamp field (expected one of {expected}); available keys: {available}")]
    MissingTimestamp {
        index: usize,
        expected: String,
        available: String,
    },
}

impl Review {
    /// Creates a review with only the fields the pipeline consumes.
    #[must_use]
    pub fn new(id: impl Into<String>, timestamp: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: String::new(),
            timestamp: timestamp.into(),
            text: text.into(),
            rating: None,
        }
    }

    /// Normalizes one raw record into a [`Review`].
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MissingText`] or [`IngestError::MissingTimestamp`]
    /// when none of the accepted aliases is present.
    pub fn from_record(index: usize, record: &Map<String, Value>) -> Result<Self, IngestError> {
        let text = first_field(record, &TEXT_FIELD_ALIASES).ok_or_else(|| {
            IngestError::MissingText {
                index,
                expected: TEXT_FIELD_ALIASES.join(", "),
                available: available_keys(record),
            }
        })?;

        let timestamp = first_field(record, &TIMESTAMP_FIELD_ALIASES).ok_or_else(|| {
            IngestError::MissingTimestamp {
                index,
                expected: TIMESTAMP_FIELD_ALIASES.join(", "),
                available: available_keys(record),
            }
        })?;

        let id = first_field(record, &ID_FIELD_ALIASES).unwrap_or_else(|| index.to_string());
        let author = first_field(record, &AUTHOR_FIELD_ALIASES).unwrap_or_default();
        let rating = RATING_FIELD_ALIASES
            .iter()
            .find_map(|key| record.get(*key).and_then(Value::as_f64));

        Ok(Self {
            id,
            author,
            timestamp,
            text,
            rating,
        })
    }

    /// Calendar date of the review, if the timestamp is recognizable.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        parse_review_date(&self.timestamp)
    }
}

/// Parses a review export: a JSON array of objects, or JSON Lines.
///
/// # Errors
///
/// Returns [`IngestError`] on malformed JSON, non-object records, or records
/// missing the text or timestamp field.
#[instrument(skip(raw), fields(bytes = raw.len()))]
pub fn parse_reviews_json(raw: &str) -> Result<Vec<Review>, IngestError> {
    let trimmed = raw.trim_start();
    let values: Vec<Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|source| IngestError::Json {
            line: source.line(),
            source,
        })?
    } else {
        let mut values = Vec::new();
        for (line_index, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let value = serde_json::from_str(line).map_err(|source| IngestError::Json {
                line: line_index + 1,
                source,
            })?;
            values.push(value);
        }
        values
    };

    let reviews = values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let record = value
                .as_object()
                .ok_or(IngestError::NotAnObject { index })?;
            Review::from_record(index, record)
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(count = reviews.len(), "parsed review records");
    Ok(reviews)
}

/// Integers at or above this magnitude are epoch milliseconds; as seconds
/// they would land past the year 5000.
const EPOCH_MILLIS_CUTOFF: u64 = 100_000_000_000;

/// Parses the calendar date out of a review timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]`, `YYYY-MM-DDTHH:MM:SS[.fff]`,
/// `YYYY-MM-DD`, `DD/MM/YYYY` and integer epoch seconds or milliseconds.
#[must_use]
pub fn parse_review_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.date_naive());
    }
    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.date());
        }
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    let epoch = raw.parse::<i64>().ok()?;
    let parsed = if epoch.unsigned_abs() >= EPOCH_MILLIS_CUTOFF {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    };
    parsed.map(|parsed| parsed.date_naive())
}

fn first_field(record: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn available_keys(record: &Map<String, Value>) -> String {
    record.keys().cloned().collect::<Vec<_>>().join(", ")
}
