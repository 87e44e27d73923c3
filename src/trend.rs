//! Rolling per-day topic counts over a trailing window.
//!
//! [`aggregate`] pivots labeled reviews into a dense topic × date matrix
//! covering `[target - (window - 1), target]`. Rows are topics in order of
//! first appearance within the window; columns are every date in the window,
//! ascending, including days with no reviews.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::labeler::LabeledReview;

/// Default trailing window, in days, including the target date.
pub const DEFAULT_WINDOW_DAYS: u32 = 31;

/// Errors raised when writing a trend table.
#[derive(Debug, Error)]
pub enum TrendError {
    #[error("failed to write trend table to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Dense topic × date count matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendTable {
    topics: Vec<String>,
    dates: Vec<NaiveDate>,
    /// `counts[row][column]`, one row per topic.
    counts: Vec<Vec<u64>>,
}

/// Builds the trend table for the `window` days ending at `target`.
///
/// An empty input yields an empty table with no columns. A `window` of 0 is
/// treated as 1.
#[must_use]
#[instrument(skip(labeled), fields(reviews = labeled.len()))]
pub fn aggregate(labeled: &[LabeledReview], target: NaiveDate, window: u32) -> TrendTable {
    if labeled.is_empty() {
        return TrendTable::default();
    }

    let window = window.max(1);
    let start = target
        .checked_sub_days(Days::new(u64::from(window - 1)))
        .unwrap_or(NaiveDate::MIN);
    let dates: Vec<NaiveDate> = start
        .iter_days()
        .take_while(|date| *date <= target)
        .collect();

    let mut topics: Vec<String> = Vec::new();
    let mut rows: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<Vec<u64>> = Vec::new();

    for item in labeled {
        if item.date < start || item.date > target {
            continue;
        }
        let row = *rows.entry(item.topic.as_str()).or_insert_with(|| {
            topics.push(item.topic.clone());
            counts.push(vec![0; dates.len()]);
            topics.len() - 1
        });
        let Ok(column) = usize::try_from((item.date - start).num_days()) else {
            continue;
        };
        counts[row][column] += 1;
    }

    debug!(
        %start,
        %target,
        topics = topics.len(),
        columns = dates.len(),
        "aggregated trend table"
    );

    TrendTable {
        topics,
        dates,
        counts,
    }
}

impl TrendTable {
    /// Topics (rows) in first-appearance order.
    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Dates (columns), ascending.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// True when no topic falls in the window.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Per-date counts for `topic`, aligned with [`dates`](Self::dates).
    #[must_use]
    pub fn row(&self, topic: &str) -> Option<&[u64]> {
        let index = self.topics.iter().position(|t| t == topic)?;
        Some(&self.counts[index])
    }

    /// Count for `topic` on `date`; 0 if either is absent.
    #[must_use]
    pub fn count(&self, topic: &str, date: NaiveDate) -> u64 {
        let Some(row) = self.row(topic) else {
            return 0;
        };
        self.dates
            .iter()
            .position(|d| *d == date)
            .map_or(0, |column| row[column])
    }

    /// Sum of a topic's row.
    #[must_use]
    pub fn total(&self, topic: &str) -> u64 {
        self.row(topic).map_or(0, |row| row.iter().sum())
    }

    /// Sum of all cells.
    #[must_use]
    pub fn grand_total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// The `n` topics with the highest totals, descending; ties keep row order.
    #[must_use]
    pub fn top_topics(&self, n: usize) -> Vec<(String, u64)> {
        let mut totals: Vec<(String, u64)> = self
            .topics
            .iter()
            .zip(&self.counts)
            .map(|(topic, row)| (topic.clone(), row.iter().sum()))
            .collect();
        // Stable sort keeps first-appearance order among equal totals.
        totals.sort_by(|a, b| b.1.cmp(&a.1));
        totals.truncate(n);
        totals
    }

    /// Renders the table as CSV: header `topic,<dates>`, one row per topic.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::from("topic");
        for date in &self.dates {
            let _ = write!(out, ",{}", date.format("%Y-%m-%d"));
        }
        out.push('\n');

        for (topic, row) in self.topics.iter().zip(&self.counts) {
            out.push_str(&csv_field(topic));
            for count in row {
                let _ = write!(out, ",{count}");
            }
            out.push('\n');
        }
        out
    }

    /// Writes [`to_csv`](Self::to_csv) to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::Io`] if the directory or file cannot be written.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn write_csv(&self, path: &Path) -> Result<(), TrendError> {
        let io_error = |source| TrendError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, self.to_csv()).map_err(io_error)?;
        debug!(rows = self.topics.len(), "wrote trend table");
        Ok(())
    }
}

/// Quotes a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
