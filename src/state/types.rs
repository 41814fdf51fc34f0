//! Watermark state
//!
//! Serialized to JSON and persisted between runs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Date format of a watermark at the store interface
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persisted watermark
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkState {
    /// Last calendar date fully ingested and loaded
    #[serde(default)]
    pub last_run_date: Option<NaiveDate>,

    /// When the watermark was last written
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WatermarkState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state at a date
    pub fn at(date: NaiveDate) -> Self {
        Self {
            last_run_date: Some(date),
            updated_at: Some(Utc::now()),
        }
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}
