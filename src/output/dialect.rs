//! Staging dialect
//!
//! The artifact format shared by the coercer, the stager, the reader and the
//! loader. It must match the warehouse file-format declaration exactly.

/// Delimiter, quoting and sentinel conventions of a staged artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingDialect {
    delimiter: u8,
    quote: u8,
    null_text: String,
    timestamp_format: String,
    timestamp_null: String,
    scrub_pattern: String,
}

impl Default for StagingDialect {
    fn default() -> Self {
        Self {
            delimiter: b'~',
            quote: b'"',
            null_text: "NULL".to_string(),
            timestamp_format: "%Y-%m-%d %H:%M:%S%.6f".to_string(),
            timestamp_null: "0001-01-01 00:00:00.000".to_string(),
            // Literal backslash escapes, the raw control characters, and quotes
            scrub_pattern: r#"\\t|\\n|\\r|\t|\n|\r|""#.to_string(),
        }
    }
}

impl StagingDialect {
    /// Create the default dialect
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the text used for missing values
    #[must_use]
    pub fn with_null_text(mut self, null_text: impl Into<String>) -> Self {
        self.null_text = null_text.into();
        self
    }

    /// Set the chrono format used to render timestamps
    #[must_use]
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Set the text standing in for a null timestamp
    #[must_use]
    pub fn with_timestamp_null(mut self, sentinel: impl Into<String>) -> Self {
        self.timestamp_null = sentinel.into();
        self
    }

    /// Set the regex whose matches are removed from text values
    #[must_use]
    pub fn with_scrub_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.scrub_pattern = pattern.into();
        self
    }

    /// Field delimiter
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Quote character
    pub fn quote(&self) -> u8 {
        self.quote
    }

    /// Missing-value text
    pub fn null_text(&self) -> &str {
        &self.null_text
    }

    /// Timestamp format (chrono syntax)
    pub fn timestamp_format(&self) -> &str {
        &self.timestamp_format
    }

    /// Null timestamp sentinel
    pub fn timestamp_null(&self) -> &str {
        &self.timestamp_null
    }

    /// Scrub regex
    pub fn scrub_pattern(&self) -> &str {
        &self.scrub_pattern
    }
}
