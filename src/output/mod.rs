//! Output module
//!
//! Staged artifact format: the dialect, the writer, and a reader for
//! inspecting what was written.
//!
//! # Overview
//!
//! - `StagingDialect` - Delimiter, quoting and sentinel conventions
//! - `CsvStager` - Writes a coerced table as a delimited artifact
//! - `ArtifactReader` - Parses an artifact back into a table

mod dialect;
mod reader;
mod writer;

pub use dialect::StagingDialect;
pub use reader::ArtifactReader;
pub use writer::CsvStager;

#[cfg(test)]
mod tests;
