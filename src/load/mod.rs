//! Load module
//!
//! Hands staged artifacts to the warehouse.
//!
//! # Overview
//!
//! - `Loader` - Loads one `StagingArtifact`; the loop depends only on this
//! - `DuckDbLoader` - Reference implementation over DuckDB

mod warehouse;

pub use warehouse::DuckDbLoader;

use crate::error::Result;
use crate::stage::StagingArtifact;
use crate::types::LoadMode;

/// Consumer of staged artifacts
///
/// `Ok` means the artifact is durably loaded and may be purged.
pub trait Loader: Send + Sync {
    /// Load every staged file of an artifact into the table named after its dataset
    fn load(&self, artifact: &StagingArtifact, mode: LoadMode) -> Result<()>;
}
