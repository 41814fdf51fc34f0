//! Schema module
//!
//! Column-set diagnostics and DDL derivation for a staging pass.
//!
//! # Overview
//!
//! - `ReferenceColumnSet` - Tracks drift of column names across files
//! - `DdlProjector` - Renders the column definition fragment
//! - `DdlColumns` - Gathers column kinds over a pass (last table or union)

mod ddl;
mod drift;

pub use ddl::{DdlColumns, DdlMode, DdlProjector, WarehouseTypes};
pub use drift::{DriftReport, ReferenceColumnSet};
