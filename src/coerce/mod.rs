//! Coercion module
//!
//! Eliminates mixed-type columns and canonicalizes nulls and timestamps so a
//! table can be staged with the fixed artifact dialect.
//!
//! # Overview
//!
//! - `ColumnProfile` - Kind a column is committed to, inferred from its values
//! - `TypeCoercer` - Applies the profiles and scrubs text values

mod coercer;
mod profile;

pub use coercer::TypeCoercer;
pub use profile::{ColumnKind, ColumnProfile};
