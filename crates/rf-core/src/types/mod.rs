//! Domain types for refuel ingestion.
//!
//! - [`record`] - the validated [`Record`]
//! - [`filter`] - [`FuelFilter`] and the [`CategorySet`] filter domain
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use rf_core::{CategorySet, FuelFilter, Record};
//! ```

mod filter;
mod record;

pub use filter::{ALL_LABEL, CategorySet, FuelFilter};
pub use record::Record;
