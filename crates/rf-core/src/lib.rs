//! Core types, parsing and aggregation for refuel logs.
//!
//! This crate provides the pure, synchronous half of the workspace:
//!
//! - [`Record`] - one validated refueling event
//! - [`parse_line`] / [`parse_document`] - text to records, or structured errors
//! - [`aggregate`] / [`MonthlyAggregate`] - spend per month, filtered by [`FuelFilter`]
//! - [`CategorySet`] - the filter domain of a record collection
//! - [`Config`] - watcher and report configuration
//!
//! # Examples
//!
//! ```
//! use rf_core::{aggregate, categories, parse_document, FuelFilter};
//!
//! let log = "98|1.319|50.56|01.01.2016\nD|1,219|5|01.02.2016\n";
//! let records = parse_document(log).unwrap();
//!
//! assert_eq!(categories(&records).len(), 3);
//! let totals = aggregate(&records, &FuelFilter::All);
//! assert_eq!(totals.peak_month().unwrap().0, 1);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod config;
pub mod error;
pub mod parser;
pub mod types;

pub use aggregate::{MONTHS, MonthlyAggregate, aggregate, categories};
pub use config::{Config, ReportConfig, WatchConfig};
pub use error::{
    AggregateError, ConfigError, LoadError, LoadErrorKind, NumericField, ParseError,
    ParseErrorKind,
};
pub use parser::{parse_document, parse_line};
pub use types::{ALL_LABEL, CategorySet, FuelFilter, Record};
