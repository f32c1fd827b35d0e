//! Month-bucketed spending aggregates.
//!
//! [`aggregate`] groups the records accepted by a [`FuelFilter`] by month of
//! year and sums `unit_price * quantity` per month. The result is a fresh
//! [`MonthlyAggregate`] on every call; nothing is cached or mutated in place.
//!
//! Contributions within a month are summed in ascending value order, so the
//! totals are bit-identical for any permutation of the input records.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;

use crate::error::AggregateError;
use crate::types::{CategorySet, FuelFilter, Record};

/// Number of months in a [`MonthlyAggregate::series`].
pub const MONTHS: usize = 12;

/// Per-month contributions before summation. Most months in a hand-kept log
/// see only a handful of refuels.
type Contributions = SmallVec<[f64; 8]>;

/// Total spend per month of year.
///
/// Only months with at least one matching record are present; consumers treat
/// absent months as zero ([`MonthlyAggregate::total`] and
/// [`MonthlyAggregate::series`] do so already).
///
/// # Examples
///
/// ```
/// use rf_core::{aggregate, parse_document, FuelFilter};
///
/// let records = parse_document("95|2|40|01.01.2016\n95|2|20|01.04.2016\n").unwrap();
/// let totals = aggregate(&records, &FuelFilter::All);
///
/// assert_eq!(totals.len(), 2);
/// assert_eq!(totals.total(1), 80.0);
/// assert_eq!(totals.total(2), 0.0);
/// assert_eq!(totals.max().unwrap(), 80.0);
/// assert_eq!(totals.min().unwrap(), 40.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    totals: BTreeMap<u32, f64>,
}

impl MonthlyAggregate {
    /// Returns the total for `month` (`1..=12`), or `0.0` if absent.
    #[inline]
    #[must_use]
    pub fn total(&self, month: u32) -> f64 {
        self.totals.get(&month).copied().unwrap_or(0.0)
    }

    /// Returns a dense January-to-December series with absent months as zero.
    #[must_use]
    pub fn series(&self) -> [f64; MONTHS] {
        let mut series = [0.0; MONTHS];
        for (&month, &total) in &self.totals {
            if let Some(slot) = month
                .checked_sub(1)
                .and_then(|i| series.get_mut(i as usize))
            {
                *slot = total;
            }
        }
        series
    }

    /// Greatest monthly total present.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::EmptyAggregate`] if no month is present.
    pub fn max(&self) -> Result<f64, AggregateError> {
        self.peak_month().map(|(_, total)| total)
    }

    /// Least monthly total present.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::EmptyAggregate`] if no month is present.
    pub fn min(&self) -> Result<f64, AggregateError> {
        self.low_month().map(|(_, total)| total)
    }

    /// Month and total of the greatest month; ties go to the earliest month.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::EmptyAggregate`] if no month is present.
    pub fn peak_month(&self) -> Result<(u32, f64), AggregateError> {
        self.extreme(|candidate, best| candidate > best)
    }

    /// Month and total of the least month; ties go to the earliest month.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::EmptyAggregate`] if no month is present.
    pub fn low_month(&self) -> Result<(u32, f64), AggregateError> {
        self.extreme(|candidate, best| candidate < best)
    }

    /// Sum over all months.
    #[must_use]
    pub fn grand_total(&self) -> f64 {
        self.totals.values().sum()
    }

    /// Iterates over present months in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.totals.iter().map(|(&month, &total)| (month, total))
    }

    /// Number of months present.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// Returns `true` if no record matched the filter.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    fn extreme(&self, replaces: impl Fn(f64, f64) -> bool) -> Result<(u32, f64), AggregateError> {
        let mut iter = self.iter();
        let first = iter.next().ok_or(AggregateError::EmptyAggregate)?;
        Ok(iter.fold(first, |best, candidate| {
            if replaces(candidate.1, best.1) {
                candidate
            } else {
                best
            }
        }))
    }
}

/// Groups the records accepted by `filter` by month and sums their cost.
///
/// # Examples
///
/// ```
/// use rf_core::{aggregate, parse_document, FuelFilter};
///
/// let records = parse_document("98|3|50|01.01.2016\nD|1,5|10|01.02.2016\n").unwrap();
///
/// let diesel = aggregate(&records, &FuelFilter::category("D"));
/// assert_eq!(diesel.iter().collect::<Vec<_>>(), vec![(2, 15.0)]);
///
/// let none = aggregate(&records, &FuelFilter::category("LPG"));
/// assert!(none.is_empty());
/// assert!(none.max().is_err());
/// ```
#[must_use]
pub fn aggregate(records: &[Record], filter: &FuelFilter) -> MonthlyAggregate {
    let mut by_month: FxHashMap<u32, Contributions> = FxHashMap::default();

    for record in records.iter().filter(|r| filter.matches(r)) {
        by_month
            .entry(record.month())
            .or_default()
            .push(record.cost());
    }

    let totals = by_month
        .into_iter()
        .map(|(month, mut contributions)| {
            contributions.sort_unstable_by(f64::total_cmp);
            (month, contributions.iter().sum())
        })
        .collect();

    MonthlyAggregate { totals }
}

/// Returns the filter domain for `records`: `ALL` plus every distinct
/// category, sorted.
#[inline]
#[must_use]
pub fn categories(records: &[Record]) -> CategorySet {
    CategorySet::from_records(records)
}
