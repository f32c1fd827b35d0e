//! Fuel type filters and the selectable filter domain.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::record::Record;

/// Text form of [`FuelFilter::All`].
pub const ALL_LABEL: &str = "ALL";

/// Which records an aggregation includes.
///
/// Parsing `"ALL"` yields the sentinel; any other text selects that exact,
/// case-sensitive category.
///
/// # Examples
///
/// ```
/// use rf_core::FuelFilter;
///
/// let all: FuelFilter = "ALL".parse().unwrap();
/// assert!(all.is_all());
///
/// let diesel = FuelFilter::category("D");
/// assert_eq!(diesel.to_string(), "D");
/// assert_ne!(diesel, FuelFilter::category("d"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FuelFilter {
    /// Do not filter by category.
    #[default]
    All,
    /// Only records whose category equals this label.
    Category(String),
}

impl FuelFilter {
    /// Creates a filter for a single category.
    ///
    /// The label `ALL` always denotes the sentinel, even when it comes from
    /// data.
    #[inline]
    pub fn category(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    /// Returns `true` for the [`FuelFilter::All`] sentinel.
    #[inline]
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns `true` if `record` passes this filter.
    #[inline]
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::Category(name) => record.category() == name,
        }
    }

    /// Returns the display label (`"ALL"` or the category).
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::All => ALL_LABEL,
            Self::Category(name) => name,
        }
    }
}

impl std::fmt::Display for FuelFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FuelFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<&str> for FuelFilter {
    fn from(s: &str) -> Self {
        if s == ALL_LABEL {
            Self::All
        } else {
            Self::Category(s.to_owned())
        }
    }
}

impl From<String> for FuelFilter {
    fn from(s: String) -> Self {
        if s == ALL_LABEL {
            Self::All
        } else {
            Self::Category(s)
        }
    }
}

impl From<FuelFilter> for String {
    fn from(filter: FuelFilter) -> Self {
        match filter {
            FuelFilter::All => ALL_LABEL.to_owned(),
            FuelFilter::Category(name) => name,
        }
    }
}

/// The filter domain offered to the presentation layer.
///
/// Always starts with [`FuelFilter::All`], followed by every distinct
/// category of a record collection in sorted order. Rebuild it with
/// [`CategorySet::from_records`] whenever the collection changes.
///
/// # Examples
///
/// ```
/// use rf_core::{CategorySet, FuelFilter};
///
/// let empty = CategorySet::default();
/// assert_eq!(empty.len(), 1);
/// assert!(empty.contains(&FuelFilter::All));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySet {
    filters: Vec<FuelFilter>,
}

impl CategorySet {
    /// Collects the distinct categories of `records`.
    ///
    /// A record whose category is literally `ALL` merges into the sentinel;
    /// it is selectable only through [`FuelFilter::All`].
    #[must_use]
    pub fn from_records(records: &[Record]) -> Self {
        let distinct: BTreeSet<&str> = records
            .iter()
            .map(Record::category)
            .filter(|category| *category != ALL_LABEL)
            .collect();

        let mut filters = Vec::with_capacity(distinct.len() + 1);
        filters.push(FuelFilter::All);
        filters.extend(distinct.into_iter().map(FuelFilter::category));

        Self { filters }
    }

    /// Number of selectable filters, including `ALL`.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Always `false`: the set contains at least `ALL`.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Returns `true` if `filter` is selectable.
    #[must_use]
    pub fn contains(&self, filter: &FuelFilter) -> bool {
        self.filters.contains(filter)
    }

    /// Iterates over all selectable filters, `ALL` first.
    pub fn iter(&self) -> impl Iterator<Item = &FuelFilter> {
        self.filters.iter()
    }

    /// Iterates over the category labels only (without `ALL`).
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().filter_map(|filter| match filter {
            FuelFilter::All => None,
            FuelFilter::Category(name) => Some(name.as_str()),
        })
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self {
            filters: vec![FuelFilter::All],
        }
    }
}

impl<'a> IntoIterator for &'a CategorySet {
    type Item = &'a FuelFilter;
    type IntoIter = std::slice::Iter<'a, FuelFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}
