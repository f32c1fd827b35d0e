//! The validated refuel record.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{NumericField, ParseError};

/// One validated refueling event.
///
/// Records are built only by the line parser ([`crate::parse_line`]), so
/// every instance satisfies the invariant: the category is non-empty and
/// both price and quantity are non-negative. Records are immutable; a reload
/// discards the whole collection and builds a new one.
///
/// Equality is structural over all four fields.
///
/// # Examples
///
/// ```
/// use rf_core::parse_line;
///
/// let record = parse_line("98|1,5|10|01.01.2016").unwrap();
/// assert_eq!(record.month(), 1);
/// assert!((record.cost() - 15.0).abs() < f64::EPSILON);
///
/// assert!(parse_line("98|-1|10|01.01.2016").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    category: String,
    unit_price: f64,
    quantity: f64,
    date: NaiveDate,
}

impl Record {
    /// Builds a record, enforcing the record invariant.
    ///
    /// # Errors
    ///
    /// - [`ParseError::MalformedLine`] if `category` is empty.
    /// - [`ParseError::NegativeValue`] if the price (checked first) or the
    ///   quantity is below zero.
    pub(crate) fn try_new(
        category: impl Into<String>,
        unit_price: f64,
        quantity: f64,
        date: NaiveDate,
    ) -> Result<Self, ParseError> {
        let category = category.into();
        if category.is_empty() {
            return Err(ParseError::malformed(4, "category must not be empty"));
        }
        if unit_price < 0.0 {
            return Err(ParseError::NegativeValue {
                field: NumericField::Price,
                value: unit_price,
            });
        }
        if quantity < 0.0 {
            return Err(ParseError::NegativeValue {
                field: NumericField::Amount,
                value: quantity,
            });
        }

        Ok(Self {
            category,
            unit_price,
            quantity,
            date,
        })
    }

    /// The fuel type label, verbatim from the source line.
    #[inline]
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Price per unit of fuel.
    #[inline]
    #[must_use]
    pub const fn unit_price(&self) -> f64 {
        self.unit_price
    }

    /// Amount of fuel bought.
    #[inline]
    #[must_use]
    pub const fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Day of the refuel.
    #[inline]
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Month of year, `1..=12`.
    #[inline]
    #[must_use]
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// Money spent on this refuel (`unit_price * quantity`).
    #[inline]
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.unit_price * self.quantity
    }
}
