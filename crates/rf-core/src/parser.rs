//! Line parsing for refuel logs.
//!
//! A refuel log is plain UTF-8 text with one record per line:
//!
//! ```text
//! <category>|<price>|<amount>|<dd.MM.yyyy>
//! ```
//!
//! # Number format
//!
//! Price and amount follow the comma-decimal rule: every `.` is first
//! translated to `,`, then the field is read with `,` as the decimal
//! separator. `1.319` and `1,319` therefore both mean `1.319`. After
//! translation the grammar is strict:
//!
//! ```text
//! number = [ "+" | "-" ] digits-with-at-most-one-comma
//! ```
//!
//! with at least one digit and nothing else (no whitespace, no exponent, no
//! trailing text). The host locale is never consulted.
//!
//! # Validation order
//!
//! price number, amount number, date, price sign, amount sign. A field that
//! does not parse always reports [`ParseError::InvalidNumber`]; a sign
//! violation is only reported once every field has parsed.

use chrono::NaiveDate;

use crate::error::{LoadError, NumericField, ParseError};
use crate::types::Record;

/// Field delimiter of a refuel line.
pub const FIELD_DELIMITER: char = '|';

/// Number of fields on a refuel line.
pub const FIELD_COUNT: usize = 4;

/// Date layout of the fourth field, as a chrono format string.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Parses one refuel line into a [`Record`].
///
/// # Errors
///
/// - [`ParseError::MalformedLine`] if the line does not split into exactly
///   four fields or the category is empty.
/// - [`ParseError::InvalidNumber`] if price or amount is not a number.
/// - [`ParseError::InvalidDate`] if the date is not a real `dd.MM.yyyy` date.
/// - [`ParseError::NegativeValue`] if price or amount is below zero.
///
/// # Examples
///
/// ```
/// use rf_core::parse_line;
///
/// let dot = parse_line("98|1.319|50.56|01.01.2016").unwrap();
/// let comma = parse_line("98|1,319|50,56|01.01.2016").unwrap();
/// assert_eq!(dot, comma);
/// assert_eq!(dot.category(), "98");
/// ```
pub fn parse_line(line: &str) -> Result<Record, ParseError> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    let [category, price, amount, date] = fields.as_slice() else {
        return Err(ParseError::malformed(
            fields.len(),
            "expected category|price|amount|date",
        ));
    };

    if category.is_empty() {
        return Err(ParseError::malformed(
            FIELD_COUNT,
            "category must not be empty",
        ));
    }

    let unit_price = parse_decimal(price)
        .ok_or_else(|| ParseError::invalid_number(NumericField::Price, *price))?;
    let quantity = parse_decimal(amount)
        .ok_or_else(|| ParseError::invalid_number(NumericField::Amount, *amount))?;
    let date = parse_date(date).ok_or_else(|| ParseError::invalid_date(*date))?;

    Record::try_new(*category, unit_price, quantity, date)
}

/// Parses a whole file body, one record per non-empty line.
///
/// Lines are split on `\n` with an optional preceding `\r`. Empty lines are
/// skipped; a whitespace-only line is not empty and fails as malformed. The
/// first failing line aborts the document.
///
/// # Errors
///
/// Returns [`LoadError::Parse`] with the 1-based line number of the first
/// line that failed.
///
/// # Examples
///
/// ```
/// use rf_core::parse_document;
///
/// let records = parse_document("95|1,5|10|01.03.2016\n\nD|1.2|5|02.03.2016\n").unwrap();
/// assert_eq!(records.len(), 2);
///
/// assert!(parse_document("").unwrap().is_empty());
///
/// let err = parse_document("95|1,5|10|01.03.2016\nbroken\n").unwrap_err();
/// assert_eq!(err.line(), Some(2));
/// ```
pub fn parse_document(text: &str) -> Result<Vec<Record>, LoadError> {
    let mut records = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let record = parse_line(line).map_err(|source| LoadError::parse(index + 1, source))?;
        records.push(record);
    }

    tracing::trace!(records = records.len(), "parsed refuel document");
    Ok(records)
}

/// Applies the comma-decimal rule to a single numeric field.
fn parse_decimal(raw: &str) -> Option<f64> {
    let translated = raw.replace('.', ",");

    let unsigned = translated
        .strip_prefix(['+', '-'])
        .unwrap_or(translated.as_str());

    let mut digits = 0usize;
    let mut commas = 0usize;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => digits += 1,
            ',' => commas += 1,
            _ => return None,
        }
    }
    if digits == 0 || commas > 1 {
        return None;
    }

    translated.replace(',', ".").parse().ok()
}

/// Parses a strict `dd.MM.yyyy` date.
///
/// chrono alone accepts single-digit days and months for `%d`/`%m`, so the
/// fixed shape is checked first.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    if bytes.len() != 10 {
        return None;
    }
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        2 | 5 => *b == b'.',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}
