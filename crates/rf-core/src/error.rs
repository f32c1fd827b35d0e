//! Error types for the rf-core crate.
//!
//! - [`ParseError`] rejects a single input line.
//! - [`LoadError`] rejects a whole file (I/O failure or the first bad line).
//! - [`AggregateError`] is returned by min/max queries on an empty aggregate.
//! - [`ConfigError`] covers configuration loading and validation.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// The numeric column a [`ParseError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    /// The unit price column (second field).
    Price,
    /// The quantity column (third field).
    Amount,
}

impl NumericField {
    /// Returns the column name used in error messages.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Amount => "amount",
        }
    }
}

impl std::fmt::Display for NumericField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejection of a single refuel line.
///
/// Every variant is locally recoverable: the offending file is simply not
/// loaded.
///
/// # Examples
///
/// ```
/// use rf_core::{parse_line, ParseErrorKind};
///
/// let err = parse_line("98|asd|50.56|01.01.2016").unwrap_err();
/// assert_eq!(err.kind(), ParseErrorKind::InvalidNumber);
/// assert!(err.to_string().contains("price"));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The line does not consist of exactly four `|`-separated fields, or the
    /// category field is empty.
    #[error("malformed line ({fields} fields): {reason}")]
    MalformedLine {
        /// Number of fields found after splitting on `|`.
        fields: usize,
        /// Human readable explanation.
        reason: &'static str,
    },

    /// A price or amount field is not a decimal number.
    #[error("invalid {field} value '{value}'")]
    InvalidNumber {
        /// The column that failed.
        field: NumericField,
        /// The raw field text.
        value: String,
    },

    /// The date field is not a real `dd.MM.yyyy` date.
    #[error("invalid date '{value}', expected dd.MM.yyyy")]
    InvalidDate {
        /// The raw field text.
        value: String,
    },

    /// A price or amount parsed but is below zero.
    #[error("{field} cannot be negative: {value}")]
    NegativeValue {
        /// The column that failed.
        field: NumericField,
        /// The parsed value.
        value: f64,
    },
}

/// Discriminant of a [`ParseError`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    /// See [`ParseError::MalformedLine`].
    MalformedLine,
    /// See [`ParseError::InvalidNumber`].
    InvalidNumber,
    /// See [`ParseError::InvalidDate`].
    InvalidDate,
    /// See [`ParseError::NegativeValue`].
    NegativeValue,
}

impl ParseError {
    /// Creates a [`ParseError::MalformedLine`] error.
    #[inline]
    pub const fn malformed(fields: usize, reason: &'static str) -> Self {
        Self::MalformedLine { fields, reason }
    }

    /// Creates a [`ParseError::InvalidNumber`] error.
    #[inline]
    pub fn invalid_number(field: NumericField, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            field,
            value: value.into(),
        }
    }

    /// Creates a [`ParseError::InvalidDate`] error.
    #[inline]
    pub fn invalid_date(value: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
        }
    }

    /// Returns the payload-free kind of this error.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ParseErrorKind {
        match self {
            Self::MalformedLine { .. } => ParseErrorKind::MalformedLine,
            Self::InvalidNumber { .. } => ParseErrorKind::InvalidNumber,
            Self::InvalidDate { .. } => ParseErrorKind::InvalidDate,
            Self::NegativeValue { .. } => ParseErrorKind::NegativeValue,
        }
    }
}

/// Rejection of a whole refuel file.
///
/// A load is all-or-nothing: the first failing line aborts it.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file that could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A line failed to parse.
    #[error("line {line}: {source}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// The line-level error.
        #[source]
        source: ParseError,
    },
}

/// Discriminant of a [`LoadError`], as handed to the presentation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum LoadErrorKind {
    /// The file could not be read.
    Io,
    /// See [`ParseError::MalformedLine`].
    MalformedLine,
    /// See [`ParseError::InvalidNumber`].
    InvalidNumber,
    /// See [`ParseError::InvalidDate`].
    InvalidDate,
    /// See [`ParseError::NegativeValue`].
    NegativeValue,
}

impl LoadErrorKind {
    /// Returns a short label for status lines.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Io => "I/O error",
            Self::MalformedLine => "malformed line",
            Self::InvalidNumber => "invalid number",
            Self::InvalidDate => "invalid date",
            Self::NegativeValue => "negative value",
        }
    }
}

impl From<ParseErrorKind> for LoadErrorKind {
    fn from(kind: ParseErrorKind) -> Self {
        match kind {
            ParseErrorKind::MalformedLine => Self::MalformedLine,
            ParseErrorKind::InvalidNumber => Self::InvalidNumber,
            ParseErrorKind::InvalidDate => Self::InvalidDate,
            ParseErrorKind::NegativeValue => Self::NegativeValue,
        }
    }
}

impl LoadError {
    /// Creates a new [`LoadError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`LoadError::Parse`] error.
    #[inline]
    pub const fn parse(line: usize, source: ParseError) -> Self {
        Self::Parse { line, source }
    }

    /// Returns the payload-free kind of this error.
    #[must_use]
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            Self::Read { .. } => LoadErrorKind::Io,
            Self::Parse { source, .. } => source.kind().into(),
        }
    }

    /// Returns the 1-based line number for parse failures.
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. } => Some(*line),
            Self::Read { .. } => None,
        }
    }

    /// Returns the line-level error for parse failures.
    #[must_use]
    pub const fn parse_error(&self) -> Option<&ParseError> {
        match self {
            Self::Parse { source, .. } => Some(source),
            Self::Read { .. } => None,
        }
    }
}

/// Errors returned by aggregate queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    /// min/max was requested on an aggregate with no months.
    #[error("aggregate is empty: no records match the filter")]
    EmptyAggregate,
}

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use rf_core::ConfigError;
///
/// let error = ConfigError::InvalidOption {
///     option: "watch.poll_interval_ms".to_owned(),
///     reason: "must be greater than zero".to_owned(),
/// };
/// assert!(error.to_string().contains("poll_interval_ms"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
