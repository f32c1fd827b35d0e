//! Text rendering of monthly aggregates.
//!
//! The chart shows all twelve months (absent months as zero), marks the
//! highest month with `▲` and the lowest with `▼`, and prints values rounded
//! toward positive infinity.

use std::fmt::Write as _;
use std::io::Write;
use std::sync::Arc;

use rf_core::{
    CategorySet, FuelFilter, LoadErrorKind, MONTHS, MonthlyAggregate, Record, ReportConfig,
    aggregate,
};
use rf_pipeline::PipelineObserver;
use rf_watcher::WatchError;
use serde::Serialize;

/// Width of a full bar in characters.
const BAR_WIDTH: usize = 30;

/// Largest supported label precision.
const MAX_PRECISION: usize = 9;

const MONTH_NAMES: [&str; MONTHS] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Rendering knobs taken from [`ReportConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartOptions {
    /// Decimal places of value labels.
    pub precision: usize,
    /// Fraction of the maximum added on top for the axis bound.
    pub headroom_ratio: f64,
}

impl From<&ReportConfig> for ChartOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            precision: config.label_precision.min(MAX_PRECISION),
            headroom_ratio: config.headroom_ratio,
        }
    }
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

/// Formats `value` with `precision` decimals, rounding toward positive
/// infinity.
///
/// Rounding works on the shortest decimal form of `value` (its `Display`
/// output), so `6.095000000000001` becomes `6.096` while `4.35` stays
/// `4.350`.
pub fn ceil_label(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let precision = precision.min(MAX_PRECISION);

    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let (kept, dropped) = frac_part.split_at(frac_part.len().min(precision));

    let mut digits: Vec<u8> = int_part.bytes().chain(kept.bytes()).collect();
    digits.resize(int_part.len() + precision, b'0');

    // Toward +inf: positive values round away from zero, negative ones truncate.
    if value > 0.0 && dropped.bytes().any(|b| b != b'0') {
        increment(&mut digits);
    }

    let (int_digits, frac_digits) = digits.split_at(digits.len() - precision);
    let mut label = String::with_capacity(digits.len() + 2);
    if value < 0.0 && digits.iter().any(|&b| b != b'0') {
        label.push('-');
    }
    label.extend(int_digits.iter().map(|&b| char::from(b)));
    if precision > 0 {
        label.push('.');
        label.extend(frac_digits.iter().map(|&b| char::from(b)));
    }
    label
}

/// Adds one unit in the last place to a run of ASCII digits.
fn increment(digits: &mut Vec<u8>) {
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

/// Upper bound of the value axis: the maximum plus headroom, rounded.
pub fn axis_upper_bound(max: f64, headroom_ratio: f64) -> f64 {
    (max + max * headroom_ratio).round()
}

/// Renders the chart for one filter.
///
/// An empty aggregate renders a notice instead of the chart.
pub fn render_chart(
    totals: &MonthlyAggregate,
    filter: &FuelFilter,
    categories: &CategorySet,
    options: ChartOptions,
) -> String {
    let mut out = String::new();
    let labels: Vec<&str> = categories.iter().map(FuelFilter::label).collect();

    let _ = writeln!(out, "Monthly refuel spending ({filter})");
    let _ = writeln!(out, "Categories: {}", labels.join(", "));
    let _ = writeln!(out);

    let (Ok((peak_month, max)), Ok((low_month, min))) = (totals.peak_month(), totals.low_month())
    else {
        let _ = writeln!(out, "No refuels match this filter; nothing to chart.");
        return out;
    };

    let axis = axis_upper_bound(max, options.headroom_ratio);

    for (name, value) in MONTH_NAMES.iter().zip(totals.series()) {
        let bar = "█".repeat(bar_length(value, axis));
        let label = ceil_label(value, options.precision);
        let _ = writeln!(
            out,
            "{name} │{bar:<BAR_WIDTH$}│{label:>10}{}",
            marker(value, max, min)
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Axis: 0..{axis:.0}");
    let _ = writeln!(
        out,
        "Peak: {} {} | Low: {} {} | Total: {}",
        month_name(peak_month),
        ceil_label(max, options.precision),
        month_name(low_month),
        ceil_label(min, options.precision),
        ceil_label(totals.grand_total(), options.precision),
    );

    out
}

// Exact comparison: the marked values are taken from the same series.
#[allow(clippy::float_cmp)]
fn marker(value: f64, max: f64, min: f64) -> &'static str {
    if value == max {
        " ▲"
    } else if value == min {
        " ▼"
    } else {
        ""
    }
}

// Bar lengths are small non-negative values bounded by BAR_WIDTH.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn bar_length(value: f64, axis: f64) -> usize {
    if axis <= 0.0 || value <= 0.0 {
        return 0;
    }
    let cells = (value / axis * BAR_WIDTH as f64).round() as usize;
    cells.min(BAR_WIDTH)
}

fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("???")
}

/// One month of a [`SummaryReport`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthTotal {
    /// Month of year, `1..=12`.
    pub month: u32,
    /// Short month name.
    pub name: &'static str,
    /// Total spend.
    pub total: f64,
}

impl MonthTotal {
    fn new((month, total): (u32, f64)) -> Self {
        Self {
            month,
            name: month_name(month),
            total,
        }
    }
}

/// Machine-readable summary for `--format json`.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport<'a> {
    /// The filter the totals were computed for.
    pub filter: &'a FuelFilter,
    /// Number of records in the file (before filtering).
    pub records: usize,
    /// The filter domain, `ALL` first.
    pub categories: Vec<&'a str>,
    /// Dense January-to-December totals.
    pub months: [f64; MONTHS],
    /// Highest month, if any record matched.
    pub peak: Option<MonthTotal>,
    /// Lowest month, if any record matched.
    pub low: Option<MonthTotal>,
    /// Sum over all months.
    pub total: f64,
    /// Axis upper bound used by the text chart.
    pub axis_max: Option<f64>,
}

impl<'a> SummaryReport<'a> {
    /// Builds the report for `records` under `filter`.
    pub fn new(
        records: &[Record],
        filter: &'a FuelFilter,
        categories: &'a CategorySet,
        options: ChartOptions,
    ) -> Self {
        let totals = aggregate(records, filter);
        Self {
            filter,
            records: records.len(),
            categories: categories.iter().map(FuelFilter::label).collect(),
            months: totals.series(),
            peak: totals.peak_month().ok().map(MonthTotal::new),
            low: totals.low_month().ok().map(MonthTotal::new),
            total: totals.grand_total(),
            axis_max: totals
                .max()
                .ok()
                .map(|max| axis_upper_bound(max, options.headroom_ratio)),
        }
    }
}

/// Redraws the chart on every pipeline update.
#[derive(Debug)]
pub struct TerminalObserver<W> {
    out: W,
    filter: FuelFilter,
    options: ChartOptions,
}

impl<W: Write> TerminalObserver<W> {
    /// Creates an observer writing to `out`.
    pub fn new(out: W, filter: FuelFilter, options: ChartOptions) -> Self {
        Self {
            out,
            filter,
            options,
        }
    }

    fn emit(&mut self, text: &str) {
        if let Err(error) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::warn!(error = %error, "failed to write output");
        }
    }
}

impl<W: Write> PipelineObserver for TerminalObserver<W> {
    fn on_records_updated(&mut self, records: &Arc<[Record]>, categories: &CategorySet) {
        let totals = aggregate(records, &self.filter);
        let mut text = render_chart(&totals, &self.filter, categories, self.options);
        text.push('\n');
        self.emit(&text);
    }

    fn on_load_error(&mut self, kind: LoadErrorKind, message: &str) {
        let text = format!("Load failed ({}): {message}; keeping previous data\n\n", kind.label());
        self.emit(&text);
    }

    fn on_watch_failed(&mut self, error: &WatchError) {
        let text = format!("Live updates stopped: {error}\n\n");
        self.emit(&text);
    }
}
