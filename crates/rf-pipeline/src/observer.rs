//! The boundary between the pipeline and whatever presents its data.

use std::sync::Arc;

use rf_core::{CategorySet, LoadErrorKind, Record};
use rf_watcher::WatchError;

/// Receives pipeline notifications.
///
/// Callbacks run synchronously on the task driving the pipeline, after the
/// pipeline's own state has been updated.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rf_core::{CategorySet, LoadErrorKind, Record};
/// use rf_pipeline::PipelineObserver;
///
/// #[derive(Default)]
/// struct Counter {
///     loads: usize,
/// }
///
/// impl PipelineObserver for Counter {
///     fn on_records_updated(&mut self, _records: &Arc<[Record]>, _categories: &CategorySet) {
///         self.loads += 1;
///     }
///
///     fn on_load_error(&mut self, kind: LoadErrorKind, message: &str) {
///         eprintln!("{}: {message}", kind.label());
///     }
/// }
/// ```
pub trait PipelineObserver {
    /// A load or reload succeeded and replaced the record collection.
    fn on_records_updated(&mut self, records: &Arc<[Record]>, categories: &CategorySet);

    /// A load or reload failed; previously published data remains valid.
    fn on_load_error(&mut self, kind: LoadErrorKind, message: &str);

    /// Live updates stopped working for the current file.
    fn on_watch_failed(&mut self, error: &WatchError) {
        let _ = error;
    }
}

/// An observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_records_updated(&mut self, _records: &Arc<[Record]>, _categories: &CategorySet) {}

    fn on_load_error(&mut self, _kind: LoadErrorKind, _message: &str) {}
}
