//! The ingestion pipeline state machine.
//!
//! ```text
//!            load_file (ok)               load_file (ok, other path)
//!   Idle ─────────────────────► Loaded ◄──────────────────────────┐
//!    ▲                           │  │ on_file_changed (reload)    │
//!    │          reset            │  └─────────────────────────────┘
//!    └───────────────────────────┘
//! ```
//!
//! A failed load or reload never changes the state: records, path and
//! watcher stay as they were.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use rf_core::{
    CategorySet, FuelFilter, LoadError, MonthlyAggregate, Record, WatchConfig, aggregate,
    parse_document,
};
use rf_watcher::{FileWatcher, WatchError, WatchSignal};

use crate::error::PipelineError;
use crate::observer::PipelineObserver;

/// Whether a file is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// No file selected.
    Idle,
    /// A file is loaded and its records are held.
    Loaded,
}

/// Health of live updates for the loaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchStatus {
    /// Nothing is watched (no file loaded).
    Inactive,
    /// Changes to the file trigger reloads.
    Live,
    /// The watcher could not start or died; the reason is kept for display.
    Dead(String),
}

impl WatchStatus {
    /// Returns `true` for [`WatchStatus::Live`].
    #[inline]
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Summary of a successful load or reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LoadReport {
    /// Number of records now held.
    pub records: usize,
    /// Number of distinct categories (excluding `ALL`).
    pub categories: usize,
    /// Whether changes to the file are being watched.
    pub watching: bool,
}

/// Owns the record collection of one refuel log and keeps it current.
///
/// Every mutating operation takes `&mut self`, so foreground loads and
/// watcher-driven reloads are serialised by ownership. The watcher itself
/// never touches pipeline state; it only produces [`WatchSignal`]s that the
/// owner feeds back through [`IngestionPipeline::handle_signal`].
///
/// # Examples
///
/// ```no_run
/// use rf_core::{FuelFilter, WatchConfig};
/// use rf_pipeline::{IngestionPipeline, NoopObserver};
///
/// # async fn example() -> Result<(), rf_pipeline::PipelineError> {
/// let mut pipeline = IngestionPipeline::new(WatchConfig::default(), NoopObserver);
/// pipeline.load_file("refuel.txt").await?;
///
/// loop {
///     let signal = pipeline.next_signal().await;
///     if pipeline.handle_signal(signal).await.is_ok() {
///         let totals = pipeline.request_aggregate(&FuelFilter::All);
///         println!("{:?}", totals.series());
///     }
/// }
/// # }
/// ```
pub struct IngestionPipeline<O> {
    config: WatchConfig,
    observer: O,
    records: Arc<[Record]>,
    categories: CategorySet,
    path: Option<Utf8PathBuf>,
    watcher: Option<FileWatcher>,
    watch_status: WatchStatus,
}

impl<O> std::fmt::Debug for IngestionPipeline<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("path", &self.path)
            .field("records", &self.records.len())
            .field("watch_status", &self.watch_status)
            .finish_non_exhaustive()
    }
}

impl<O: PipelineObserver> IngestionPipeline<O> {
    /// Creates an idle pipeline.
    pub fn new(config: WatchConfig, observer: O) -> Self {
        Self {
            config,
            observer,
            records: Arc::from(Vec::new()),
            categories: CategorySet::default(),
            path: None,
            watcher: None,
            watch_status: WatchStatus::Inactive,
        }
    }

    /// Loads `path`, replacing any current file, and starts watching it.
    ///
    /// On success the record collection and category set are replaced, the
    /// old watcher (if any) is stopped and a new one is started on `path`.
    /// A watcher that fails to start does not fail the load; the status
    /// becomes [`WatchStatus::Dead`] and the observer is told.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Load`] if the file cannot be read or a line
    /// fails to parse. Nothing changes in that case.
    pub async fn load_file(
        &mut self,
        path: impl AsRef<Utf8Path>,
    ) -> Result<LoadReport, PipelineError> {
        let path = path.as_ref();
        let records = self.read(path).await?;

        self.publish(records);
        self.stop_watcher().await;
        self.path = Some(path.to_owned());
        // A start failure is recorded in the watch status and reported.
        let _ = self.start_watcher().await;

        info!(path = %path, records = self.records.len(), "refuel file loaded");
        self.notify_updated();
        Ok(self.report())
    }

    /// Re-reads the current file without touching the watcher.
    ///
    /// Returns `Ok(None)` when idle.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Load`] if the new content is rejected; the
    /// previous records stay in place.
    pub async fn on_file_changed(&mut self) -> Result<Option<LoadReport>, PipelineError> {
        let Some(path) = self.path.clone() else {
            debug!("change notification while idle, ignoring");
            return Ok(None);
        };

        let records = self.read(&path).await?;
        self.publish(records);

        info!(path = %path, records = self.records.len(), "refuel file reloaded");
        self.notify_updated();
        Ok(Some(self.report()))
    }

    /// Stops watching and discards the loaded file. Safe to call repeatedly.
    pub async fn reset(&mut self) {
        self.stop_watcher().await;
        self.watch_status = WatchStatus::Inactive;
        if self.path.take().is_some() {
            info!("pipeline reset");
        }
        self.records = Arc::from(Vec::new());
        self.categories = CategorySet::default();
    }

    /// Waits for the next signal from the active watcher.
    ///
    /// Never resolves while no watcher is running, which makes it suitable
    /// as a `tokio::select!` branch. Cancel safe.
    pub async fn next_signal(&mut self) -> WatchSignal {
        match self.watcher.as_mut() {
            Some(watcher) => match watcher.recv().await {
                Some(signal) => signal,
                None => WatchSignal::Failed(WatchError::ChannelClosed),
            },
            None => std::future::pending().await,
        }
    }

    /// Applies a signal obtained from [`IngestionPipeline::next_signal`].
    ///
    /// A change triggers [`IngestionPipeline::on_file_changed`]. A failure
    /// stops the watcher and marks live updates as dead.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Load`] if the reload was rejected and
    /// [`PipelineError::Watch`] if the watcher failed. Both are reported to
    /// the observer first.
    pub async fn handle_signal(
        &mut self,
        signal: WatchSignal,
    ) -> Result<Option<LoadReport>, PipelineError> {
        match signal {
            WatchSignal::Changed(batch) => {
                debug!(
                    path = %batch.path,
                    raw_events = batch.raw_events,
                    overflow = batch.is_overflow(),
                    "reloading after change"
                );
                self.on_file_changed().await
            }
            WatchSignal::Failed(error) => {
                self.stop_watcher().await;
                self.mark_watch_dead(&error);
                Err(PipelineError::Watch(error))
            }
        }
    }

    /// Restarts the watcher on the current file, e.g. after it died.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoFile`] when idle and
    /// [`PipelineError::Watch`] if the watcher cannot be started.
    pub async fn restart_watch(&mut self) -> Result<(), PipelineError> {
        if self.path.is_none() {
            return Err(PipelineError::NoFile);
        }
        self.stop_watcher().await;
        self.start_watcher().await?;
        Ok(())
    }

    /// Aggregates the current records by month.
    #[must_use]
    pub fn request_aggregate(&self, filter: &FuelFilter) -> MonthlyAggregate {
        aggregate(&self.records, filter)
    }

    /// A cheap handle to the current record collection.
    #[must_use]
    pub fn snapshot(&self) -> Arc<[Record]> {
        Arc::clone(&self.records)
    }

    /// The filter domain of the current records.
    #[inline]
    #[must_use]
    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    /// Whether a file is loaded.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        if self.path.is_some() {
            PipelineState::Loaded
        } else {
            PipelineState::Idle
        }
    }

    /// The loaded file, as given to [`IngestionPipeline::load_file`].
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Health of live updates.
    #[inline]
    #[must_use]
    pub const fn watch_status(&self) -> &WatchStatus {
        &self.watch_status
    }

    /// The observer.
    #[inline]
    #[must_use]
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    /// The observer, mutably.
    #[inline]
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    async fn read(&mut self, path: &Utf8Path) -> Result<Vec<Record>, PipelineError> {
        let result = match tokio::fs::read_to_string(path).await {
            Ok(text) => parse_document(&text),
            Err(source) => Err(LoadError::read(path, source)),
        };

        result.map_err(|error| {
            warn!(path = %path, error = %error, "refuel file rejected");
            self.observer.on_load_error(error.kind(), &error.to_string());
            PipelineError::Load(error)
        })
    }

    fn publish(&mut self, records: Vec<Record>) {
        self.categories = CategorySet::from_records(&records);
        self.records = Arc::from(records);
    }

    fn notify_updated(&mut self) {
        self.observer
            .on_records_updated(&self.records, &self.categories);
    }

    fn report(&self) -> LoadReport {
        LoadReport {
            records: self.records.len(),
            categories: self.categories.categories().count(),
            watching: self.watch_status.is_live(),
        }
    }

    async fn start_watcher(&mut self) -> Result<(), WatchError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let started = FileWatcher::new(path, &self.config).await;
        match started {
            Ok(watcher) => {
                self.watcher = Some(watcher);
                self.watch_status = WatchStatus::Live;
                Ok(())
            }
            Err(error) => {
                self.mark_watch_dead(&error);
                Err(error)
            }
        }
    }

    async fn stop_watcher(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            if let Err(error) = watcher.shutdown(self.config.shutdown_timeout()).await {
                debug!(error = %error, "watcher ended with error");
            }
        }
    }

    fn mark_watch_dead(&mut self, error: &WatchError) {
        warn!(error = %error, "live updates unavailable");
        self.watch_status = WatchStatus::Dead(error.to_string());
        self.observer.on_watch_failed(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::{AggregateError, LoadErrorKind};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    const SAMPLE_LOG: &str = "\
98|1.319|50.56|01.01.2016
95|1.319|45.32|15.01.2016
95|1.319|5.00|01.04.2016
D|1.219|5.00|01.02.2016
E85|0.95|15.12|12.11.2016
";

    #[derive(Debug, Default)]
    struct RecordingObserver {
        updates: Vec<usize>,
        errors: Vec<LoadErrorKind>,
        watch_failures: Vec<String>,
    }

    impl PipelineObserver for RecordingObserver {
        fn on_records_updated(&mut self, records: &Arc<[Record]>, _categories: &CategorySet) {
            self.updates.push(records.len());
        }

        fn on_load_error(&mut self, kind: LoadErrorKind, _message: &str) {
            self.errors.push(kind);
        }

        fn on_watch_failed(&mut self, error: &WatchError) {
            self.watch_failures.push(error.to_string());
        }
    }

    fn write_log(dir: &TempDir, name: &str, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::try_from(dir.path().join(name)).expect("UTF-8 temp path");
        fs::write(&path, content).expect("Failed to write log");
        path
    }

    fn pipeline() -> IngestionPipeline<RecordingObserver> {
        let config = WatchConfig {
            poll_interval_ms: 20,
            ..WatchConfig::default()
        };
        IngestionPipeline::new(config, RecordingObserver::default())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_file_publishes_records() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = write_log(&temp, "refuel.txt", SAMPLE_LOG);
        let mut pipeline = pipeline();

        let report = pipeline.load_file(&path).await.expect("load failed");

        assert_eq!(
            report,
            LoadReport {
                records: 5,
                categories: 4,
                watching: true
            }
        );
        assert_eq!(pipeline.state(), PipelineState::Loaded);
        assert_eq!(pipeline.path(), Some(path.as_path()));
        assert!(pipeline.watch_status().is_live());
        assert_eq!(pipeline.categories().len(), 5);
        assert_eq!(pipeline.observer().updates, vec![5]);

        pipeline.reset().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_first_load_stays_idle() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = write_log(&temp, "refuel.txt", "98|asd|50.56|01.01.2016\n");
        let mut pipeline = pipeline();

        let err = pipeline.load_file(&path).await.unwrap_err();

        assert_eq!(err.load_error().map(LoadError::kind), Some(LoadErrorKind::InvalidNumber));
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert_eq!(pipeline.watch_status(), &WatchStatus::Inactive);
        assert!(pipeline.snapshot().is_empty());
        assert_eq!(pipeline.observer().errors, vec![LoadErrorKind::InvalidNumber]);
        assert!(pipeline.observer().updates.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_missing_file_reports_io() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8PathBuf::try_from(temp.path().join("missing.txt")).expect("UTF-8 temp path");
        let mut pipeline = pipeline();

        let err = pipeline.load_file(&path).await.unwrap_err();
        assert_eq!(err.load_error().map(LoadError::kind), Some(LoadErrorKind::Io));
        assert_eq!(pipeline.observer().errors, vec![LoadErrorKind::Io]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_reload_keeps_previous_records() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = write_log(&temp, "refuel.txt", SAMPLE_LOG);
        let mut pipeline = pipeline();
        pipeline.load_file(&path).await.expect("load failed");
        let before = pipeline.snapshot();

        fs::write(&path, "98|1.319|50.56|31.02.2016\n").expect("Failed to write log");
        let err = pipeline.on_file_changed().await.unwrap_err();

        assert!(err.is_recoverable());
        assert_eq!(&*pipeline.snapshot(), &*before);
        assert_eq!(pipeline.state(), PipelineState::Loaded);
        assert_eq!(pipeline.observer().errors, vec![LoadErrorKind::InvalidDate]);
        assert_eq!(pipeline.observer().updates, vec![5]);

        pipeline.reset().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_load_of_other_file_keeps_current() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let good = write_log(&temp, "refuel.txt", SAMPLE_LOG);
        let bad = write_log(&temp, "broken.txt", "98|1|1\n");
        let mut pipeline = pipeline();
        pipeline.load_file(&good).await.expect("load failed");

        assert!(pipeline.load_file(&bad).await.is_err());

        assert_eq!(pipeline.path(), Some(good.as_path()));
        assert_eq!(pipeline.snapshot().len(), 5);
        assert!(pipeline.watch_status().is_live());

        pipeline.reset().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reset_then_reload_is_idempotent() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = write_log(&temp, "refuel.txt", SAMPLE_LOG);
        let mut pipeline = pipeline();

        pipeline.load_file(&path).await.expect("load failed");
        let first = pipeline.snapshot();

        pipeline.reset().await;
        pipeline.reset().await;
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert_eq!(pipeline.watch_status(), &WatchStatus::Inactive);
        assert!(pipeline.snapshot().is_empty());
        assert_eq!(pipeline.categories(), &CategorySet::default());

        pipeline.load_file(&path).await.expect("reload failed");
        assert_eq!(&*pipeline.snapshot(), &*first);

        pipeline.reset().await;
    }

    #[tokio::test]
    async fn test_on_file_changed_when_idle_is_noop() {
        let mut pipeline = pipeline();
        assert!(pipeline.on_file_changed().await.expect("no-op").is_none());
        assert!(pipeline.observer().updates.is_empty());
        assert!(pipeline.observer().errors.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_file_yields_empty_collection() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = write_log(&temp, "refuel.txt", "");
        let mut pipeline = pipeline();

        let report = pipeline.load_file(&path).await.expect("load failed");
        assert_eq!(report.records, 0);
        assert_eq!(pipeline.categories().len(), 1);

        let totals = pipeline.request_aggregate(&FuelFilter::All);
        assert_eq!(totals.max(), Err(AggregateError::EmptyAggregate));
        assert_eq!(totals.min(), Err(AggregateError::EmptyAggregate));

        pipeline.reset().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_request_aggregate_over_loaded_records() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = write_log(&temp, "refuel.txt", SAMPLE_LOG);
        let mut pipeline = pipeline();
        pipeline.load_file(&path).await.expect("load failed");

        let all = pipeline.request_aggregate(&FuelFilter::All);
        let months: Vec<u32> = all.iter().map(|(month, _)| month).collect();
        assert_eq!(months, vec![1, 2, 4, 11]);

        let e85 = pipeline.request_aggregate(&FuelFilter::category("E85"));
        assert_eq!(e85.peak_month().map(|(month, _)| month), Ok(11));

        pipeline.reset().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watch_triggered_reload() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = write_log(&temp, "refuel.txt", SAMPLE_LOG);
        let mut pipeline = pipeline();
        pipeline.load_file(&path).await.expect("load failed");

        let appended = format!("{SAMPLE_LOG}D|1.219|10|03.03.2016\n");
        fs::write(&path, appended).expect("Failed to write log");

        let reloaded = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let signal = pipeline.next_signal().await;
                if let Ok(Some(report)) = pipeline.handle_signal(signal).await {
                    if report.records == 6 {
                        break report;
                    }
                }
            }
        })
        .await
        .expect("no reload within timeout");

        assert!(reloaded.watching);
        assert_eq!(pipeline.request_aggregate(&FuelFilter::All).len(), 5);
        assert_eq!(pipeline.observer().updates.last(), Some(&6));

        pipeline.reset().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watch_failure_marks_dead_and_restart_revives() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = write_log(&temp, "refuel.txt", SAMPLE_LOG);
        let mut pipeline = pipeline();
        pipeline.load_file(&path).await.expect("load failed");

        let err = pipeline
            .handle_signal(WatchSignal::Failed(WatchError::SourceDisconnected))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Watch(WatchError::SourceDisconnected)));
        assert!(matches!(pipeline.watch_status(), WatchStatus::Dead(_)));
        assert_eq!(pipeline.observer().watch_failures.len(), 1);
        // Data stays usable without live updates.
        assert_eq!(pipeline.snapshot().len(), 5);

        pipeline.restart_watch().await.expect("restart failed");
        assert!(pipeline.watch_status().is_live());

        pipeline.reset().await;
    }

    #[tokio::test]
    async fn test_restart_watch_when_idle() {
        let mut pipeline = pipeline();
        let err = pipeline.restart_watch().await.unwrap_err();
        assert!(matches!(err, PipelineError::NoFile));
    }

    #[test]
    fn test_load_report_serialization() {
        let report = LoadReport {
            records: 5,
            categories: 4,
            watching: false,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"records":5,"categories":4,"watching":false}"#);
    }
}
