//! Single-file watcher with async change notifications.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 Blocking Thread (spawn_blocking)                 │
//! │  ┌───────────────────┐  std mpsc  ┌──────────────────────────┐   │
//! │  │ RecommendedWatcher│ ─────────► │ watch loop               │   │
//! │  │ (parent dir)      │            │ recv_timeout(poll)       │   │
//! │  └───────────────────┘            │ relevance + settle       │   │
//! │                                   └────────────┬─────────────┘   │
//! └────────────────────────────────────────────────│─────────────────┘
//!                                                  │ WatchSignal
//!                                                  ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Async Runtime (tokio)                       │
//! │  FileWatcher (stop / shutdown)      mpsc::Receiver<WatchSignal>  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop wakes at least once per poll interval to check for a stop
//! request, so a stop is observed within one interval. The first event that
//! concerns the watched file opens a [`ChangeBatch`]; the batch is delivered
//! once one full interval passes without further relevant events, or after
//! `MAX_SETTLE_INTERVALS` intervals at the latest. Events for sibling files
//! are counted but never hold a batch back.

use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use rf_core::WatchConfig;

use crate::error::WatchError;
use crate::events::{ChangeBatch, ChangeKind, WatchSignal};
use crate::filter::{FileFilter, FileNameFilter};

type RawEvent = notify::Result<Event>;

/// A batch is delivered at most this many poll intervals after its first
/// relevant event, even while the file keeps changing.
const MAX_SETTLE_INTERVALS: u32 = 4;

/// A background watch bound to one file path.
///
/// The parent directory is watched non-recursively and events are matched
/// against the file's base name, so the file does not need to exist when
/// the watch starts and survives being replaced by a rename.
///
/// # Lifecycle
///
/// 1. [`FileWatcher::new`] validates the path, registers the notify watch
///    and spawns the poll loop on tokio's blocking pool.
/// 2. [`FileWatcher::recv`] yields [`WatchSignal`]s. A
///    [`WatchSignal::Failed`] is always the last signal.
/// 3. [`FileWatcher::stop`] (idempotent) or [`FileWatcher::shutdown`] ends
///    the loop. Dropping the watcher also stops it.
///
/// # Examples
///
/// ```no_run
/// use rf_watcher::{FileWatcher, WatchSignal};
/// use rf_core::WatchConfig;
/// use camino::Utf8Path;
///
/// # async fn example() -> Result<(), rf_watcher::WatchError> {
/// let config = WatchConfig::default();
/// let mut watcher = FileWatcher::new(Utf8Path::new("data/refuel.txt"), &config).await?;
///
/// while let Some(signal) = watcher.recv().await {
///     match signal {
///         WatchSignal::Changed(batch) => println!("{} changed", batch.path),
///         WatchSignal::Failed(error) => {
///             eprintln!("watch failed: {error}");
///             break;
///         }
///     }
/// }
///
/// watcher.shutdown(config.shutdown_timeout()).await
/// # }
/// ```
pub struct FileWatcher {
    /// Stop signal for the loop. `None` once stop was requested.
    stop_tx: Option<oneshot::Sender<()>>,

    /// Handle to the blocking loop task. `None` once awaited.
    task_handle: Option<JoinHandle<Result<(), WatchError>>>,

    /// Signals from the loop.
    signal_rx: mpsc::Receiver<WatchSignal>,

    /// Canonical path of the watched file.
    file_path: Utf8PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("file_path", &self.file_path)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Starts watching `path`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`WatchError::InvalidPath`] if `path` has no file name or is a
    ///   directory.
    /// - [`WatchError::PathNotFound`] if the parent directory does not exist.
    /// - [`WatchError::Io`] if the directory cannot be canonicalized.
    /// - [`WatchError::Notify`] if the notify watch cannot be registered.
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn new(path: &Utf8Path, config: &WatchConfig) -> Result<Self, WatchError> {
        let target = WatchTarget::resolve(path)?;
        let filter = FileNameFilter::new(target.file_name());
        Self::spawn(target, config, filter)
    }

    fn spawn<F: FileFilter>(
        target: WatchTarget,
        config: &WatchConfig,
        filter: F,
    ) -> Result<Self, WatchError> {
        let (raw_tx, raw_rx) = std_mpsc::channel::<RawEvent>();
        let mut notify_watcher = notify::recommended_watcher(raw_tx)?;
        notify_watcher.watch(target.dir.as_std_path(), RecursiveMode::NonRecursive)?;

        let (signal_tx, signal_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();

        let file_path = target.file.clone();
        let watch_loop = WatchLoop {
            _notify_watcher: notify_watcher,
            raw_rx,
            signal_tx,
            stop_rx,
            target,
            filter,
            poll_interval: config.poll_interval(),
            max_settle: config.poll_interval() * MAX_SETTLE_INTERVALS,
        };
        let task_handle = tokio::task::spawn_blocking(move || watch_loop.run());

        tracing::info!(path = %file_path, "file watcher started");

        Ok(Self {
            stop_tx: Some(stop_tx),
            task_handle: Some(task_handle),
            signal_rx,
            file_path,
        })
    }

    /// Receives the next signal.
    ///
    /// Returns `None` once the loop has exited and all signals were consumed.
    pub async fn recv(&mut self) -> Option<WatchSignal> {
        self.signal_rx.recv().await
    }

    /// Receives a signal without waiting.
    pub fn try_recv(&mut self) -> Result<WatchSignal, mpsc::error::TryRecvError> {
        self.signal_rx.try_recv()
    }

    /// Canonical path of the watched file.
    #[inline]
    #[must_use]
    pub fn file_path(&self) -> &Utf8Path {
        &self.file_path
    }

    /// Returns `true` until a stop is requested or the loop exits.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Requests the loop to stop. Calling it again has no effect.
    ///
    /// The loop observes the request within one poll interval.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // The loop may already have exited on its own.
            let _ = tx.send(());
            tracing::debug!(path = %self.file_path, "file watcher stop requested");
        }
    }

    /// Stops the loop and waits up to `timeout` for it to finish.
    ///
    /// # Errors
    ///
    /// Returns the error the loop terminated with (already reported as
    /// [`WatchSignal::Failed`]), [`WatchError::ChannelClosed`] if the task
    /// panicked, or [`WatchError::ShutdownTimeout`] if it did not finish in
    /// time.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<(), WatchError> {
        self.stop();

        let Some(handle) = self.task_handle.take() else {
            return Ok(());
        };

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(_join_error)) => Err(WatchError::ChannelClosed),
            Err(_elapsed) => Err(WatchError::ShutdownTimeout(timeout)),
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        // The loop exits on its own once it sees the request.
        self.stop();
    }
}

/// The resolved directory and file of a watch.
#[derive(Debug)]
struct WatchTarget {
    dir: Utf8PathBuf,
    file: Utf8PathBuf,
}

impl WatchTarget {
    fn resolve(path: &Utf8Path) -> Result<Self, WatchError> {
        let Some(file_name) = path.file_name() else {
            return Err(WatchError::invalid_path(path));
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        if !parent.is_dir() {
            return Err(WatchError::path_not_found(parent));
        }
        if path.is_dir() {
            return Err(WatchError::invalid_path(path));
        }

        let dir = parent.canonicalize_utf8()?;
        let file = dir.join(file_name);
        Ok(Self { dir, file })
    }

    fn file_name(&self) -> &str {
        self.file.file_name().unwrap_or_default()
    }
}

/// State owned by the blocking poll loop.
struct WatchLoop<F> {
    /// Kept alive for the duration of the loop; dropping it ends the watch.
    _notify_watcher: RecommendedWatcher,
    raw_rx: std_mpsc::Receiver<RawEvent>,
    signal_tx: mpsc::Sender<WatchSignal>,
    stop_rx: oneshot::Receiver<()>,
    target: WatchTarget,
    filter: F,
    poll_interval: Duration,
    max_settle: Duration,
}

/// A batch waiting for its settle window to close.
struct Settling {
    batch: ChangeBatch,
    last_relevant: Instant,
}

impl Settling {
    fn new(path: Utf8PathBuf, now: Instant) -> Self {
        Self {
            batch: ChangeBatch::new(path),
            last_relevant: now,
        }
    }

    /// One quiet interval after the last relevant event, but never later
    /// than `max_settle` after the first one.
    fn deadline(&self, quiet: Duration, max_settle: Duration) -> Instant {
        (self.last_relevant + quiet).min(self.batch.received_at + max_settle)
    }
}

impl<F: FileFilter> WatchLoop<F> {
    fn run(mut self) -> Result<(), WatchError> {
        let result = self.poll_until_stopped();

        match &result {
            Ok(()) => tracing::info!(path = %self.target.file, "file watcher stopped"),
            Err(error) => {
                tracing::warn!(path = %self.target.file, error = %error, "file watcher failed");
                // Nobody may be listening anymore; the error is also returned.
                let _ = self.signal_tx.blocking_send(WatchSignal::Failed(error.clone()));
            }
        }

        result
    }

    fn poll_until_stopped(&mut self) -> Result<(), WatchError> {
        let mut pending: Option<Settling> = None;

        loop {
            if self.stop_requested() {
                return Ok(());
            }

            let wait = match &pending {
                Some(settling) => settling
                    .deadline(self.poll_interval, self.max_settle)
                    .saturating_duration_since(Instant::now())
                    .min(self.poll_interval),
                None => self.poll_interval,
            };

            match self.raw_rx.recv_timeout(wait) {
                Ok(event) => self.absorb(&mut pending, event)?,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(WatchError::SourceDisconnected),
            }

            let due = pending.as_ref().is_some_and(|settling| {
                Instant::now() >= settling.deadline(self.poll_interval, self.max_settle)
            });
            if !due {
                continue;
            }
            if let Some(settling) = pending.take() {
                if !self.deliver(settling.batch) {
                    tracing::debug!("signal channel closed, stopping watcher");
                    return Ok(());
                }
            }
        }
    }

    fn stop_requested(&mut self) -> bool {
        match self.stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Closed) => true,
            Err(TryRecvError::Empty) => false,
        }
    }

    /// Adds one raw event to the settling batch. Only relevant events open a
    /// batch or extend its quiet interval.
    fn absorb(&self, pending: &mut Option<Settling>, event: RawEvent) -> Result<(), WatchError> {
        let event = event?;
        match classify(&event, &self.target.dir, &self.filter)? {
            Some(kind) => {
                let now = Instant::now();
                let settling =
                    pending.get_or_insert_with(|| Settling::new(self.target.file.clone(), now));
                settling.batch.record(kind);
                settling.last_relevant = now;
            }
            None => match pending.as_mut() {
                Some(settling) => settling.batch.record_ignored(),
                None => tracing::trace!("ignoring unrelated directory event"),
            },
        }
        Ok(())
    }

    /// Sends a settled batch. Returns `false` once the receiver is gone.
    fn deliver(&self, batch: ChangeBatch) -> bool {
        tracing::debug!(
            path = %batch.path,
            raw_events = batch.raw_events,
            overflow = batch.is_overflow(),
            "watched file changed"
        );

        match self.signal_tx.try_send(WatchSignal::Changed(batch)) {
            Ok(()) => true,
            // An undelivered change is still queued; the consumer reloads
            // after it, so this one adds nothing.
            Err(TrySendError::Full(_)) => {
                tracing::trace!("change already pending, dropping batch");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Decides what a raw directory event means for the watched file.
///
/// Returns `Ok(None)` for events that do not concern the file and an error
/// if the watched directory itself went away.
fn classify<F: FileFilter>(
    event: &Event,
    dir: &Utf8Path,
    filter: &F,
) -> Result<Option<ChangeKind>, WatchError> {
    if event.need_rescan() {
        return Ok(Some(ChangeKind::Rescan));
    }

    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => {
            if event.paths.iter().any(|p| p == dir.as_std_path()) {
                return Err(WatchError::directory_removed(dir));
            }
            return Ok(None);
        }
        _ => return Ok(None),
    };

    let touches_file = event
        .paths
        .iter()
        .filter_map(|p| Utf8Path::from_path(p))
        .any(|p| filter.should_process(p));

    Ok(touches_file.then_some(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, Flag, ModifyKind, RemoveKind};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    const DIR: &str = "/data";

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    fn classify_one(event: &Event) -> Result<Option<ChangeKind>, WatchError> {
        classify(event, Utf8Path::new(DIR), &FileNameFilter::new("refuel.txt"))
    }

    fn temp_log() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8PathBuf::try_from(temp.path().join("refuel.txt")).expect("UTF-8 temp path");
        fs::write(&path, "98|1.319|50.56|01.01.2016\n").expect("Failed to write log");
        (temp, path)
    }

    fn fast_config() -> WatchConfig {
        WatchConfig {
            poll_interval_ms: 20,
            ..WatchConfig::default()
        }
    }

    async fn next_signal(watcher: &mut FileWatcher, wait: Duration) -> Option<WatchSignal> {
        tokio::time::timeout(wait, watcher.recv()).await.ok().flatten()
    }

    #[test]
    fn test_classify_modify_of_watched_file() {
        let modify = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/data/refuel.txt",
        );
        assert_eq!(classify_one(&modify).unwrap(), Some(ChangeKind::Modified));

        let create = event(EventKind::Create(CreateKind::File), "/data/refuel.txt");
        assert_eq!(classify_one(&create).unwrap(), Some(ChangeKind::Created));
    }

    #[test]
    fn test_classify_ignores_siblings_and_access() {
        let sibling = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Any)),
            "/data/other.txt",
        );
        assert_eq!(classify_one(&sibling).unwrap(), None);

        let access = event(EventKind::Access(AccessKind::Read), "/data/refuel.txt");
        assert_eq!(classify_one(&access).unwrap(), None);

        let removed_file = event(EventKind::Remove(RemoveKind::File), "/data/refuel.txt");
        assert_eq!(classify_one(&removed_file).unwrap(), None);
    }

    #[test]
    fn test_classify_rescan_is_relevant() {
        let overflow = Event::new(EventKind::Other).set_flag(Flag::Rescan);
        assert_eq!(classify_one(&overflow).unwrap(), Some(ChangeKind::Rescan));
    }

    #[test]
    fn test_classify_directory_removed_is_error() {
        let removed = event(EventKind::Remove(RemoveKind::Folder), DIR);
        let err = classify_one(&removed).unwrap_err();
        assert!(matches!(err, WatchError::DirectoryRemoved(ref p) if p.as_str() == DIR));
    }

    #[test]
    fn test_resolve_relative_file_uses_current_dir() {
        let target = WatchTarget::resolve(Utf8Path::new("refuel-missing.txt")).unwrap();
        assert_eq!(target.file_name(), "refuel-missing.txt");
        assert!(target.dir.is_absolute());
    }

    #[tokio::test]
    async fn test_watcher_path_not_found() {
        let path = Utf8Path::new("/nonexistent/dir/that/does/not/exist/refuel.txt");
        let result = FileWatcher::new(path, &WatchConfig::default()).await;
        assert!(matches!(result, Err(WatchError::PathNotFound(_))));
    }

    #[tokio::test]
    async fn test_watcher_rejects_directory() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8Path::from_path(temp.path()).expect("Invalid path");

        let result = FileWatcher::new(path, &WatchConfig::default()).await;
        assert!(matches!(result, Err(WatchError::InvalidPath(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watcher_reports_change_to_watched_file() {
        let (_temp, path) = temp_log();
        let mut watcher = FileWatcher::new(&path, &fast_config())
            .await
            .expect("Failed to create watcher");
        assert!(watcher.is_running());
        assert_eq!(watcher.file_path().file_name(), Some("refuel.txt"));

        fs::write(&path, "95|1.319|45.32|15.01.2016\n").expect("Failed to write log");

        let signal = next_signal(&mut watcher, Duration::from_secs(5)).await;
        let Some(WatchSignal::Changed(batch)) = signal else {
            unreachable!("expected a change signal, got {signal:?}");
        };
        assert_eq!(batch.path, watcher.file_path());
        assert!(batch.raw_events >= 1);

        watcher
            .shutdown(Duration::from_secs(2))
            .await
            .expect("Shutdown failed");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watcher_coalesces_bursts() {
        let (_temp, path) = temp_log();
        let mut watcher = FileWatcher::new(&path, &fast_config())
            .await
            .expect("Failed to create watcher");

        let writes = 5;
        for i in 0..writes {
            fs::write(&path, format!("98|1|{i}|01.01.2016\n")).expect("Failed to write log");
        }

        let mut changes = 0;
        while let Some(signal) = next_signal(&mut watcher, Duration::from_millis(500)).await {
            assert!(!signal.is_failure());
            changes += 1;
        }
        assert!(changes >= 1);
        assert!(changes < writes);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_single_write_yields_exactly_one_change() {
        let (_temp, path) = temp_log();
        let config = fast_config();
        let mut watcher = FileWatcher::new(&path, &config)
            .await
            .expect("Failed to create watcher");

        fs::write(&path, "95|1.319|45.32|15.01.2016\n").expect("Failed to write log");

        let signal = next_signal(&mut watcher, Duration::from_secs(5)).await;
        assert!(matches!(signal, Some(WatchSignal::Changed(_))), "got {signal:?}");

        // Well past the longest possible settle window.
        tokio::time::sleep(config.poll_interval() * MAX_SETTLE_INTERVALS * 5).await;
        assert!(matches!(
            watcher.try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        ));
    }

    /// Writes `path` every 5 ms on a plain thread until the flag is cleared.
    fn keep_writing(path: PathBuf, running: Arc<AtomicBool>) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || {
            let mut tick = 0u64;
            while running.load(Ordering::Relaxed) {
                let _ = fs::write(&path, format!("tick {tick}\n"));
                tick += 1;
                std::thread::sleep(Duration::from_millis(5));
            }
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_busy_sibling_does_not_delay_change() {
        let (temp, path) = temp_log();
        let mut watcher = FileWatcher::new(&path, &fast_config())
            .await
            .expect("Failed to create watcher");

        let running = Arc::new(AtomicBool::new(true));
        let writer = keep_writing(temp.path().join("app.log"), Arc::clone(&running));

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, "95|1.319|45.32|15.01.2016\n").expect("Failed to write log");
        let signal = next_signal(&mut watcher, Duration::from_secs(1)).await;

        running.store(false, Ordering::Relaxed);
        writer.join().expect("Writer thread panicked");

        assert!(matches!(signal, Some(WatchSignal::Changed(_))), "got {signal:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_continuous_writes_still_deliver() {
        let (_temp, path) = temp_log();
        let mut watcher = FileWatcher::new(&path, &fast_config())
            .await
            .expect("Failed to create watcher");

        let running = Arc::new(AtomicBool::new(true));
        let writer = keep_writing(path.clone().into_std_path_buf(), Arc::clone(&running));

        let signal = next_signal(&mut watcher, Duration::from_secs(1)).await;

        running.store(false, Ordering::Relaxed);
        writer.join().expect("Writer thread panicked");

        let Some(WatchSignal::Changed(batch)) = signal else {
            unreachable!("expected a change while the file kept changing, got {signal:?}");
        };
        assert!(batch.raw_events >= 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watcher_ignores_sibling_files() {
        let (temp, path) = temp_log();
        let mut watcher = FileWatcher::new(&path, &fast_config())
            .await
            .expect("Failed to create watcher");

        let sibling = temp.path().join("notes.txt");
        for _ in 0..3 {
            fs::write(&sibling, "not a refuel log").expect("Failed to write sibling");
        }

        let signal = next_signal(&mut watcher, Duration::from_millis(300)).await;
        assert!(signal.is_none(), "unexpected signal {signal:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watcher_stop_is_idempotent() {
        let (_temp, path) = temp_log();
        let mut watcher = FileWatcher::new(&path, &fast_config())
            .await
            .expect("Failed to create watcher");

        watcher.stop();
        watcher.stop();
        assert!(!watcher.is_running());

        let result = watcher.shutdown(Duration::from_secs(2)).await;
        assert!(result.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watcher_drop_stops_loop() {
        let (_temp, path) = temp_log();
        let watcher = FileWatcher::new(&path, &fast_config())
            .await
            .expect("Failed to create watcher");
        drop(watcher);
    }
}
