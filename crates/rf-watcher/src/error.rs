//! Error types for the rf-watcher crate.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;

/// Errors that can occur while establishing or servicing a file watch.
///
/// The type is [`Clone`] so the background loop can both report a failure to
/// the consumer (as [`WatchSignal::Failed`](crate::WatchSignal::Failed)) and
/// return it from its task. Non-cloneable sources are shared behind an
/// [`Arc`].
///
/// # Error Recovery Strategy
///
/// - [`WatchError::PathNotFound`] and [`WatchError::DirectoryRemoved`]:
///   recoverable - the directory may come back, so restarting the watch later
///   can succeed
/// - everything else: fatal for this watcher instance
///
/// # Examples
///
/// ```
/// use rf_watcher::WatchError;
///
/// let err = WatchError::directory_removed("/var/log/refuel");
/// assert!(err.is_recoverable());
/// assert_eq!(err.path().map(|p| p.as_str()), Some("/var/log/refuel"));
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[source] Arc<notify::Error>),

    /// The directory containing the watched file does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The path does not name a file (no file name, or it is a directory).
    #[error("not a file path: {0}")]
    InvalidPath(Utf8PathBuf),

    /// The watched directory was removed while the watch was active.
    #[error("watched directory was removed: {0}")]
    DirectoryRemoved(Utf8PathBuf),

    /// The notify event source hung up unexpectedly.
    #[error("file event source disconnected")]
    SourceDisconnected,

    /// The watcher task ended without reporting a result.
    #[error("watcher task ended unexpectedly")]
    ChannelClosed,

    /// The watcher task did not finish within the shutdown timeout.
    #[error("watcher did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    /// An I/O error occurred while validating the path.
    #[error("I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),
}

impl From<notify::Error> for WatchError {
    fn from(error: notify::Error) -> Self {
        Self::Notify(Arc::new(error))
    }
}

impl From<std::io::Error> for WatchError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(Arc::new(error))
    }
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::InvalidPath`] error.
    #[inline]
    pub fn invalid_path(path: impl Into<Utf8PathBuf>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Creates a new [`WatchError::DirectoryRemoved`] error.
    #[inline]
    pub fn directory_removed(path: impl Into<Utf8PathBuf>) -> Self {
        Self::DirectoryRemoved(path.into())
    }

    /// Returns `true` if starting a new watch on the same path later may
    /// succeed.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::PathNotFound(_) | Self::DirectoryRemoved(_))
    }

    /// Returns `true` if this error is fatal (watching should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) | Self::InvalidPath(path) | Self::DirectoryRemoved(path) => {
                Some(path)
            }
            Self::Notify(_)
            | Self::SourceDisconnected
            | Self::ChannelClosed
            | Self::ShutdownTimeout(_)
            | Self::Io(_) => None,
        }
    }
}
