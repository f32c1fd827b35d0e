//! Pipeline error types.

use rf_core::LoadError;
use rf_watcher::WatchError;
use thiserror::Error;

/// Errors returned by [`IngestionPipeline`](crate::IngestionPipeline)
/// operations.
///
/// Every error is also delivered to the pipeline's observer before it is
/// returned, so callers that only drive the pipeline may log and continue.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Reading or parsing the refuel file failed. The previously loaded
    /// records, if any, are still in place.
    #[error("failed to load refuel file: {0}")]
    Load(#[from] LoadError),

    /// Live updates are unavailable.
    #[error("watcher error: {0}")]
    Watch(#[from] WatchError),

    /// The operation needs a loaded file.
    #[error("no refuel file is loaded")]
    NoFile,
}

impl PipelineError {
    /// Returns `true` if the pipeline keeps working normally after this
    /// error (the data it held before is still valid).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Load(_) | Self::NoFile => true,
            Self::Watch(error) => error.is_recoverable(),
        }
    }

    /// Returns the load error, if this is one.
    #[must_use]
    pub const fn load_error(&self) -> Option<&LoadError> {
        match self {
            Self::Load(error) => Some(error),
            Self::Watch(_) | Self::NoFile => None,
        }
    }
}
