//! Notifications emitted by the file watcher.
//!
//! ```text
//! notify events (parent directory)
//!        │
//!        ▼
//!   relevance check (file name / rescan)
//!        │
//!        ▼
//!   settle window (one quiet poll interval, capped)
//!        │
//!        ▼
//!   WatchSignal::Changed(ChangeBatch)
//! ```

use std::time::Instant;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::WatchError;

/// What kind of relevant change contributed to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The watched file was created (or moved into place).
    Created,
    /// The watched file's content, metadata or name changed.
    Modified,
    /// The event source overflowed; the file may have changed.
    Rescan,
}

/// A coalesced set of raw events that produced one notification.
///
/// # Examples
///
/// ```
/// use rf_watcher::{ChangeBatch, ChangeKind};
/// use camino::Utf8PathBuf;
///
/// let mut batch = ChangeBatch::new(Utf8PathBuf::from("/data/refuel.txt"));
/// batch.record(ChangeKind::Modified);
/// batch.record(ChangeKind::Modified);
///
/// assert_eq!(batch.raw_events, 2);
/// assert_eq!(batch.kinds.as_slice(), &[ChangeKind::Modified]);
/// assert!(!batch.is_overflow());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    /// The watched file.
    pub path: Utf8PathBuf,

    /// Number of raw notify events coalesced into this batch, relevant or not.
    pub raw_events: usize,

    /// Distinct relevant change kinds, in order of first appearance.
    pub kinds: SmallVec<[ChangeKind; 3]>,

    /// When the first event of the batch arrived.
    pub received_at: Instant,
}

impl ChangeBatch {
    /// Creates an empty batch for `path`, timestamped now.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf) -> Self {
        Self {
            path,
            raw_events: 0,
            kinds: SmallVec::new(),
            received_at: Instant::now(),
        }
    }

    /// Counts one raw event that did not concern the watched file.
    #[inline]
    pub fn record_ignored(&mut self) {
        self.raw_events += 1;
    }

    /// Counts one raw event of the given relevant kind.
    pub fn record(&mut self, kind: ChangeKind) {
        self.raw_events += 1;
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
    }

    /// Returns `true` if at least one relevant event was recorded.
    #[inline]
    #[must_use]
    pub fn is_relevant(&self) -> bool {
        !self.kinds.is_empty()
    }

    /// Returns `true` if the event source overflowed during this batch.
    #[inline]
    #[must_use]
    pub fn is_overflow(&self) -> bool {
        self.kinds.contains(&ChangeKind::Rescan)
    }
}

/// A message from the watcher's background loop.
#[derive(Debug, Clone)]
pub enum WatchSignal {
    /// The watched file changed at least once.
    Changed(ChangeBatch),

    /// The loop terminated; no further signals follow.
    Failed(WatchError),
}

impl WatchSignal {
    /// Returns `true` for [`WatchSignal::Failed`].
    #[inline]
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
