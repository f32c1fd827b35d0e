//! Single-file watching with change coalescing and async notifications.
//!
//! This crate watches one refuel log for modifications via the `notify`
//! crate and reports them to an async tokio consumer.
//!
//! # Overview
//!
//! - The file's parent directory is watched non-recursively; events for
//!   sibling files are dropped at the source.
//! - Bursts of events (an editor save often produces several) are coalesced
//!   into one [`ChangeBatch`] once a full poll interval passes without events.
//! - Overflow / rescan events count as a change.
//! - Failures end the watch with a final [`WatchSignal::Failed`]; they never
//!   panic or take down the process.
//!
//! # Crate Dependencies
//!
//! ```text
//! rf-cli ──► rf-pipeline ──► rf-watcher ──► rf-core
//!                        └─────────────────►
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use rf_watcher::{FileWatcher, WatchSignal};
//! use rf_core::WatchConfig;
//! use camino::Utf8Path;
//! use tokio::time::{interval, Duration};
//!
//! # async fn example() -> Result<(), rf_watcher::WatchError> {
//! let config = WatchConfig::default();
//! let mut watcher = FileWatcher::new(Utf8Path::new("refuel.txt"), &config).await?;
//! let mut tick = interval(Duration::from_secs(1));
//!
//! loop {
//!     tokio::select! {
//!         Some(signal) = watcher.recv() => match signal {
//!             WatchSignal::Changed(batch) => println!("reload {}", batch.path),
//!             WatchSignal::Failed(error) => return Err(error),
//!         },
//!         _ = tick.tick() => {}
//!     }
//! }
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod watcher;

pub use error::WatchError;
pub use events::{ChangeBatch, ChangeKind, WatchSignal};
pub use filter::{FileFilter, FileNameFilter};
pub use watcher::FileWatcher;
