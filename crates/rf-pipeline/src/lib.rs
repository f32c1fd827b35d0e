//! Ingestion pipeline for refuel logs.
//!
//! [`IngestionPipeline`] is the composition root of the workspace: it reads a
//! refuel log once, keeps its records as an immutable snapshot, starts a
//! [`FileWatcher`](rf_watcher::FileWatcher) on the file and re-derives
//! everything whenever the file changes. Presentation code plugs in through
//! [`PipelineObserver`] and pulls aggregates with
//! [`IngestionPipeline::request_aggregate`].
//!
//! # Concurrency
//!
//! The pipeline is a single-owner value driven from one async task. The
//! watcher runs on tokio's blocking pool and only talks to the pipeline
//! through [`WatchSignal`](rf_watcher::WatchSignal)s, which the owner pulls
//! with [`IngestionPipeline::next_signal`] and applies with
//! [`IngestionPipeline::handle_signal`].
//!
//! ```no_run
//! use rf_core::WatchConfig;
//! use rf_pipeline::{IngestionPipeline, NoopObserver};
//!
//! # async fn example() -> Result<(), rf_pipeline::PipelineError> {
//! let mut pipeline = IngestionPipeline::new(WatchConfig::default(), NoopObserver);
//! pipeline.load_file("refuel.txt").await?;
//!
//! tokio::select! {
//!     signal = pipeline.next_signal() => {
//!         pipeline.handle_signal(signal).await?;
//!     }
//!     _ = tokio::signal::ctrl_c() => {}
//! }
//!
//! pipeline.reset().await;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod observer;
pub mod pipeline;

pub use error::PipelineError;
pub use observer::{NoopObserver, PipelineObserver};
pub use pipeline::{IngestionPipeline, LoadReport, PipelineState, WatchStatus};
