#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Passbatch Core
//!
//! Chunk-oriented batch engine for periodic, large-volume data maintenance
//! against a transactional store: bulk-pass fan-out, pass expiration, and
//! pre-class notification generation and dispatch.
//!
//! ## Architecture
//!
//! Every pipeline is a **job** of **chunk-oriented steps**: a reader pulls
//! records in bounded batches, a processor transforms them one by one, and
//! a writer commits each chunk as a single transactional unit. Committed
//! chunks are the checkpoint: a failed chunk aborts alone, and re-running
//! the job recovers the rest because every read predicate is status gated.
//!
//! ## Module Organization
//!
//! - [`batch`] - Job/step runtime, reader strategies, synchronized wrapper
//! - [`models`] - Pass, bulk pass, booking and notification entities
//! - [`store`] - Narrow record-store contract plus memory and Postgres backends
//! - [`jobs`] - The three scheduled pipelines
//! - [`delivery`] - Outbound message-delivery contract
//! - [`config`] - Runtime configuration
//! - [`error`] - Structured error taxonomy
//!
//! ## Quick Start
//!
//! ```rust
//! use passbatch_core::config::BatchConfig;
//! use passbatch_core::jobs::run_expiration_job;
//! use passbatch_core::store::memory::MemoryStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = BatchConfig::default();
//! let store = Arc::new(MemoryStore::new());
//!
//! let execution = run_expiration_job(store, &config, None).await;
//! assert!(execution.is_completed());
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod delivery;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod store;

pub use batch::{
    ChunkStep, CursorReader, ItemProcessor, ItemReader, ItemWriter, Job, JobExecution, JobStatus,
    PagingReader, Step, StepExecution, StepStatus, SynchronizedReader,
};
pub use config::{BatchConfig, DeliveryConfig};
pub use error::{BatchError, Result};
