//! # Chunk-Oriented Batch Runtime
//!
//! The execution model every pipeline shares: a [`Job`] is an ordered list
//! of steps, a [`ChunkStep`] drives reader → processor → writer in
//! fixed-size chunks, and each chunk is committed by a single writer call
//! before the next chunk is pulled.
//!
//! ## Reader strategies
//!
//! - [`PagingReader`] re-issues a filtered, offset-based query per page.
//!   Snapshot-inconsistent under concurrent mutation of the filtered set;
//!   callers anchor the filter to a point in time captured once per run and
//!   order by an immutable key.
//! - [`CursorReader`] holds one open ordered query and yields records
//!   strictly sequentially. Not safe for concurrent callers on its own;
//!   [`SynchronizedReader`] serializes access when a step runs multi-worker.
//!
//! ## Checkpointing
//!
//! A failed chunk rolls back alone; chunks committed before it stand. A
//! re-run of the job is the recovery mechanism, and the pipelines keep
//! their read predicates status-gated so already-processed records no
//! longer match.

pub mod item;
pub mod job;
pub mod reader;
pub mod step;
pub mod sync_reader;

pub use item::{ItemProcessor, ItemReader, ItemWriter, PassThroughProcessor};
pub use job::{Job, JobExecution, JobStatus};
pub use reader::{CursorOpener, CursorReader, PageFetcher, PagingReader};
pub use step::{ChunkStep, Step, StepExecution, StepStatus};
pub use sync_reader::SynchronizedReader;
