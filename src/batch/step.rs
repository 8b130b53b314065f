//! # Chunk-Oriented Step Executor
//!
//! Drives reader → processor → writer in fixed-size chunks. Each chunk is
//! read, transformed and committed by one writer call before the next chunk
//! is pulled; a failed chunk aborts alone and fails the step, while
//! previously committed chunks stand as the checkpoint.
//!
//! A step runs single-threaded by default. With `with_workers(n)` it spawns
//! a bounded pool of exactly `n` tokio tasks that each run the chunk loop
//! against the same [`SynchronizedReader`](crate::batch::SynchronizedReader);
//! chunk commits are then per-worker and carry no cross-worker ordering.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::batch::item::{ItemProcessor, ItemReader, ItemWriter};
use crate::batch::sync_reader::SynchronizedReader;
use crate::error::{BatchError, Result};

/// Terminal state of one step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Failed,
}

/// Outcome and counters of one step execution.
#[derive(Debug, Clone, PartialEq)]
pub struct StepExecution {
    pub step_name: String,
    pub status: StepStatus,
    /// Records pulled from the reader.
    pub read_count: u64,
    /// Records handed to the writer in committed chunks.
    pub write_count: u64,
    /// Records the processor dropped.
    pub skip_count: u64,
    /// Chunks committed; the durable checkpoint under failure.
    pub chunks_committed: u64,
    pub error: Option<BatchError>,
}

impl StepExecution {
    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

/// One reader → processor → writer pipeline stage within a job.
#[async_trait]
pub trait Step: Send {
    fn name(&self) -> &str;

    /// Run the step to completion or first chunk failure.
    async fn execute(&mut self) -> StepExecution;
}

#[derive(Default)]
struct StepCounters {
    read: AtomicU64,
    written: AtomicU64,
    skipped: AtomicU64,
    chunks: AtomicU64,
}

/// Chunk-oriented [`Step`] over explicit reader/processor/writer instances.
///
/// Construction is explicit; there is no container wiring components
/// together behind the scenes:
///
/// ```rust
/// use passbatch_core::batch::{ChunkStep, CursorReader, PassThroughProcessor};
/// # use passbatch_core::batch::ItemWriter;
/// # use passbatch_core::error::Result;
/// # use passbatch_core::store::RecordCursor;
/// # use std::sync::Arc;
/// # struct Discard;
/// # #[async_trait::async_trait]
/// # impl ItemWriter<i64> for Discard {
/// #     async fn write(&self, _items: Vec<i64>) -> Result<()> { Ok(()) }
/// # }
/// let reader = CursorReader::from_cursor(RecordCursor::from_records(vec![1i64, 2, 3]));
/// let step = ChunkStep::new(
///     "sweep",
///     reader,
///     Arc::new(PassThroughProcessor::new()),
///     Arc::new(Discard),
/// )
/// .with_chunk_size(10);
/// ```
pub struct ChunkStep<R, I, O> {
    name: String,
    reader: Option<R>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Arc<dyn ItemWriter<O>>,
    chunk_size: usize,
    workers: usize,
    cancellation: Arc<AtomicBool>,
}

impl<R, I, O> ChunkStep<R, I, O>
where
    R: ItemReader<I> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new(
        name: impl Into<String>,
        reader: R,
        processor: Arc<dyn ItemProcessor<I, O>>,
        writer: Arc<dyn ItemWriter<O>>,
    ) -> Self {
        Self {
            name: name.into(),
            reader: Some(reader),
            processor,
            writer,
            chunk_size: 10,
            workers: 1,
            cancellation: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0);
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Bounded worker count. Anything above 1 wraps the reader in a
    /// [`SynchronizedReader`] and runs one chunk loop per worker.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// External cancellation flag, honored only at chunk boundaries; the
    /// chunk in flight always runs to its commit.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation = flag;
        self
    }

    async fn run(&mut self, counters: &Arc<StepCounters>) -> Result<()> {
        let reader = self.reader.take().ok_or_else(|| {
            BatchError::Concurrency(format!("step '{}' was already executed", self.name))
        })?;

        if self.workers == 1 {
            run_worker(
                reader,
                Arc::clone(&self.processor),
                Arc::clone(&self.writer),
                self.chunk_size,
                Arc::clone(&self.cancellation),
                Arc::clone(counters),
            )
            .await?;
        } else {
            let shared = SynchronizedReader::new(reader);
            let mut handles = Vec::with_capacity(self.workers);
            for worker in 0..self.workers {
                let reader = shared.clone();
                let processor = Arc::clone(&self.processor);
                let writer = Arc::clone(&self.writer);
                let cancellation = Arc::clone(&self.cancellation);
                let counters = Arc::clone(counters);
                let chunk_size = self.chunk_size;
                let step_name = self.name.clone();
                handles.push(tokio::spawn(async move {
                    debug!(step = %step_name, worker, "chunk worker started");
                    run_worker(reader, processor, writer, chunk_size, cancellation, counters)
                        .await
                }));
            }

            // All workers are joined even after a failure so no task is left
            // advancing the shared cursor; the first error wins.
            let mut first_error: Option<BatchError> = None;
            for handle in handles {
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        if first_error.is_none() {
                            first_error = Some(err);
                        }
                    }
                    Err(join_err) => {
                        if first_error.is_none() {
                            first_error = Some(BatchError::Concurrency(format!(
                                "chunk worker panicked: {join_err}"
                            )));
                        }
                    }
                }
            }
            if let Some(err) = first_error {
                return Err(err);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<R, I, O> Step for ChunkStep<R, I, O>
where
    R: ItemReader<I> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&mut self) -> StepExecution {
        info!(step = %self.name, workers = self.workers, chunk_size = self.chunk_size, "step starting");
        let counters = Arc::new(StepCounters::default());
        let outcome = self.run(&counters).await;

        // Counters survive a failure: they describe the committed chunks.
        let mut execution = StepExecution {
            step_name: self.name.clone(),
            status: StepStatus::Completed,
            read_count: counters.read.load(Ordering::Relaxed),
            write_count: counters.written.load(Ordering::Relaxed),
            skip_count: counters.skipped.load(Ordering::Relaxed),
            chunks_committed: counters.chunks.load(Ordering::Relaxed),
            error: None,
        };

        match outcome {
            Ok(()) => {
                info!(
                    step = %self.name,
                    read_count = execution.read_count,
                    write_count = execution.write_count,
                    skip_count = execution.skip_count,
                    chunks_committed = execution.chunks_committed,
                    "step completed"
                );
            }
            Err(err) => {
                error!(step = %self.name, error = %err, "step failed");
                execution.status = StepStatus::Failed;
                execution.error = Some(err);
            }
        }
        execution
    }
}

/// The sequential chunk loop, run once per worker.
async fn run_worker<R, I, O>(
    mut reader: R,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Arc<dyn ItemWriter<O>>,
    chunk_size: usize,
    cancellation: Arc<AtomicBool>,
    counters: Arc<StepCounters>,
) -> Result<()>
where
    R: ItemReader<I> + Send,
    I: Send,
    O: Send,
{
    loop {
        if cancellation.load(Ordering::Relaxed) {
            debug!("cancellation observed at chunk boundary");
            return Ok(());
        }

        let mut chunk = Vec::with_capacity(chunk_size);
        let mut end_of_sequence = false;
        while chunk.len() < chunk_size {
            match reader.read().await? {
                Some(item) => chunk.push(item),
                None => {
                    end_of_sequence = true;
                    break;
                }
            }
        }

        if chunk.is_empty() {
            return Ok(());
        }
        counters.read.fetch_add(chunk.len() as u64, Ordering::Relaxed);

        let mut outputs = Vec::with_capacity(chunk.len());
        for item in chunk {
            match processor.process(item).await? {
                Some(output) => outputs.push(output),
                None => {
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        if !outputs.is_empty() {
            let written = outputs.len() as u64;
            writer.write(outputs).await?;
            counters.written.fetch_add(written, Ordering::Relaxed);
        }
        counters.chunks.fetch_add(1, Ordering::Relaxed);

        if end_of_sequence {
            return Ok(());
        }
    }
}
