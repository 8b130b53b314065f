//! Chunk commit boundaries: sizes, checkpointing, and failure isolation.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use passbatch_core::batch::{
    ChunkStep, CursorReader, ItemWriter, PassThroughProcessor, Step, StepStatus,
};
use passbatch_core::error::{BatchError, Result};
use passbatch_core::store::RecordCursor;

/// Writer that commits chunks into memory, optionally failing on the n-th
/// call. A failed call applies nothing, like a rolled-back transaction.
struct ChunkRecordingWriter {
    committed: Mutex<Vec<Vec<i64>>>,
    fail_on_call: Option<usize>,
}

impl ChunkRecordingWriter {
    fn new() -> Self {
        Self {
            committed: Mutex::new(Vec::new()),
            fail_on_call: None,
        }
    }

    fn failing_on(call: usize) -> Self {
        Self {
            committed: Mutex::new(Vec::new()),
            fail_on_call: Some(call),
        }
    }

    fn committed_chunks(&self) -> Vec<Vec<i64>> {
        self.committed.lock().clone()
    }
}

#[async_trait]
impl ItemWriter<i64> for ChunkRecordingWriter {
    async fn write(&self, items: Vec<i64>) -> Result<()> {
        let mut committed = self.committed.lock();
        if self.fail_on_call == Some(committed.len() + 1) {
            return Err(BatchError::StoreWrite("forced chunk failure".to_string()));
        }
        committed.push(items);
        Ok(())
    }
}

fn step_over(records: i64, writer: Arc<ChunkRecordingWriter>) -> impl Step {
    let reader = CursorReader::from_cursor(RecordCursor::from_records((0..records).collect()));
    ChunkStep::new(
        "chunking",
        reader,
        Arc::new(PassThroughProcessor::new()),
        writer as Arc<dyn ItemWriter<i64>>,
    )
    .with_chunk_size(10)
}

#[tokio::test]
async fn twenty_five_records_commit_in_three_chunks() {
    let writer = Arc::new(ChunkRecordingWriter::new());
    let mut step = step_over(25, Arc::clone(&writer));

    let execution = step.execute().await;

    assert_eq!(execution.status, StepStatus::Completed);
    assert_eq!(execution.read_count, 25);
    assert_eq!(execution.write_count, 25);
    assert_eq!(execution.chunks_committed, 3);

    let sizes: Vec<usize> = writer.committed_chunks().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
}

#[tokio::test]
async fn failure_in_second_chunk_keeps_the_first_chunk_committed() {
    let writer = Arc::new(ChunkRecordingWriter::failing_on(2));
    let mut step = step_over(25, Arc::clone(&writer));

    let execution = step.execute().await;

    assert_eq!(execution.status, StepStatus::Failed);
    assert!(matches!(execution.error, Some(BatchError::StoreWrite(_))));

    // The first chunk is the durable checkpoint; the failed chunk applied
    // nothing and later chunks never ran.
    let committed: Vec<i64> = writer.committed_chunks().into_iter().flatten().collect();
    assert_eq!(committed, (0..10).collect::<Vec<i64>>());
}

#[tokio::test]
async fn chunk_size_aligned_input_commits_exactly() {
    let writer = Arc::new(ChunkRecordingWriter::new());
    let mut step = step_over(20, Arc::clone(&writer));

    let execution = step.execute().await;

    assert_eq!(execution.status, StepStatus::Completed);
    assert_eq!(execution.chunks_committed, 2);
    let sizes: Vec<usize> = writer.committed_chunks().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![10, 10]);
}
