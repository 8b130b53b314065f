//! # Pass Expiration Sweep
//!
//! Flips PROGRESSED passes whose validity window has elapsed to EXPIRED.
//! The sweep instant is captured once at job start and used both in the
//! cursor predicate and as `expired_at`, so every chunk of one run agrees
//! on the boundary. Re-running after a full sweep matches no rows.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use futures::FutureExt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::batch::{ChunkStep, CursorReader, ItemProcessor, ItemWriter, Job, JobExecution};
use crate::config::BatchConfig;
use crate::error::Result;
use crate::models::{Pass, PassStatus};
use crate::store::RecordStore;

pub const JOB_NAME: &str = "expire-passes-job";
pub const STEP_NAME: &str = "expire-passes-step";

/// Marks one pass expired as of the sweep's capture instant.
pub struct ExpirationProcessor {
    now: NaiveDateTime,
}

impl ExpirationProcessor {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }
}

#[async_trait]
impl ItemProcessor<Pass, Pass> for ExpirationProcessor {
    async fn process(&self, mut pass: Pass) -> Result<Option<Pass>> {
        pass.status = PassStatus::Expired;
        pass.expired_at = Some(self.now);
        pass.modified_at = self.now;
        Ok(Some(pass))
    }
}

/// Persists the chunk's swept passes in one store mutation.
pub struct SavePassesWriter {
    store: Arc<dyn RecordStore>,
}

impl SavePassesWriter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ItemWriter<Pass> for SavePassesWriter {
    async fn write(&self, passes: Vec<Pass>) -> Result<()> {
        self.store.save_passes(&passes).await?;
        Ok(())
    }
}

/// Run the expiration sweep over all passes whose window closed by now.
/// The cancellation flag, when provided, stops the run at the next chunk
/// boundary.
pub async fn run_expiration_job(
    store: Arc<dyn RecordStore>,
    config: &BatchConfig,
    cancellation: Option<Arc<AtomicBool>>,
) -> JobExecution {
    let now = Utc::now().naive_utc();

    let cursor_store = Arc::clone(&store);
    let reader = CursorReader::new(Box::new(move || {
        async move { cursor_store.expirable_pass_cursor(now).await }.boxed()
    }));

    let step = ChunkStep::new(
        STEP_NAME,
        reader,
        Arc::new(ExpirationProcessor::new(now)),
        Arc::new(SavePassesWriter::new(store)),
    )
    .with_chunk_size(config.chunk_size)
    .with_cancellation(cancellation.unwrap_or_default());

    Job::new(JOB_NAME).with_step(step).run().await
}
