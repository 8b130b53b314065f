//! # Bulk Pass Fan-Out
//!
//! Expands one READY bulk purchase into one entitlement per member of its
//! user group. The writer persists each chunk through a single atomic store
//! operation that inserts the granted passes and flips their source bulk
//! passes to COMPLETED together, so a failed chunk leaves no half-granted
//! bulk pass behind and a re-run of the job grants nothing twice.

use chrono::{Duration, NaiveDateTime, Utc};
use futures::FutureExt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::batch::{ChunkStep, CursorReader, ItemProcessor, ItemWriter, Job, JobExecution};
use crate::config::BatchConfig;
use crate::error::Result;
use crate::models::{BulkPass, Pass};
use crate::store::{PassGrant, RecordStore};

pub const JOB_NAME: &str = "add-passes-job";
pub const STEP_NAME: &str = "add-passes-step";

/// Resolves group memberships and maps each member onto a fresh pass.
pub struct FanOutProcessor {
    store: Arc<dyn RecordStore>,
    now: NaiveDateTime,
}

impl FanOutProcessor {
    pub fn new(store: Arc<dyn RecordStore>, now: NaiveDateTime) -> Self {
        Self { store, now }
    }
}

#[async_trait]
impl ItemProcessor<BulkPass, PassGrant> for FanOutProcessor {
    async fn process(&self, bulk_pass: BulkPass) -> Result<Option<PassGrant>> {
        let members = self.store.memberships(&bulk_pass.user_group_id).await?;
        if members.is_empty() {
            warn!(
                bulk_pass_id = bulk_pass.id,
                user_group_id = %bulk_pass.user_group_id,
                "bulk pass targets an empty group; completing without grants"
            );
        }

        let passes = members
            .iter()
            .map(|member| Pass::from_bulk_pass(&bulk_pass, &member.user_id, self.now))
            .collect();

        Ok(Some(PassGrant {
            bulk_pass_id: bulk_pass.id,
            passes,
        }))
    }
}

/// Commits the chunk's grants through one atomic store operation.
pub struct FanOutWriter {
    store: Arc<dyn RecordStore>,
    now: NaiveDateTime,
}

impl FanOutWriter {
    pub fn new(store: Arc<dyn RecordStore>, now: NaiveDateTime) -> Self {
        Self { store, now }
    }
}

#[async_trait]
impl ItemWriter<PassGrant> for FanOutWriter {
    async fn write(&self, grants: Vec<PassGrant>) -> Result<()> {
        let bulk_passes = grants.len();
        let inserted = self.store.grant_passes(&grants, self.now).await?;

        info!(
            bulk_passes,
            passes_granted = inserted,
            "fan-out chunk committed"
        );
        Ok(())
    }
}

/// Run the fan-out job: READY bulk passes whose window opened inside the
/// configured lookback are expanded member by member. The cancellation
/// flag, when provided, stops the run at the next chunk boundary.
pub async fn run_fan_out_job(
    store: Arc<dyn RecordStore>,
    config: &BatchConfig,
    cancellation: Option<Arc<AtomicBool>>,
) -> JobExecution {
    let now = Utc::now().naive_utc();
    let started_at_after = now - Duration::hours(config.fan_out_lookback_hours);

    let cursor_store = Arc::clone(&store);
    let reader = CursorReader::new(Box::new(move || {
        async move { cursor_store.ready_bulk_pass_cursor(started_at_after).await }.boxed()
    }));

    let step = ChunkStep::new(
        STEP_NAME,
        reader,
        Arc::new(FanOutProcessor::new(Arc::clone(&store), now)),
        Arc::new(FanOutWriter::new(store, now)),
    )
    .with_chunk_size(config.chunk_size)
    .with_cancellation(cancellation.unwrap_or_default());

    Job::new(JOB_NAME).with_step(step).run().await
}
