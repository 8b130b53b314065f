//! # Pre-Class Notification Pipeline
//!
//! Two steps, mirroring the scheduled "before class" run:
//!
//! 1. **Generate**: page over READY bookings starting inside the
//!    notification horizon and insert one unsent notification per booking.
//!    The store's `(booking_id, event)` unique index absorbs re-runs inside
//!    the same horizon.
//! 2. **Dispatch**: stream unsent notifications through the delivery
//!    collaborator with a bounded worker pool. The cursor is wrapped in a
//!    [`SynchronizedReader`](crate::batch::SynchronizedReader) by the step,
//!    and a failed delivery leaves the record unsent for the next run
//!    instead of failing the step.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use futures::FutureExt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

use crate::batch::{
    ChunkStep, CursorReader, ItemProcessor, ItemWriter, Job, JobExecution, PagingReader,
    PassThroughProcessor, Step,
};
use crate::config::BatchConfig;
use crate::delivery::DeliveryClient;
use crate::error::Result;
use crate::models::{Booking, Notification, NotificationEvent};
use crate::store::RecordStore;

pub const JOB_NAME: &str = "send-notification-before-class-job";
pub const GENERATION_STEP_NAME: &str = "add-notification-step";
pub const DISPATCH_STEP_NAME: &str = "send-notification-step";

/// Maps one qualifying booking onto its unsent pre-class notification.
pub struct BeforeClassProcessor {
    now: NaiveDateTime,
}

impl BeforeClassProcessor {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }
}

#[async_trait]
impl ItemProcessor<Booking, Notification> for BeforeClassProcessor {
    async fn process(&self, booking: Booking) -> Result<Option<Notification>> {
        Ok(Some(Notification::before_class(&booking, self.now)))
    }
}

/// Bulk-inserts the chunk's notifications; duplicates on
/// `(booking_id, event)` are skipped by the store.
pub struct InsertNotificationsWriter {
    store: Arc<dyn RecordStore>,
}

impl InsertNotificationsWriter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ItemWriter<Notification> for InsertNotificationsWriter {
    async fn write(&self, notifications: Vec<Notification>) -> Result<()> {
        self.store.insert_notifications(&notifications).await?;
        Ok(())
    }
}

/// Sends each notification and marks it sent after a successful attempt.
///
/// Delivery failures are recovered locally: the record stays unsent and the
/// error never escalates to the step. Only a store failure while flipping
/// `sent` aborts the chunk.
pub struct DispatchWriter {
    store: Arc<dyn RecordStore>,
    delivery: Arc<dyn DeliveryClient>,
}

impl DispatchWriter {
    pub fn new(store: Arc<dyn RecordStore>, delivery: Arc<dyn DeliveryClient>) -> Self {
        Self { store, delivery }
    }
}

#[async_trait]
impl ItemWriter<Notification> for DispatchWriter {
    async fn write(&self, notifications: Vec<Notification>) -> Result<()> {
        for notification in notifications {
            match self
                .delivery
                .send(&notification.user_id, &notification.text)
                .await
            {
                Ok(()) => {
                    let now = Utc::now().naive_utc();
                    self.store
                        .mark_notification_sent(notification.id, now)
                        .await?;
                }
                Err(err) => {
                    warn!(
                        notification_id = notification.id,
                        user_id = %notification.user_id,
                        error = %err,
                        "delivery failed; record left unsent for the next run"
                    );
                }
            }
        }
        Ok(())
    }
}

fn generation_step(
    store: Arc<dyn RecordStore>,
    config: &BatchConfig,
    now: NaiveDateTime,
    cancellation: Arc<AtomicBool>,
) -> impl Step + 'static {
    // Horizon computed once; every page of this run sees the same boundary.
    let starting_before = now + Duration::minutes(config.notification_horizon_minutes);

    let page_store = Arc::clone(&store);
    let reader = PagingReader::new(
        config.chunk_size as u64,
        Box::new(move |offset, limit| {
            let store = Arc::clone(&page_store);
            async move { store.bookings_page(starting_before, offset, limit).await }.boxed()
        }),
    );

    ChunkStep::new(
        GENERATION_STEP_NAME,
        reader,
        Arc::new(BeforeClassProcessor::new(now)),
        Arc::new(InsertNotificationsWriter::new(store)),
    )
    .with_chunk_size(config.chunk_size)
    .with_cancellation(cancellation)
}

fn dispatch_step(
    store: Arc<dyn RecordStore>,
    delivery: Arc<dyn DeliveryClient>,
    config: &BatchConfig,
    cancellation: Arc<AtomicBool>,
) -> impl Step + 'static {
    let cursor_store = Arc::clone(&store);
    let reader = CursorReader::new(Box::new(move || {
        async move {
            cursor_store
                .unsent_notification_cursor(NotificationEvent::BeforeClass)
                .await
        }
        .boxed()
    }));

    ChunkStep::new(
        DISPATCH_STEP_NAME,
        reader,
        Arc::new(PassThroughProcessor::new()),
        Arc::new(DispatchWriter::new(store, delivery)),
    )
    .with_chunk_size(config.chunk_size)
    .with_workers(config.dispatch_workers)
    .with_cancellation(cancellation)
}

/// Generate and dispatch in one run, the shape of the scheduled job. The
/// cancellation flag, when provided, stops the run at the next chunk
/// boundary of either step.
pub async fn run_notification_job(
    store: Arc<dyn RecordStore>,
    delivery: Arc<dyn DeliveryClient>,
    config: &BatchConfig,
    cancellation: Option<Arc<AtomicBool>>,
) -> JobExecution {
    let now = Utc::now().naive_utc();
    let cancellation = cancellation.unwrap_or_default();
    Job::new(JOB_NAME)
        .with_step(generation_step(
            Arc::clone(&store),
            config,
            now,
            Arc::clone(&cancellation),
        ))
        .with_step(dispatch_step(store, delivery, config, cancellation))
        .run()
        .await
}

/// Generation only: create unsent notifications for the current horizon.
pub async fn run_notification_generation_job(
    store: Arc<dyn RecordStore>,
    config: &BatchConfig,
    cancellation: Option<Arc<AtomicBool>>,
) -> JobExecution {
    let now = Utc::now().naive_utc();
    Job::new("add-notification-job")
        .with_step(generation_step(
            store,
            config,
            now,
            cancellation.unwrap_or_default(),
        ))
        .run()
        .await
}

/// Dispatch only: push every unsent notification through delivery.
pub async fn run_notification_dispatch_job(
    store: Arc<dyn RecordStore>,
    delivery: Arc<dyn DeliveryClient>,
    config: &BatchConfig,
    cancellation: Option<Arc<AtomicBool>>,
) -> JobExecution {
    Job::new("send-notification-job")
        .with_step(dispatch_step(
            store,
            delivery,
            config,
            cancellation.unwrap_or_default(),
        ))
        .run()
        .await
}
