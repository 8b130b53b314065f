//! # Record Store Adapter
//!
//! Narrow contract over the transactional store. The batch runtime consumes
//! the store exclusively through [`RecordStore`]: filtered cursor queries,
//! one paged query, bulk inserts and conditional updates. The relational
//! engine behind it is an external collaborator.
//!
//! Two implementations ship with the crate:
//!
//! - [`memory::MemoryStore`]: in-process tables behind `parking_lot` locks,
//!   used by the test suite and local experimentation.
//! - [`postgres::PgStore`]: sqlx/PostgreSQL, used by the scheduled runner.
//!
//! Every mutation method is atomic: a bulk insert either applies all rows or
//! none. One writer call per chunk is therefore one commit boundary.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::stream::{BoxStream, StreamExt};

use crate::error::Result;
use crate::models::{Booking, BulkPass, Notification, NotificationEvent, Pass, UserGroupMapping};

/// One open, ordered, strictly sequential server-side query.
///
/// Holds position state; interleaved advancement corrupts it, so a cursor
/// must never be polled by more than one caller at a time. Wrap the reader
/// in [`SynchronizedReader`](crate::batch::SynchronizedReader) before
/// sharing it across step workers.
pub struct RecordCursor<T> {
    stream: BoxStream<'static, Result<T>>,
}

impl<T: Send + 'static> RecordCursor<T> {
    pub fn new(stream: BoxStream<'static, Result<T>>) -> Self {
        Self { stream }
    }

    /// Cursor over an already-materialized, ordered snapshot.
    pub fn from_records(records: Vec<T>) -> Self {
        Self {
            stream: futures::stream::iter(records.into_iter().map(Ok)).boxed(),
        }
    }

    /// Advance the cursor. `Ok(None)` is terminal.
    pub async fn next(&mut self) -> Result<Option<T>> {
        self.stream.next().await.transpose()
    }
}

impl<T> std::fmt::Debug for RecordCursor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RecordCursor")
    }
}

/// One bulk pass resolved into its per-member passes, persisted as a unit
/// by [`RecordStore::grant_passes`].
#[derive(Debug, Clone)]
pub struct PassGrant {
    pub bulk_pass_id: i64,
    pub passes: Vec<Pass>,
}

/// Read/write/update contract the pipelines depend on.
///
/// Cursor methods open an ordered query (immutable primary key order, so
/// offsets and positions stay stable under concurrent mutation); page
/// methods re-issue a filtered query per page and must be driven with a
/// point-in-time filter captured once per run.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Ordered cursor over READY bulk passes whose window opened after
    /// `started_at_after`.
    async fn ready_bulk_pass_cursor(
        &self,
        started_at_after: NaiveDateTime,
    ) -> Result<RecordCursor<BulkPass>>;

    /// All memberships of one user group.
    async fn memberships(&self, user_group_id: &str) -> Result<Vec<UserGroupMapping>>;

    /// Persist one chunk of grants: insert the passes and flip each source
    /// bulk pass from READY to COMPLETED, all inside a single transaction.
    /// A grant whose bulk pass is no longer READY is skipped whole (another
    /// run already granted it). Returns passes inserted.
    async fn grant_passes(&self, grants: &[PassGrant], now: NaiveDateTime) -> Result<u64>;

    /// Ordered cursor over PROGRESSED passes whose window closed at or
    /// before `as_of`.
    async fn expirable_pass_cursor(&self, as_of: NaiveDateTime) -> Result<RecordCursor<Pass>>;

    /// Persist updated pass rows (status sweep). Atomic; returns rows saved.
    async fn save_passes(&self, passes: &[Pass]) -> Result<u64>;

    /// One page of READY bookings starting at or before `starting_before`,
    /// ordered by id. The caller owns offset arithmetic.
    async fn bookings_page(
        &self,
        starting_before: NaiveDateTime,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Booking>>;

    /// Bulk-insert notification records, skipping rows that collide with an
    /// existing `(booking_id, event)` pair. Returns rows actually inserted.
    async fn insert_notifications(&self, notifications: &[Notification]) -> Result<u64>;

    /// Ordered cursor over unsent notifications for one event.
    async fn unsent_notification_cursor(
        &self,
        event: NotificationEvent,
    ) -> Result<RecordCursor<Notification>>;

    /// Mark one notification sent. Returns rows affected.
    async fn mark_notification_sent(
        &self,
        notification_id: i64,
        now: NaiveDateTime,
    ) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_drains_in_order_and_stays_terminal() {
        tokio_test::block_on(async {
            let mut cursor = RecordCursor::from_records(vec![1i64, 2, 3]);
            assert_eq!(cursor.next().await.unwrap(), Some(1));
            assert_eq!(cursor.next().await.unwrap(), Some(2));
            assert_eq!(cursor.next().await.unwrap(), Some(3));
            assert_eq!(cursor.next().await.unwrap(), None);
            assert_eq!(cursor.next().await.unwrap(), None);
        });
    }
}
