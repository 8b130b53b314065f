//! # In-Memory Record Store
//!
//! Table-per-entity storage behind `parking_lot` locks. Mirrors the
//! transactional guarantees the runtime depends on: every mutation method
//! applies atomically under the write lock, cursors are ordered snapshots,
//! and the `(booking_id, event)` uniqueness of notifications is enforced by
//! default (it can be switched off to observe duplicate generation).

use chrono::NaiveDateTime;
use parking_lot::RwLock;
use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Booking, BookingStatus, BulkPass, BulkPassStatus, Notification, NotificationEvent, Pass,
    UserGroupMapping,
};
use crate::store::{PassGrant, RecordCursor, RecordStore};

#[derive(Default)]
struct Tables {
    bulk_passes: Vec<BulkPass>,
    memberships: Vec<UserGroupMapping>,
    passes: Vec<Pass>,
    bookings: Vec<Booking>,
    notifications: Vec<Notification>,
    next_id: i64,
}

impl Tables {
    fn assign_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process [`RecordStore`] used by the test suite.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    enforce_notification_index: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Store with the `(booking_id, event)` unique index enforced.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            enforce_notification_index: true,
        }
    }

    /// Store without the notification unique index, reproducing a schema
    /// where duplicate generation is observable.
    pub fn without_notification_index() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            enforce_notification_index: false,
        }
    }

    // Seed helpers for tests; ids are assigned the same way inserts do.

    pub fn add_bulk_pass(&self, mut bulk_pass: BulkPass) -> i64 {
        let mut tables = self.tables.write();
        bulk_pass.id = tables.assign_id();
        let id = bulk_pass.id;
        tables.bulk_passes.push(bulk_pass);
        id
    }

    pub fn add_membership(&self, membership: UserGroupMapping) {
        self.tables.write().memberships.push(membership);
    }

    pub fn add_pass(&self, mut pass: Pass) -> i64 {
        let mut tables = self.tables.write();
        pass.id = tables.assign_id();
        let id = pass.id;
        tables.passes.push(pass);
        id
    }

    pub fn add_booking(&self, mut booking: Booking) -> i64 {
        let mut tables = self.tables.write();
        booking.id = tables.assign_id();
        let id = booking.id;
        tables.bookings.push(booking);
        id
    }

    pub fn add_notification(&self, mut notification: Notification) -> i64 {
        let mut tables = self.tables.write();
        notification.id = tables.assign_id();
        let id = notification.id;
        tables.notifications.push(notification);
        id
    }

    // Snapshot accessors for assertions.

    pub fn bulk_passes(&self) -> Vec<BulkPass> {
        self.tables.read().bulk_passes.clone()
    }

    pub fn passes(&self) -> Vec<Pass> {
        self.tables.read().passes.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.tables.read().notifications.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ready_bulk_pass_cursor(
        &self,
        started_at_after: NaiveDateTime,
    ) -> Result<RecordCursor<BulkPass>> {
        let mut matching: Vec<BulkPass> = self
            .tables
            .read()
            .bulk_passes
            .iter()
            .filter(|b| b.status == BulkPassStatus::Ready && b.started_at > started_at_after)
            .cloned()
            .collect();
        matching.sort_by_key(|b| b.id);
        Ok(RecordCursor::from_records(matching))
    }

    async fn memberships(&self, user_group_id: &str) -> Result<Vec<UserGroupMapping>> {
        Ok(self
            .tables
            .read()
            .memberships
            .iter()
            .filter(|m| m.user_group_id == user_group_id)
            .cloned()
            .collect())
    }

    async fn grant_passes(&self, grants: &[PassGrant], now: NaiveDateTime) -> Result<u64> {
        // One write-lock acquisition covers the whole chunk, so inserts and
        // the COMPLETED transitions apply as a unit.
        let mut tables = self.tables.write();
        let mut inserted = 0;
        for grant in grants {
            let claimed = match tables
                .bulk_passes
                .iter_mut()
                .find(|b| b.id == grant.bulk_pass_id && b.status == BulkPassStatus::Ready)
            {
                Some(bulk_pass) => {
                    bulk_pass.status = BulkPassStatus::Completed;
                    bulk_pass.modified_at = now;
                    true
                }
                None => false,
            };
            if !claimed {
                continue;
            }
            for pass in &grant.passes {
                let mut pass = pass.clone();
                pass.id = tables.assign_id();
                tables.passes.push(pass);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn expirable_pass_cursor(&self, as_of: NaiveDateTime) -> Result<RecordCursor<Pass>> {
        let mut matching: Vec<Pass> = self
            .tables
            .read()
            .passes
            .iter()
            .filter(|p| p.is_expirable(as_of))
            .cloned()
            .collect();
        matching.sort_by_key(|p| p.id);
        Ok(RecordCursor::from_records(matching))
    }

    async fn save_passes(&self, passes: &[Pass]) -> Result<u64> {
        let mut tables = self.tables.write();
        let mut saved = 0;
        for updated in passes {
            if let Some(existing) = tables.passes.iter_mut().find(|p| p.id == updated.id) {
                *existing = updated.clone();
                saved += 1;
            }
        }
        Ok(saved)
    }

    async fn bookings_page(
        &self,
        starting_before: NaiveDateTime,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Booking>> {
        let mut matching: Vec<Booking> = self
            .tables
            .read()
            .bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Ready && b.started_at <= starting_before)
            .cloned()
            .collect();
        matching.sort_by_key(|b| b.id);
        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn insert_notifications(&self, notifications: &[Notification]) -> Result<u64> {
        let mut tables = self.tables.write();
        let mut taken: HashSet<(i64, NotificationEvent)> = tables
            .notifications
            .iter()
            .map(|n| (n.booking_id, n.event))
            .collect();

        let mut inserted = 0;
        for notification in notifications {
            let key = (notification.booking_id, notification.event);
            if self.enforce_notification_index && !taken.insert(key) {
                continue;
            }
            let mut notification = notification.clone();
            notification.id = tables.assign_id();
            tables.notifications.push(notification);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn unsent_notification_cursor(
        &self,
        event: NotificationEvent,
    ) -> Result<RecordCursor<Notification>> {
        let mut matching: Vec<Notification> = self
            .tables
            .read()
            .notifications
            .iter()
            .filter(|n| n.event == event && !n.sent)
            .cloned()
            .collect();
        matching.sort_by_key(|n| n.id);
        Ok(RecordCursor::from_records(matching))
    }

    async fn mark_notification_sent(
        &self,
        notification_id: i64,
        now: NaiveDateTime,
    ) -> Result<u64> {
        let mut tables = self.tables.write();
        let mut affected = 0;
        for notification in tables
            .notifications
            .iter_mut()
            .filter(|n| n.id == notification_id && !n.sent)
        {
            notification.sent = true;
            notification.sent_at = Some(now);
            notification.modified_at = now;
            affected += 1;
        }
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PassStatus;
    use chrono::{Duration, Utc};

    fn notification(booking_id: i64, now: NaiveDateTime) -> Notification {
        Notification {
            id: 0,
            booking_id,
            user_id: "A1000000".to_string(),
            event: NotificationEvent::BeforeClass,
            text: "test".to_string(),
            sent: false,
            sent_at: None,
            created_at: now,
            modified_at: now,
        }
    }

    #[tokio::test]
    async fn unique_index_skips_duplicate_notifications() {
        let store = MemoryStore::new();
        let now = Utc::now().naive_utc();

        assert_eq!(
            store
                .insert_notifications(&[notification(1, now), notification(1, now)])
                .await
                .unwrap(),
            1
        );
        assert_eq!(store.insert_notifications(&[notification(1, now)]).await.unwrap(), 0);
        assert_eq!(store.notifications().len(), 1);
    }

    #[tokio::test]
    async fn without_index_duplicates_are_stored() {
        let store = MemoryStore::without_notification_index();
        let now = Utc::now().naive_utc();

        store.insert_notifications(&[notification(1, now)]).await.unwrap();
        store.insert_notifications(&[notification(1, now)]).await.unwrap();
        assert_eq!(store.notifications().len(), 2);
    }

    #[tokio::test]
    async fn mark_notification_sent_is_conditional() {
        let store = MemoryStore::new();
        let now = Utc::now().naive_utc();
        let id = store.add_notification(notification(1, now));

        assert_eq!(store.mark_notification_sent(id, now).await.unwrap(), 1);
        // Already sent: no-op.
        assert_eq!(store.mark_notification_sent(id, now).await.unwrap(), 0);

        let stored = store.notifications().pop().unwrap();
        assert!(stored.sent);
        assert_eq!(stored.sent_at, Some(now));
    }

    #[tokio::test]
    async fn expirable_cursor_filters_by_status_and_window() {
        let store = MemoryStore::new();
        let now = Utc::now().naive_utc();

        let base = Pass {
            id: 0,
            package_id: 1,
            user_id: "A1000000".to_string(),
            status: PassStatus::Progressed,
            remaining_count: 5,
            started_at: now - Duration::days(60),
            ended_at: now - Duration::days(1),
            expired_at: None,
            created_at: now,
            modified_at: now,
        };
        store.add_pass(base.clone());
        store.add_pass(Pass {
            status: PassStatus::Ready,
            ..base.clone()
        });
        store.add_pass(Pass {
            ended_at: now + Duration::days(1),
            ..base.clone()
        });

        let mut cursor = store.expirable_pass_cursor(now).await.unwrap();
        let first = cursor.next().await.unwrap().unwrap();
        assert_eq!(first.status, PassStatus::Progressed);
        assert!(cursor.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn grant_passes_inserts_and_completes_as_a_unit() {
        let store = MemoryStore::new();
        let now = Utc::now().naive_utc();
        let bulk = BulkPass {
            id: 0,
            package_id: 1,
            user_group_id: "GROUP".to_string(),
            status: BulkPassStatus::Ready,
            count: 10,
            started_at: now,
            ended_at: now + Duration::days(60),
            created_at: now,
            modified_at: now,
        };
        let id = store.add_bulk_pass(bulk.clone());
        let grant = PassGrant {
            bulk_pass_id: id,
            passes: vec![
                Pass::from_bulk_pass(&bulk, "A1000000", now),
                Pass::from_bulk_pass(&bulk, "A1000001", now),
            ],
        };

        assert_eq!(store.grant_passes(&[grant.clone()], now).await.unwrap(), 2);
        assert_eq!(store.bulk_passes()[0].status, BulkPassStatus::Completed);
        assert_eq!(store.passes().len(), 2);

        // The bulk pass is no longer READY: the same grant applies nothing.
        assert_eq!(store.grant_passes(&[grant], now).await.unwrap(), 0);
        assert_eq!(store.passes().len(), 2);
    }
}
