//! # PostgreSQL Record Store
//!
//! sqlx-backed implementation of [`RecordStore`] used by the scheduled
//! runner. Bulk mutations run inside one transaction each, so a chunk's
//! writer call commits or rolls back as a unit. Cursor queries order by the
//! immutable primary key; the matching row set of one run is bounded, so a
//! cursor materializes its snapshot up front and streams from it.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::{BatchError, Result};
use crate::models::{
    Booking, BookingStatus, BulkPass, BulkPassStatus, Notification, NotificationEvent, Pass,
    PassStatus, UserGroupMapping,
};
use crate::store::{PassGrant, RecordCursor, RecordStore};

fn read_err(err: sqlx::Error) -> BatchError {
    BatchError::StoreRead(err.to_string())
}

fn write_err(err: sqlx::Error) -> BatchError {
    BatchError::StoreWrite(err.to_string())
}

/// PostgreSQL-backed [`RecordStore`].
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(read_err)?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn ready_bulk_pass_cursor(
        &self,
        started_at_after: NaiveDateTime,
    ) -> Result<RecordCursor<BulkPass>> {
        let rows = sqlx::query_as::<_, BulkPass>(
            "SELECT id, package_id, user_group_id, status, count, started_at, ended_at,
                    created_at, modified_at
               FROM bulk_pass
              WHERE status = $1 AND started_at > $2
              ORDER BY id",
        )
        .bind(BulkPassStatus::Ready)
        .bind(started_at_after)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        Ok(RecordCursor::from_records(rows))
    }

    async fn memberships(&self, user_group_id: &str) -> Result<Vec<UserGroupMapping>> {
        sqlx::query_as::<_, UserGroupMapping>(
            "SELECT user_group_id, user_id, user_group_name, description,
                    created_at, modified_at
               FROM user_group_mapping
              WHERE user_group_id = $1
              ORDER BY user_id",
        )
        .bind(user_group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)
    }

    async fn grant_passes(&self, grants: &[PassGrant], now: NaiveDateTime) -> Result<u64> {
        // One transaction for the chunk: the COMPLETED transition and the
        // inserted passes commit together or not at all.
        let mut tx = self.pool.begin().await.map_err(write_err)?;
        let mut inserted = 0;
        for grant in grants {
            let claimed = sqlx::query(
                "UPDATE bulk_pass
                    SET status = $1, modified_at = $2
                  WHERE id = $3 AND status = $4",
            )
            .bind(BulkPassStatus::Completed)
            .bind(now)
            .bind(grant.bulk_pass_id)
            .bind(BulkPassStatus::Ready)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?
            .rows_affected();
            if claimed == 0 {
                continue;
            }

            for pass in &grant.passes {
                inserted += sqlx::query(
                    "INSERT INTO pass
                            (package_id, user_id, status, remaining_count,
                             started_at, ended_at, expired_at, created_at, modified_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                )
                .bind(pass.package_id)
                .bind(&pass.user_id)
                .bind(pass.status)
                .bind(pass.remaining_count)
                .bind(pass.started_at)
                .bind(pass.ended_at)
                .bind(pass.expired_at)
                .bind(pass.created_at)
                .bind(pass.modified_at)
                .execute(&mut *tx)
                .await
                .map_err(write_err)?
                .rows_affected();
            }
        }
        tx.commit().await.map_err(write_err)?;
        Ok(inserted)
    }

    async fn expirable_pass_cursor(&self, as_of: NaiveDateTime) -> Result<RecordCursor<Pass>> {
        let rows = sqlx::query_as::<_, Pass>(
            "SELECT id, package_id, user_id, status, remaining_count, started_at,
                    ended_at, expired_at, created_at, modified_at
               FROM pass
              WHERE status = $1 AND ended_at <= $2
              ORDER BY id",
        )
        .bind(PassStatus::Progressed)
        .bind(as_of)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        Ok(RecordCursor::from_records(rows))
    }

    async fn save_passes(&self, passes: &[Pass]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(write_err)?;
        let mut saved = 0;
        for pass in passes {
            saved += sqlx::query(
                "UPDATE pass
                    SET status = $1, remaining_count = $2, expired_at = $3, modified_at = $4
                  WHERE id = $5",
            )
            .bind(pass.status)
            .bind(pass.remaining_count)
            .bind(pass.expired_at)
            .bind(pass.modified_at)
            .bind(pass.id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?
            .rows_affected();
        }
        tx.commit().await.map_err(write_err)?;
        Ok(saved)
    }

    async fn bookings_page(
        &self,
        starting_before: NaiveDateTime,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(
            "SELECT id, user_id, status, started_at, ended_at, created_at, modified_at
               FROM booking
              WHERE status = $1 AND started_at <= $2
              ORDER BY id
              LIMIT $3 OFFSET $4",
        )
        .bind(BookingStatus::Ready)
        .bind(starting_before)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)
    }

    async fn insert_notifications(&self, notifications: &[Notification]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(write_err)?;
        let mut inserted = 0;
        for notification in notifications {
            // Relies on the unique index on (booking_id, event).
            inserted += sqlx::query(
                "INSERT INTO notification
                        (booking_id, user_id, event, text, sent, sent_at,
                         created_at, modified_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (booking_id, event) DO NOTHING",
            )
            .bind(notification.booking_id)
            .bind(&notification.user_id)
            .bind(notification.event)
            .bind(&notification.text)
            .bind(notification.sent)
            .bind(notification.sent_at)
            .bind(notification.created_at)
            .bind(notification.modified_at)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?
            .rows_affected();
        }
        tx.commit().await.map_err(write_err)?;
        Ok(inserted)
    }

    async fn unsent_notification_cursor(
        &self,
        event: NotificationEvent,
    ) -> Result<RecordCursor<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT id, booking_id, user_id, event, text, sent, sent_at,
                    created_at, modified_at
               FROM notification
              WHERE event = $1 AND sent = FALSE
              ORDER BY id",
        )
        .bind(event)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        Ok(RecordCursor::from_records(rows))
    }

    async fn mark_notification_sent(
        &self,
        notification_id: i64,
        now: NaiveDateTime,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notification
                SET sent = TRUE, sent_at = $1, modified_at = $1
              WHERE id = $2 AND sent = FALSE",
        )
        .bind(now)
        .bind(notification_id)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(result.rows_affected())
    }
}
