//! # Pass Models
//!
//! A `BulkPass` is a bulk purchase record: one package bought for an entire
//! user group. The fan-out job expands a READY bulk pass into one `Pass`
//! (individual entitlement) per group member; the expiration job later sweeps
//! passes whose validity window has elapsed.
//!
//! ## Status Lifecycles
//!
//! - `BulkPass`: READY → COMPLETED (set by the fan-out writer in the same
//!   chunk that inserts the granted passes, so a re-run never re-grants).
//! - `Pass`: READY → PROGRESSED (external usage path) → EXPIRED (expiration
//!   sweep, `expired_at` set to the sweep's capture instant).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a bulk purchase record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkPassStatus {
    Ready,
    Completed,
}

/// Lifecycle status of an individual entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassStatus {
    Ready,
    Progressed,
    Expired,
}

/// One bulk purchase: `count` uses of `package_id` for every member of
/// `user_group_id`, valid from `started_at` to `ended_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BulkPass {
    pub id: i64,
    pub package_id: i64,
    pub user_group_id: String,
    pub status: BulkPassStatus,
    pub count: i32,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

/// One user's entitlement, granted from a bulk pass or purchased directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Pass {
    pub id: i64,
    pub package_id: i64,
    pub user_id: String,
    pub status: PassStatus,
    pub remaining_count: i32,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub expired_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

impl Pass {
    /// Map one bulk pass onto a fresh entitlement for `user_id`.
    ///
    /// Pure record construction: status is always READY regardless of the
    /// bulk pass status, `remaining_count` copies the purchased count and
    /// the validity window carries over unchanged. The store assigns the id
    /// on insert.
    pub fn from_bulk_pass(bulk_pass: &BulkPass, user_id: &str, now: NaiveDateTime) -> Self {
        Self {
            id: 0,
            package_id: bulk_pass.package_id,
            user_id: user_id.to_string(),
            status: PassStatus::Ready,
            remaining_count: bulk_pass.count,
            started_at: bulk_pass.started_at,
            ended_at: bulk_pass.ended_at,
            expired_at: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Has this pass outlived its validity window as of `as_of`?
    pub fn is_expirable(&self, as_of: NaiveDateTime) -> bool {
        self.status == PassStatus::Progressed && self.ended_at <= as_of
    }
}
