//! # Booking Model
//!
//! A scheduled class reservation. Read-only to the notification pipeline:
//! the generation step pages over READY bookings whose class starts inside
//! the notification horizon.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Ready,
    Progressed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub user_id: String,
    pub status: BookingStatus,
    /// Scheduled class start; the anchor for pre-class notifications.
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}
