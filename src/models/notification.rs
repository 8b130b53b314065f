//! # Notification Model
//!
//! One outbound message per `(booking, event)` pair. The generation step
//! creates unsent records from qualifying bookings; the dispatch step hands
//! them to the delivery collaborator and flips `sent` after a successful
//! attempt. `(booking_id, event)` is unique in the store so a re-run inside
//! the same horizon cannot queue a duplicate message.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::booking::Booking;

/// Formatter for class times embedded in message text: `yyyy-MM-dd HH:mm`.
pub const CLASS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    BeforeClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub booking_id: i64,
    pub user_id: String,
    pub event: NotificationEvent,
    pub text: String,
    pub sent: bool,
    pub sent_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

impl Notification {
    /// Build the pre-class notification for a booking.
    ///
    /// Pure record construction; the store assigns the id on insert and
    /// rejects duplicates on `(booking_id, event)`.
    pub fn before_class(booking: &Booking, now: NaiveDateTime) -> Self {
        Self {
            id: 0,
            booking_id: booking.id,
            user_id: booking.user_id.clone(),
            event: NotificationEvent::BeforeClass,
            text: format!(
                "Your class starts at {}. Please check in before it begins.",
                booking.started_at.format(CLASS_TIME_FORMAT)
            ),
            sent: false,
            sent_at: None,
            created_at: now,
            modified_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::BookingStatus;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn before_class_renders_the_start_time() {
        let started_at = NaiveDate::from_ymd_opt(2023, 4, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let now = Utc::now().naive_utc();
        let booking = Booking {
            id: 42,
            user_id: "A1000000".to_string(),
            status: BookingStatus::Ready,
            started_at,
            ended_at: started_at,
            created_at: now,
            modified_at: now,
        };

        let notification = Notification::before_class(&booking, now);

        assert_eq!(notification.booking_id, 42);
        assert_eq!(notification.user_id, "A1000000");
        assert_eq!(notification.event, NotificationEvent::BeforeClass);
        assert!(!notification.sent);
        assert!(notification.text.contains("2023-04-01 10:30"));
    }

    #[test]
    fn event_serializes_in_stored_form() {
        let json = serde_json::to_string(&NotificationEvent::BeforeClass).unwrap();
        assert_eq!(json, "\"BEFORE_CLASS\"");
    }
}
