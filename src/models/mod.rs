//! # Data Model Layer
//!
//! Entities owned by the record store and moved through the chunk runtime.
//! Audit timestamps (`created_at` / `modified_at`) are plain fields set by
//! writers at mutation time; there is no hidden audit listener.

pub mod booking;
pub mod notification;
pub mod pass;
pub mod user;

// Re-export core models for easy access
pub use booking::{Booking, BookingStatus};
pub use notification::{Notification, NotificationEvent};
pub use pass::{BulkPass, BulkPassStatus, Pass, PassStatus};
pub use user::UserGroupMapping;
