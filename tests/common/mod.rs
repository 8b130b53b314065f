//! Shared fixtures and collaborator doubles for the integration tests.

#![allow(dead_code)] // not every test binary uses every helper

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use parking_lot::Mutex;
use std::collections::HashSet;

use passbatch_core::delivery::DeliveryClient;
use passbatch_core::error::{BatchError, Result};
use passbatch_core::models::{
    Booking, BookingStatus, BulkPass, BulkPassStatus, Pass, PassStatus, UserGroupMapping,
};

pub fn bulk_pass(user_group_id: &str, count: i32, now: NaiveDateTime) -> BulkPass {
    BulkPass {
        id: 0,
        package_id: 1,
        user_group_id: user_group_id.to_string(),
        status: BulkPassStatus::Ready,
        count,
        started_at: now,
        ended_at: now + Duration::days(60),
        created_at: now,
        modified_at: now,
    }
}

pub fn membership(user_group_id: &str, user_id: &str, now: NaiveDateTime) -> UserGroupMapping {
    UserGroupMapping::new(user_group_id, user_id, "Test group", now)
}

pub fn progressed_pass(
    user_id: &str,
    remaining_count: i32,
    ended_at: NaiveDateTime,
    now: NaiveDateTime,
) -> Pass {
    Pass {
        id: 0,
        package_id: 1,
        user_id: user_id.to_string(),
        status: PassStatus::Progressed,
        remaining_count,
        started_at: now - Duration::days(60),
        ended_at,
        expired_at: None,
        created_at: now - Duration::days(60),
        modified_at: now - Duration::days(60),
    }
}

pub fn booking(
    user_id: &str,
    status: BookingStatus,
    started_at: NaiveDateTime,
    now: NaiveDateTime,
) -> Booking {
    Booking {
        id: 0,
        user_id: user_id.to_string(),
        status,
        started_at,
        ended_at: started_at + Duration::hours(1),
        created_at: now,
        modified_at: now,
    }
}

/// Delivery double with per-user scripted failures.
pub struct StubDelivery {
    failing_users: Mutex<HashSet<String>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl StubDelivery {
    pub fn new() -> Self {
        Self {
            failing_users: Mutex::new(HashSet::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Make every send to `user_id` fail until `recover` is called.
    pub fn fail_for(&self, user_id: &str) {
        self.failing_users.lock().insert(user_id.to_string());
    }

    pub fn recover(&self, user_id: &str) {
        self.failing_users.lock().remove(user_id);
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl DeliveryClient for StubDelivery {
    async fn send(&self, user_id: &str, text: &str) -> Result<()> {
        if self.failing_users.lock().contains(user_id) {
            return Err(BatchError::Delivery(format!(
                "scripted failure for {user_id}"
            )));
        }
        self.sent
            .lock()
            .push((user_id.to_string(), text.to_string()));
        Ok(())
    }
}
