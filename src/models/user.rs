//! # User Group Membership
//!
//! Read-only to the batch engine: the fan-out processor resolves the members
//! of a bulk pass's user group through this mapping.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Membership of one user in one user group. Many memberships per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserGroupMapping {
    pub user_group_id: String,
    pub user_id: String,
    pub user_group_name: String,
    pub description: String,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

impl UserGroupMapping {
    pub fn new(
        user_group_id: &str,
        user_id: &str,
        user_group_name: &str,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            user_group_id: user_group_id.to_string(),
            user_id: user_id.to_string(),
            user_group_name: user_group_name.to_string(),
            description: String::new(),
            created_at: now,
            modified_at: now,
        }
    }
}
