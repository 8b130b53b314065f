//! # Batch Runtime Configuration
//!
//! Explicit configuration for the batch pipelines. Defaults mirror the
//! scheduled production settings; every knob can be overridden through
//! environment variables so the same binary serves development, test and
//! the cron-driven production runs.

use crate::error::{BatchError, Result};
use serde::{Deserialize, Serialize};

/// Host and credential for the outbound message-delivery collaborator.
///
/// The transport itself is external to the engine; these values are treated
/// as opaque and handed to the configured [`DeliveryClient`](crate::delivery::DeliveryClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub host: String,
    pub token: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            host: "https://kapi.kakao.com".to_string(),
            token: String::new(),
        }
    }
}

/// Top-level configuration shared by all batch jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Connection string for the record store.
    pub database_url: String,

    /// Records per chunk; one chunk is one commit boundary.
    pub chunk_size: usize,

    /// Bounded worker count for the notification dispatch step. All other
    /// steps run single-threaded.
    pub dispatch_workers: usize,

    /// Bookings starting within this many minutes get a pre-class
    /// notification. Captured once per run, never re-evaluated per page.
    pub notification_horizon_minutes: i64,

    /// Bulk passes whose window opened within this many hours are eligible
    /// for fan-out.
    pub fan_out_lookback_hours: i64,

    pub delivery: DeliveryConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/passbatch_development".to_string(),
            chunk_size: 10,
            dispatch_workers: 4,
            notification_horizon_minutes: 10,
            fan_out_lookback_hours: 24,
            delivery: DeliveryConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Build a configuration from the environment, falling back to defaults
    /// for anything unset. Unparsable values are configuration errors, not
    /// silent fallbacks.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Ok(value) = std::env::var("PASSBATCH_CHUNK_SIZE") {
            config.chunk_size = parse_env("PASSBATCH_CHUNK_SIZE", &value)?;
        }

        if let Ok(value) = std::env::var("PASSBATCH_DISPATCH_WORKERS") {
            config.dispatch_workers = parse_env("PASSBATCH_DISPATCH_WORKERS", &value)?;
        }

        if let Ok(value) = std::env::var("PASSBATCH_NOTIFICATION_HORIZON_MINUTES") {
            config.notification_horizon_minutes =
                parse_env("PASSBATCH_NOTIFICATION_HORIZON_MINUTES", &value)?;
        }

        if let Ok(value) = std::env::var("PASSBATCH_FAN_OUT_LOOKBACK_HOURS") {
            config.fan_out_lookback_hours =
                parse_env("PASSBATCH_FAN_OUT_LOOKBACK_HOURS", &value)?;
        }

        if let Ok(host) = std::env::var("KAKAOTALK_HOST") {
            config.delivery.host = host;
        }

        if let Ok(token) = std::env::var("KAKAOTALK_TOKEN") {
            config.delivery.token = token;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the step executor cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.dispatch_workers == 0 {
            return Err(BatchError::Configuration(
                "dispatch_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| BatchError::Configuration(format!("invalid {name}: {e}")))
}
