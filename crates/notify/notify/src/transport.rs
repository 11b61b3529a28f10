use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use nightwatch_core::MessageType;

/// Errors a [`Transport`] may raise attempting delivery.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport rejected recipient {0:?}")]
    InvalidRecipient(String),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("upstream rejected the request: {0}")]
    Rejected(String),

    #[error("transport misconfigured: {0}")]
    Configuration(String),
}

impl TransportError {
    /// Whether the outbox dispatcher should retry this item with backoff, as
    /// opposed to treating it as a permanent rejection. In the current
    /// dispatcher (§4.5) every failure counts toward `retry_count` the same
    /// way, so this mainly documents intent for callers that branch on it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connection(_) | Self::RateLimited
        )
    }
}

/// A pluggable sender invoked by the outbox dispatcher (C8), uniform across
/// `message_type`. `recipient` is the outbox row's addressing string (a
/// phone number for SMS, a push subscription/user identifier for web-push);
/// `payload` is the opaque JSON body from the table in §4.5.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        message_type: MessageType,
        payload: &serde_json::Value,
    ) -> Result<(), TransportError>;
}
