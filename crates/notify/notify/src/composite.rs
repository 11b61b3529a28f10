use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use nightwatch_core::MessageType;

use crate::transport::{Transport, TransportError};

/// Tries `primary`, falling back to `fallback` if it fails. Used for
/// `ADMIN_SHIFT_ASSIGNMENT`, which the message-type table in §4.5 routes to
/// "web-push + SMS fallback".
pub struct CompositeTransport {
    primary: Arc<dyn Transport>,
    fallback: Arc<dyn Transport>,
}

impl CompositeTransport {
    pub fn new(primary: Arc<dyn Transport>, fallback: Arc<dyn Transport>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Transport for CompositeTransport {
    async fn send(
        &self,
        recipient: &str,
        message_type: MessageType,
        payload: &serde_json::Value,
    ) -> Result<(), TransportError> {
        match self.primary.send(recipient, message_type, payload).await {
            Ok(()) => Ok(()),
            Err(primary_err) => {
                warn!(error = %primary_err, "primary transport failed, falling back");
                self.fallback.send(recipient, message_type, payload).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(
            &self,
            _recipient: &str,
            _message_type: MessageType,
            _payload: &serde_json::Value,
        ) -> Result<(), TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(TransportError::Connection("down".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn uses_primary_when_it_succeeds() {
        let primary = Arc::new(CountingTransport { calls: AtomicUsize::new(0), fail: false });
        let fallback = Arc::new(CountingTransport { calls: AtomicUsize::new(0), fail: false });
        let composite = CompositeTransport::new(primary.clone(), fallback.clone());

        composite
            .send("+14155550100", MessageType::AdminShiftAssignment, &serde_json::json!({}))
            .await
            .unwrap();

        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_when_primary_fails() {
        let primary = Arc::new(CountingTransport { calls: AtomicUsize::new(0), fail: true });
        let fallback = Arc::new(CountingTransport { calls: AtomicUsize::new(0), fail: false });
        let composite = CompositeTransport::new(primary.clone(), fallback.clone());

        let result = composite
            .send("+14155550100", MessageType::AdminShiftAssignment, &serde_json::json!({}))
            .await;

        assert!(result.is_ok());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn propagates_fallback_failure() {
        let primary = Arc::new(CountingTransport { calls: AtomicUsize::new(0), fail: true });
        let fallback = Arc::new(CountingTransport { calls: AtomicUsize::new(0), fail: true });
        let composite = CompositeTransport::new(primary, fallback);

        let result = composite
            .send("+14155550100", MessageType::AdminShiftAssignment, &serde_json::json!({}))
            .await;

        assert!(result.is_err());
    }
}
