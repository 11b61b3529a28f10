use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use nightwatch_core::MessageType;
use nightwatch_store::Store;

use crate::transport::{Transport, TransportError};

/// Expands a `BROADCAST` outbox row's `audience` against the user table and
/// fans it out over an underlying push transport, per §4.5's "Fan-out"
/// paragraph: partial failures fold into the broadcast's own tally rather
/// than rescheduling the triggering outbox row.
pub struct BroadcastTransport {
    push: Arc<dyn Transport>,
    store: Arc<dyn Store>,
}

impl BroadcastTransport {
    pub fn new(push: Arc<dyn Transport>, store: Arc<dyn Store>) -> Self {
        Self { push, store }
    }
}

#[async_trait]
impl Transport for BroadcastTransport {
    async fn send(
        &self,
        _recipient: &str,
        message_type: MessageType,
        payload: &serde_json::Value,
    ) -> Result<(), TransportError> {
        let broadcast_id = payload
            .get("broadcast_id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| TransportError::Configuration("broadcast payload missing broadcast_id".into()))?;
        let audience_str = payload
            .get("audience")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TransportError::Configuration("broadcast payload missing audience".into()))?;
        let audience = nightwatch_core::BroadcastAudience::from_str_loose(audience_str)
            .ok_or_else(|| TransportError::Configuration(format!("unknown audience {audience_str:?}")))?;

        let recipients = self
            .store
            .list_users_for_broadcast(audience)
            .await
            .map_err(|e| TransportError::Configuration(e.to_string()))?;

        let mut sent = 0u32;
        let mut failed = 0u32;
        for user in &recipients {
            match self.push.send(&user.phone, message_type, payload).await {
                Ok(()) => sent += 1,
                Err(err) => {
                    warn!(user_id = user.user_id, error = %err, "broadcast delivery failed for recipient");
                    failed += 1;
                }
            }
        }

        self.store
            .record_broadcast_delivery(broadcast_id, sent, failed)
            .await
            .map_err(|e| TransportError::Configuration(e.to_string()))?;

        // The broadcast row tracks its own delivery outcome; the outbox row
        // itself always counts as delivered once fan-out has been attempted.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use nightwatch_core::{BroadcastAudience, Role};
    use nightwatch_store::NewBroadcast;
    use nightwatch_store_memory::MemoryStore;

    struct CountingPush {
        calls: AtomicUsize,
        fail_every: usize,
    }

    #[async_trait]
    impl Transport for CountingPush {
        async fn send(
            &self,
            _recipient: &str,
            _message_type: MessageType,
            _payload: &serde_json::Value,
        ) -> Result<(), TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_every != 0 && n % self.fail_every == 0 {
                Err(TransportError::Connection("down".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn fans_out_to_all_users_and_records_tally() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store.create_user("+14155550100", Some("A")).await.unwrap();
        store.create_user("+14155550101", Some("B")).await.unwrap();

        let broadcast = store
            .create_broadcast(NewBroadcast {
                title: "Heads up".into(),
                message: "Patrol route change tonight".into(),
                audience: BroadcastAudience::All,
            })
            .await
            .unwrap();

        let push = Arc::new(CountingPush { calls: AtomicUsize::new(0), fail_every: 0 });
        let transport = BroadcastTransport::new(push.clone(), store.clone());

        let payload = serde_json::json!({
            "broadcast_id": broadcast.broadcast_id,
            "title": broadcast.title,
            "message": broadcast.message,
            "audience": "all",
        });
        transport
            .send("unused", MessageType::Broadcast, &payload)
            .await
            .unwrap();

        assert_eq!(push.calls.load(Ordering::SeqCst), 2);
        let updated = store.get_broadcast(broadcast.broadcast_id).await.unwrap().unwrap();
        assert_eq!(updated.sent_count, 2);
        assert_eq!(updated.failed_count, 0);
    }

    #[tokio::test]
    async fn partial_failures_increment_failed_count_without_erroring() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store.create_user("+14155550100", Some("Admin")).await.unwrap();
        let second = store.create_user("+14155550101", Some("Guest")).await.unwrap();
        assert_eq!(second.role, Role::Guest);

        let broadcast = store
            .create_broadcast(NewBroadcast {
                title: "t".into(),
                message: "m".into(),
                audience: BroadcastAudience::All,
            })
            .await
            .unwrap();

        let push = Arc::new(CountingPush { calls: AtomicUsize::new(0), fail_every: 2 });
        let transport = BroadcastTransport::new(push, store.clone());

        let payload = serde_json::json!({
            "broadcast_id": broadcast.broadcast_id,
            "audience": "all",
        });
        let result = transport.send("unused", MessageType::Broadcast, &payload).await;
        assert!(result.is_ok());

        let updated = store.get_broadcast(broadcast.broadcast_id).await.unwrap().unwrap();
        assert_eq!(updated.sent_count + updated.failed_count, 2);
        assert!(updated.failed_count >= 1);
    }

    #[tokio::test]
    async fn missing_broadcast_id_is_configuration_error() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let push = Arc::new(CountingPush { calls: AtomicUsize::new(0), fail_every: 0 });
        let transport = BroadcastTransport::new(push, store);

        let result = transport
            .send("unused", MessageType::Broadcast, &serde_json::json!({}))
            .await;
        assert!(matches!(result, Err(TransportError::Configuration(_))));
    }
}
