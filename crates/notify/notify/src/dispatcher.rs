use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use rand::Rng;
use tracing::{error, info, warn};

use nightwatch_core::outbox::backoff;
use nightwatch_core::{DomainError, MessageType};
use nightwatch_store::Store;

use crate::transport::Transport;

/// Tunables for the outbox dispatcher's tick loop, per §4.5.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub batch_size: u32,
    pub tick_interval: StdDuration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            tick_interval: StdDuration::from_secs(5),
            max_retries: 5,
            backoff_base: Duration::seconds(30),
            backoff_max: Duration::minutes(30),
        }
    }
}

/// Routes due outbox rows to a [`Transport`] keyed by [`MessageType`], per
/// the message-type/transport table in §4.5, retrying with exponential
/// backoff and jitter until `max_retries` is exhausted.
///
/// One instance runs per process; construction wires every message type to
/// a transport up front so a tick never discovers a missing route mid-batch.
pub struct OutboxDispatcher {
    store: Arc<dyn Store>,
    transports: HashMap<MessageType, Arc<dyn Transport>>,
    config: DispatcherConfig,
}

impl OutboxDispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        transports: HashMap<MessageType, Arc<dyn Transport>>,
        config: DispatcherConfig,
    ) -> Self {
        Self { store, transports, config }
    }

    /// Runs the tick loop until `shutdown` resolves. Mirrors the
    /// background-worker shape used elsewhere in this system: a `select!`
    /// between an interval ticker and a shutdown signal, logging per-tick
    /// errors rather than propagating them so one bad tick never kills the
    /// worker.
    pub async fn run(&self, mut shutdown: tokio::sync::mpsc::Receiver<()>) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("outbox dispatcher shutting down");
                    return;
                }
                _ = interval.tick() => {
                    if let Err(err) = self.tick().await {
                        error!(error = %err, "outbox dispatcher tick failed");
                    }
                }
            }
        }
    }

    /// Processes one batch of due items. Exposed separately from [`Self::run`]
    /// so tests can drive ticks deterministically without sleeping.
    pub async fn tick(&self) -> Result<(), DomainError> {
        let now = Utc::now();
        let items = self.store.select_due_outbox_items(self.config.batch_size, now).await?;
        for item in items {
            let Some(transport) = self.transports.get(&item.message_type) else {
                warn!(message_type = %item.message_type, "no transport configured, leaving item pending");
                continue;
            };

            match transport.send(&item.recipient, item.message_type, &item.payload).await {
                Ok(()) => {
                    self.store.mark_outbox_sent(item.outbox_id, Utc::now()).await?;
                }
                Err(send_err) => {
                    let retry_count = item.retry_count + 1;
                    warn!(
                        outbox_id = item.outbox_id,
                        message_type = %item.message_type,
                        error = %send_err,
                        retry_count,
                        "outbox send failed"
                    );
                    if retry_count > self.config.max_retries {
                        self.store.mark_outbox_failed(item.outbox_id, retry_count).await?;
                    } else {
                        let jitter = rand::thread_rng().gen_range(0.5..=1.5);
                        let delay = backoff(self.config.backoff_base, self.config.backoff_max, retry_count, jitter);
                        self.store
                            .mark_outbox_retry(item.outbox_id, retry_count, Utc::now() + delay)
                            .await?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use nightwatch_core::NewOutboxItem;
    use nightwatch_store_memory::MemoryStore;

    use crate::transport::TransportError;

    struct FlakyTransport {
        calls: AtomicUsize,
        succeed_after: usize,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn send(
            &self,
            _recipient: &str,
            _message_type: MessageType,
            _payload: &serde_json::Value,
        ) -> Result<(), TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.succeed_after {
                Err(TransportError::Connection("not yet".into()))
            } else {
                Ok(())
            }
        }
    }

    fn config() -> DispatcherConfig {
        DispatcherConfig {
            batch_size: 10,
            tick_interval: StdDuration::from_millis(1),
            max_retries: 3,
            backoff_base: Duration::milliseconds(0),
            backoff_max: Duration::milliseconds(0),
        }
    }

    #[tokio::test]
    async fn successful_send_marks_item_sent() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store
            .enqueue_outbox_item(NewOutboxItem::now(
                MessageType::OtpVerification,
                "+14155550100",
                serde_json::json!({ "otp": "123456" }),
            ))
            .await
            .unwrap();

        let transport: Arc<dyn Transport> =
            Arc::new(FlakyTransport { calls: AtomicUsize::new(0), succeed_after: 0 });
        let mut transports = HashMap::new();
        transports.insert(MessageType::OtpVerification, transport);

        let dispatcher = OutboxDispatcher::new(store.clone(), transports, config());
        dispatcher.tick().await.unwrap();

        let remaining = store.select_due_outbox_items(10, Utc::now()).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn failed_send_reschedules_with_backoff_until_retries_exhausted() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store
            .enqueue_outbox_item(NewOutboxItem::now(
                MessageType::OtpVerification,
                "+14155550100",
                serde_json::json!({ "otp": "123456" }),
            ))
            .await
            .unwrap();

        let transport: Arc<dyn Transport> =
            Arc::new(FlakyTransport { calls: AtomicUsize::new(0), succeed_after: usize::MAX });
        let mut transports = HashMap::new();
        transports.insert(MessageType::OtpVerification, transport);

        let mut cfg = config();
        cfg.max_retries = 2;
        let dispatcher = OutboxDispatcher::new(store.clone(), transports, cfg);

        dispatcher.tick().await.unwrap();
        dispatcher.tick().await.unwrap();

        // Third tick should see the item failed permanently, no longer due.
        let due = store.select_due_outbox_items(10, Utc::now() + Duration::hours(1)).await.unwrap();
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn retry_count_equal_to_max_retries_stays_pending() {
        // Spec's own worked example: max_retries=3, three failures land
        // retry_count at 3, and the item must still be pending -- only a
        // retry_count *past* max_retries marks it failed.
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store
            .enqueue_outbox_item(NewOutboxItem::now(
                MessageType::OtpVerification,
                "+14155550100",
                serde_json::json!({ "otp": "123456" }),
            ))
            .await
            .unwrap();

        let transport: Arc<dyn Transport> =
            Arc::new(FlakyTransport { calls: AtomicUsize::new(0), succeed_after: usize::MAX });
        let mut transports = HashMap::new();
        transports.insert(MessageType::OtpVerification, transport);

        let mut cfg = config();
        cfg.max_retries = 3;
        let dispatcher = OutboxDispatcher::new(store.clone(), transports, cfg);

        dispatcher.tick().await.unwrap();
        dispatcher.tick().await.unwrap();
        dispatcher.tick().await.unwrap();

        let still_pending = store.select_due_outbox_items(10, Utc::now() + Duration::hours(1)).await.unwrap();
        assert_eq!(still_pending.len(), 1);
        assert_eq!(still_pending[0].retry_count, 3);

        dispatcher.tick().await.unwrap();
        let due = store.select_due_outbox_items(10, Utc::now() + Duration::hours(1)).await.unwrap();
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn missing_transport_leaves_item_pending() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store
            .enqueue_outbox_item(NewOutboxItem::now(
                MessageType::ShiftReminder,
                "user-1",
                serde_json::json!({}),
            ))
            .await
            .unwrap();

        let dispatcher = OutboxDispatcher::new(store.clone(), HashMap::new(), config());
        dispatcher.tick().await.unwrap();

        let due = store.select_due_outbox_items(10, Utc::now()).await.unwrap();
        assert_eq!(due.len(), 1);
    }
}
