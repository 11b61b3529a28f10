use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::ExposeSecret;
use sha2::Sha256;
use tracing::{debug, info, warn};

use nightwatch_core::MessageType;
use nightwatch_notify::{Transport, TransportError};

use crate::config::WebPushConfig;
use crate::error::WebPushError;

type HmacSha256 = Hmac<Sha256>;

/// Sends outbox messages as web-push notifications, or logs them at `info`
/// level when `config.dev_mode` is set. `recipient` is a push subscription
/// id, resolved against `api_base_url` to build the delivery endpoint.
pub struct WebPushTransport {
    config: WebPushConfig,
    client: Client,
}

impl WebPushTransport {
    pub fn new(config: WebPushConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("failed to build HTTP client");
        Self { config, client }
    }

    pub fn with_client(config: WebPushConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn endpoint_url(&self, recipient: &str) -> Result<String, WebPushError> {
        if recipient.trim().is_empty() {
            return Err(WebPushError::InvalidSubscription("empty recipient".into()));
        }
        Ok(format!("{}/push/{}", self.config.api_base_url, recipient))
    }

    fn sign(&self, body: &[u8]) -> Result<String, WebPushError> {
        let mut mac = HmacSha256::new_from_slice(self.config.vapid_private_key.expose_secret().as_bytes())
            .map_err(|e| WebPushError::Signing(e.to_string()))?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn deliver(&self, recipient: &str, body: &serde_json::Value) -> Result<(), WebPushError> {
        let url = self.endpoint_url(recipient)?;
        let body_bytes = serde_json::to_vec(body).map_err(|e| WebPushError::Signing(e.to_string()))?;
        let signature = self.sign(&body_bytes)?;

        debug!(recipient, "sending web-push notification");
        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("vapid t={signature}, k={}", self.config.vapid_public_key),
            )
            .header("Content-Type", "application/json")
            .body(body_bytes)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("push service rate limit hit");
            return Err(WebPushError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WebPushError::Rejected(format!("HTTP {status}: {text}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for WebPushTransport {
    async fn send(
        &self,
        recipient: &str,
        message_type: MessageType,
        payload: &serde_json::Value,
    ) -> Result<(), TransportError> {
        let body = serde_json::json!({
            "message_type": message_type.as_str(),
            "payload": payload,
        });

        if self.config.dev_mode {
            info!(recipient, %message_type, %body, "dev-mode web-push sink");
            return Ok(());
        }

        self.deliver(recipient, &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    struct MockPushServer {
        listener: tokio::net::TcpListener,
        base_url: String,
    }

    impl MockPushServer {
        async fn start() -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            let base_url = format!("http://127.0.0.1:{port}");
            Self { listener, base_url }
        }

        async fn respond_once(self, status_code: u16) -> Vec<u8> {
            let (mut stream, _) = self.listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = stream.read(&mut buf).await.unwrap();
            buf.truncate(n);
            let response = format!("HTTP/1.1 {status_code} OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            buf
        }
    }

    fn config(base_url: &str) -> WebPushConfig {
        WebPushConfig::new("pub-key", "priv-key", "mailto:ops@example.com").with_api_base_url(base_url)
    }

    #[tokio::test]
    async fn dev_mode_never_calls_the_network() {
        let transport = WebPushTransport::new(config("http://127.0.0.1:1").with_dev_mode(true));
        let result = transport
            .send("sub-123", MessageType::ShiftReminder, &serde_json::json!({}))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn successful_send_includes_vapid_auth_header() {
        let server = MockPushServer::start().await;
        let transport = WebPushTransport::new(config(&server.base_url));

        let server_handle = tokio::spawn(async move {
            let request = server.respond_once(201).await;
            let text = String::from_utf8_lossy(&request).to_lowercase();
            assert!(text.contains("authorization: vapid"));
            request
        });

        let result = transport
            .send("sub-123", MessageType::ShiftReminder, &serde_json::json!({ "booking_id": 1 }))
            .await;
        server_handle.await.unwrap();

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn rate_limited_response_is_retryable() {
        let server = MockPushServer::start().await;
        let transport = WebPushTransport::new(config(&server.base_url));

        let server_handle = tokio::spawn(async move {
            server.respond_once(429).await;
        });

        let err = transport
            .send("sub-123", MessageType::ShiftReminder, &serde_json::json!({}))
            .await
            .unwrap_err();
        server_handle.await.unwrap();

        assert!(matches!(err, TransportError::RateLimited));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn empty_recipient_is_configuration_error() {
        let transport = WebPushTransport::new(config("http://127.0.0.1:1"));
        let err = transport
            .send("", MessageType::ShiftReminder, &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Configuration(_)));
    }
}
