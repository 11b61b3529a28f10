use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use nightwatch_core::MessageType;
use nightwatch_notify::{Transport, TransportError};

use crate::config::SmsConfig;
use crate::error::SmsError;
use crate::types::{ApiResponse, SendMessageRequest};

/// Sends outbox messages as SMS via the Twilio REST API, or logs them at
/// `info` level when `config.dev_mode` is set (§4.5's "Dev sink").
pub struct SmsTransport {
    config: SmsConfig,
    client: Client,
}

impl SmsTransport {
    pub fn new(config: SmsConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { config, client }
    }

    pub fn with_client(config: SmsConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base_url, self.config.account_sid
        )
    }

    async fn send_message(&self, to: &str, body: &str) -> Result<ApiResponse, SmsError> {
        let from = self
            .config
            .from_number
            .clone()
            .ok_or_else(|| SmsError::InvalidRecipient("no from_number configured".into()))?;

        let request = SendMessageRequest { to: to.to_string(), from, body: body.to_string() };

        debug!(to, "sending SMS via Twilio");
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(self.config.auth_token.expose_secret()))
            .form(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Twilio API rate limit hit");
            return Err(SmsError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SmsError::Api(format!("HTTP {status}: {text}")));
        }

        let api_response: ApiResponse = response.json().await?;
        if let Some(code) = api_response.error_code {
            let msg = api_response
                .error_message
                .clone()
                .unwrap_or_else(|| format!("error code {code}"));
            return Err(SmsError::Api(msg));
        }
        Ok(api_response)
    }
}

/// Builds the SMS body text for an outbox message type, per the payload
/// shapes in §4.5's routing table.
fn message_body(message_type: MessageType, payload: &serde_json::Value) -> String {
    match message_type {
        MessageType::OtpVerification => {
            let otp = payload.get("otp").and_then(|v| v.as_str()).unwrap_or("");
            format!("Your night-watch verification code is {otp}")
        }
        MessageType::AdminShiftAssignment => {
            let schedule_id = payload.get("schedule_id").and_then(|v| v.as_i64());
            let shift_start = payload.get("shift_start").and_then(|v| v.as_str()).unwrap_or("");
            match schedule_id {
                Some(schedule_id) => format!(
                    "You've been assigned a shift on schedule {schedule_id} starting {shift_start} by your watch admin."
                ),
                None => "You've been assigned a shift by your watch admin.".to_string(),
            }
        }
        MessageType::ShiftReminder | MessageType::Broadcast => {
            payload.to_string()
        }
    }
}

#[async_trait]
impl Transport for SmsTransport {
    async fn send(
        &self,
        recipient: &str,
        message_type: MessageType,
        payload: &serde_json::Value,
    ) -> Result<(), TransportError> {
        let body = message_body(message_type, payload);

        if self.config.dev_mode {
            info!(recipient, %message_type, body, "dev-mode SMS sink");
            return Ok(());
        }

        self.send_message(recipient, &body).await?;
        Ok(())
    }
}
