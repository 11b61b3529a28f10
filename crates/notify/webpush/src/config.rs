use secrecy::SecretString;

/// Configuration for the web-push transport.
///
/// Real VAPID (RFC 8292) signs with ECDSA over P-256; this transport signs
/// with HMAC-SHA256 over the shared `vapid_private_key` instead, matching
/// the HMAC-signing shape already used elsewhere in this stack rather than
/// pulling in a dedicated elliptic-curve crate for one signature.
#[derive(Clone)]
pub struct WebPushConfig {
    pub vapid_public_key: String,
    pub vapid_private_key: SecretString,
    pub vapid_subject: String,
    pub api_base_url: String,
    pub dev_mode: bool,
}

impl std::fmt::Debug for WebPushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebPushConfig")
            .field("vapid_public_key", &self.vapid_public_key)
            .field("vapid_private_key", &"[REDACTED]")
            .field("vapid_subject", &self.vapid_subject)
            .field("api_base_url", &self.api_base_url)
            .field("dev_mode", &self.dev_mode)
            .finish()
    }
}

impl WebPushConfig {
    pub fn new(
        vapid_public_key: impl Into<String>,
        vapid_private_key: impl Into<String>,
        vapid_subject: impl Into<String>,
    ) -> Self {
        Self {
            vapid_public_key: vapid_public_key.into(),
            vapid_private_key: SecretString::from(vapid_private_key.into()),
            vapid_subject: vapid_subject.into(),
            api_base_url: "https://push.example.com".to_owned(),
            dev_mode: false,
        }
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }
}
