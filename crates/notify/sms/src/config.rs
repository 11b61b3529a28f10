use secrecy::SecretString;

/// Configuration for the Twilio-backed SMS transport.
///
/// `auth_token` is wrapped in [`SecretString`] so it never appears in a log
/// line or a `{:?}`-formatted error; its `Debug` impl prints a redacted
/// placeholder instead of the value.
#[derive(Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: Option<String>,
    pub api_base_url: String,
    /// When set, the transport logs the message instead of calling Twilio;
    /// see §4.5's "Dev sink" note.
    pub dev_mode: bool,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("api_base_url", &self.api_base_url)
            .field("dev_mode", &self.dev_mode)
            .finish()
    }
}

impl SmsConfig {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: SecretString::from(auth_token.into()),
            from_number: None,
            api_base_url: "https://api.twilio.com".to_owned(),
            dev_mode: false,
        }
    }

    #[must_use]
    pub fn with_from_number(mut self, number: impl Into<String>) -> Self {
        self.from_number = Some(number.into());
        self
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

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn default_api_base_url() {
        let config = SmsConfig::new("AC123", "token");
        assert_eq!(config.api_base_url, "https://api.twilio.com");
        assert!(!config.dev_mode);
    }

    #[test]
    fn debug_redacts_auth_token() {
        let config = SmsConfig::new("AC123", "super-secret-token");
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-token"));
        assert_eq!(config.auth_token.expose_secret(), "super-secret-token");
    }
}
