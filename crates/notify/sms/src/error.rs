use nightwatch_notify::TransportError;
use thiserror::Error;

/// Errors specific to the Twilio-backed SMS transport, translated into a
/// [`TransportError`] at the `Transport` boundary.
#[derive(Debug, Error)]
pub enum SmsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Twilio API error: {0}")]
    Api(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("rate limited by Twilio")]
    RateLimited,
}

impl From<SmsError> for TransportError {
    fn from(err: SmsError) -> Self {
        match err {
            SmsError::Http(e) => TransportError::Connection(e.to_string()),
            SmsError::Api(msg) => TransportError::Rejected(msg),
            SmsError::InvalidRecipient(msg) => TransportError::Configuration(msg),
            SmsError::RateLimited => TransportError::RateLimited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_maps_to_retryable() {
        let transport_err: TransportError = SmsError::RateLimited.into();
        assert!(transport_err.is_retryable());
        assert!(matches!(transport_err, TransportError::RateLimited));
    }

    #[test]
    fn api_error_maps_to_rejected() {
        let transport_err: TransportError = SmsError::Api("21211".into()).into();
        assert!(!transport_err.is_retryable());
        assert!(matches!(transport_err, TransportError::Rejected(_)));
    }
}
