use nightwatch_notify::TransportError;
use thiserror::Error;

/// Errors specific to the web-push transport, translated into a
/// [`TransportError`] at the `Transport` boundary.
#[derive(Debug, Error)]
pub enum WebPushError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("push endpoint rejected the message: {0}")]
    Rejected(String),

    #[error("invalid push subscription: {0}")]
    InvalidSubscription(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("rate limited by push service")]
    RateLimited,
}

impl From<WebPushError> for TransportError {
    fn from(err: WebPushError) -> Self {
        match err {
            WebPushError::Http(e) => TransportError::Connection(e.to_string()),
            WebPushError::Rejected(msg) => TransportError::Rejected(msg),
            WebPushError::InvalidSubscription(msg) => TransportError::Configuration(msg),
            WebPushError::Signing(msg) => TransportError::Configuration(msg),
            WebPushError::RateLimited => TransportError::RateLimited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_maps_to_retryable() {
        let transport_err: TransportError = WebPushError::RateLimited.into();
        assert!(transport_err.is_retryable());
    }

    #[test]
    fn invalid_subscription_maps_to_configuration() {
        let transport_err: TransportError = WebPushError::InvalidSubscription("no endpoint".into()).into();
        assert!(matches!(transport_err, TransportError::Configuration(_)));
        assert!(!transport_err.is_retryable());
    }
}
