use thiserror::Error;

/// Errors surfaced by the core domain components.
///
/// Each variant corresponds to one of the error kinds in the specification's
/// error-handling section; the HTTP edge maps these to status codes.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("slot already taken")]
    SlotTaken,

    #[error("too early")]
    TooEarly,

    #[error("too late")]
    TooLate,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("internal error")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DomainError {
    /// Wraps an arbitrary error as [`DomainError::Internal`], logging the
    /// original cause since it is never returned to the caller.
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        tracing::error!(error = %err, "internal error");
        Self::Internal(Box::new(err))
    }

    /// A short machine-readable kind name, used by logging and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::AuthenticationFailed => "authentication_failed",
            Self::Forbidden => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::SlotTaken => "slot_taken",
            Self::TooEarly => "too_early",
            Self::TooLate => "too_late",
            Self::RateLimited { .. } => "rate_limited",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(DomainError::SlotTaken.kind(), "slot_taken");
        assert_eq!(DomainError::AuthenticationFailed.kind(), "authentication_failed");
        assert_eq!(
            DomainError::RateLimited { retry_after_secs: 5 }.kind(),
            "rate_limited"
        );
    }

    #[test]
    fn authentication_failure_message_is_uniform() {
        let unknown_phone = DomainError::AuthenticationFailed;
        let wrong_code = DomainError::AuthenticationFailed;
        assert_eq!(unknown_phone.to_string(), wrong_code.to_string());
    }
}
