use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use nightwatch_core::{DomainError, Role, User};

/// Claims embedded in a session bearer token, per the session-tokens detail
/// in the OTP authenticator design: `{ sub, phone, name, role, exp }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub phone: String,
    pub name: Option<String>,
    pub role: Role,
    pub exp: usize,
}

/// Mints and validates HS256 session tokens. Stateless: expiry alone bounds
/// a token's lifetime, there is no server-side revocation list.
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl JwtManager {
    pub fn new(secret: &SecretString, expiry: Duration) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation: Validation::default(),
            expiry,
        }
    }

    /// Mints a bearer token for `user`.
    pub fn issue(&self, user: &User) -> Result<String, DomainError> {
        #[allow(clippy::cast_possible_truncation)]
        let exp = (Utc::now() + self.expiry).timestamp() as usize;
        let claims = Claims {
            sub: user.user_id,
            phone: user.phone.clone(),
            name: user.name.clone(),
            role: user.role,
            exp,
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(DomainError::internal)
    }

    /// Validates a bearer token, returning its claims. Any failure —
    /// malformed, expired, or badly signed — collapses to
    /// `AuthenticationFailed` so the HTTP edge cannot distinguish failure
    /// modes to a caller.
    pub fn validate(&self, token: &str) -> Result<Claims, DomainError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| DomainError::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc as ChronoUtc;

    fn user() -> User {
        User {
            user_id: 7,
            phone: "+14155550100".into(),
            name: Some("Ada".into()),
            role: Role::Owl,
            created_at: ChronoUtc::now(),
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let manager = JwtManager::new(&SecretString::from("test-secret".to_string()), Duration::hours(1));
        let token = manager.issue(&user()).unwrap();
        let claims = manager.validate(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, Role::Owl);
    }

    #[test]
    fn garbage_token_fails_authentication() {
        let manager = JwtManager::new(&SecretString::from("test-secret".to_string()), Duration::hours(1));
        let err = manager.validate("not-a-jwt").unwrap_err();
        assert!(matches!(err, DomainError::AuthenticationFailed));
    }

    #[test]
    fn expired_token_fails_authentication() {
        let manager = JwtManager::new(&SecretString::from("test-secret".to_string()), Duration::seconds(-1));
        let token = manager.issue(&user()).unwrap();
        let err = manager.validate(&token).unwrap_err();
        assert!(matches!(err, DomainError::AuthenticationFailed));
    }
}
