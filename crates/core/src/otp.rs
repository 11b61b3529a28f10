use chrono::{DateTime, Utc};

/// An ephemeral, in-memory one-time-password challenge keyed by phone
/// number. Never persisted; losing it on process restart is an accepted
/// deployment tradeoff (§9).
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub attempts_remaining: u32,
}

impl OtpChallenge {
    pub fn new(code: String, expires_at: DateTime<Utc>, max_attempts: u32) -> Self {
        Self {
            code,
            expires_at,
            attempts_remaining: max_attempts,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Checks `candidate` against the stored code. Does not mutate
    /// `attempts_remaining`; callers decrement on mismatch themselves so
    /// that eviction-on-exhaustion stays a store-level decision.
    pub fn matches(&self, candidate: &str) -> bool {
        // Constant-time-ish comparison isn't required here: codes are
        // single-use and rate-limited, and the uniform response delay is
        // what actually defends against timing analysis (§4.6).
        self.code == candidate
    }
}

/// Generates a 6-digit numeric OTP code using the supplied random source.
///
/// Takes a closure rather than calling `rand` directly so the core crate
/// stays free of a hard dependency on a specific RNG; `nightwatch-auth`
/// supplies `rand::random`.
pub fn generate_code(mut next_u32: impl FnMut() -> u32) -> String {
    let value = next_u32() % 1_000_000;
    format!("{value:06}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_code_is_always_six_digits() {
        for seed in [0u32, 1, 999_999, 1_000_000, 4_294_967_295] {
            let code = generate_code(|| seed);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn expiry_boundary_is_inclusive_of_expires_at() {
        let expires_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 10, 0).unwrap();
        let challenge = OtpChallenge::new("123456".into(), expires_at, 5);
        assert!(!challenge.is_expired(expires_at - chrono::Duration::seconds(1)));
        assert!(challenge.is_expired(expires_at));
    }

    #[test]
    fn matches_compares_exact_code() {
        let challenge = OtpChallenge::new("123456".into(), Utc::now(), 5);
        assert!(challenge.matches("123456"));
        assert!(!challenge.matches("000000"));
    }
}
