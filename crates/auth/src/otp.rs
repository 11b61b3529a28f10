use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;

use nightwatch_core::otp::{self, OtpChallenge};
use nightwatch_core::phone::normalize_e164;
use nightwatch_core::DomainError;

use crate::ratelimit::RateLimiter;

const MAX_VERIFY_ATTEMPTS: u32 = 5;
const ISSUE_PER_PHONE_LIMIT: u64 = 3;
const ISSUE_PER_IP_LIMIT: u64 = 10;
const ISSUE_WINDOW: StdDuration = StdDuration::from_secs(600);

/// Ephemeral, in-memory OTP challenge store plus the issuance rate limiters
/// that guard it. Challenges are never persisted (§9): losing them on
/// restart just forces a re-issue.
pub struct OtpAuthenticator {
    challenges: DashMap<String, OtpChallenge>,
    per_phone: RateLimiter,
    per_ip: RateLimiter,
    validity: Duration,
}

/// Outcome of a successful or failed issuance/verification, kept uniform so
/// callers can apply the same timing-attack-hardening delay regardless of
/// which branch actually ran.
pub enum VerifyOutcome {
    Verified,
    Failed,
}

impl OtpAuthenticator {
    pub fn new(validity: Duration) -> Self {
        Self {
            challenges: DashMap::new(),
            per_phone: RateLimiter::new(ISSUE_PER_PHONE_LIMIT, ISSUE_WINDOW),
            per_ip: RateLimiter::new(ISSUE_PER_IP_LIMIT, ISSUE_WINDOW),
            validity,
        }
    }

    /// Normalizes `raw_phone`, checks issuance rate limits, and if allowed
    /// generates and stores a fresh challenge. Returns the plaintext code so
    /// the caller can enqueue the outbound SMS; the caller owns delivery.
    pub fn issue(&self, raw_phone: &str, client_ip: &str, now: DateTime<Utc>) -> Result<(String, String), DomainError> {
        let phone = normalize_e164(raw_phone).ok_or_else(|| DomainError::BadRequest("invalid phone number".into()))?;

        let now_secs = u64::try_from(now.timestamp().max(0)).unwrap_or(0);
        if !self.per_phone.check(&phone, now_secs).allowed {
            return Err(DomainError::RateLimited { retry_after_secs: ISSUE_WINDOW.as_secs() });
        }
        if !self.per_ip.check(client_ip, now_secs).allowed {
            return Err(DomainError::RateLimited { retry_after_secs: ISSUE_WINDOW.as_secs() });
        }

        let mut rng = rand::thread_rng();
        let code = otp::generate_code(|| rng.r#gen());
        let challenge = OtpChallenge::new(code.clone(), now + self.validity, MAX_VERIFY_ATTEMPTS);
        self.challenges.insert(phone.clone(), challenge);

        Ok((phone, code))
    }

    /// Verifies `candidate` for `phone`. Every failure path — unknown phone,
    /// expired challenge, wrong code, exhausted attempts — returns the same
    /// `Failed` outcome so the HTTP edge can answer identically.
    pub fn verify(&self, raw_phone: &str, candidate: &str, now: DateTime<Utc>) -> VerifyOutcome {
        let Some(phone) = normalize_e164(raw_phone) else {
            return VerifyOutcome::Failed;
        };

        let Some(mut entry) = self.challenges.get_mut(&phone) else {
            return VerifyOutcome::Failed;
        };

        if entry.is_expired(now) {
            drop(entry);
            self.challenges.remove(&phone);
            return VerifyOutcome::Failed;
        }

        if entry.matches(candidate) {
            drop(entry);
            self.challenges.remove(&phone);
            self.per_phone.reset(&phone);
            return VerifyOutcome::Verified;
        }

        entry.attempts_remaining = entry.attempts_remaining.saturating_sub(1);
        let exhausted = entry.attempts_remaining == 0;
        drop(entry);
        if exhausted {
            self.challenges.remove(&phone);
        }
        VerifyOutcome::Failed
    }
}

/// Sleeps a uniform random delay in `[50ms, 150ms]` before returning, per
/// the timing-attack hardening requirement on every auth failure path.
pub async fn timing_delay() {
    let millis = rand::thread_rng().gen_range(50..=150);
    tokio::time::sleep(StdDuration::from_millis(millis)).await;
}
