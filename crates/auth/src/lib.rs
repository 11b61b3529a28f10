//! OTP issuance/verification and session-token minting for the night-watch
//! authenticator (C3): rate limiting, timing-attack hardening, and HS256
//! bearer tokens.

pub mod jwt;
pub mod otp;
pub mod ratelimit;

pub use jwt::{Claims, JwtManager};
pub use otp::{OtpAuthenticator, VerifyOutcome, timing_delay};
pub use ratelimit::RateLimiter;
