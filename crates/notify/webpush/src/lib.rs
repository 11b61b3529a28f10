//! VAPID-authenticated web-push transport for the night-watch outbox
//! dispatcher.
//!
//! Implements [`nightwatch_notify::Transport`] so it can be registered for
//! `SHIFT_REMINDER`, as the primary leg of `ADMIN_SHIFT_ASSIGNMENT`'s
//! web-push + SMS fallback, and as the underlying push sender wrapped by
//! [`nightwatch_notify::BroadcastTransport`] for `BROADCAST` fan-out.

pub mod config;
pub mod error;
pub mod provider;

pub use config::WebPushConfig;
pub use error::WebPushError;
pub use provider::WebPushTransport;
