//! Domain types and pure logic for the night-watch shift coordinator: the
//! clock/calendar, the data model, and the error taxonomy shared by every
//! other crate in the workspace.

pub mod audit;
pub mod booking;
pub mod broadcast;
pub mod calendar;
pub mod error;
pub mod otp;
pub mod outbox;
pub mod phone;
pub mod points;
pub mod recurring;
pub mod report;
pub mod schedule;
pub mod user;

pub use audit::{AuditEvent, NewAuditEvent};
pub use booking::{Booking, CheckinWindow};
pub use broadcast::{Broadcast, BroadcastAudience};
pub use calendar::{CalendarError, Slot};
pub use error::DomainError;
pub use otp::OtpChallenge;
pub use outbox::{MessageType, NewOutboxItem, OutboxItem, OutboxStatus};
pub use points::{PointsLedgerEntry, PointsReason, UserPointsCache};
pub use recurring::RecurringAssignment;
pub use report::{Report, Severity};
pub use schedule::Schedule;
pub use user::{Role, User};
