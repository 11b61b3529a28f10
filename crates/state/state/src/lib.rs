//! The storage abstraction shared by every backend: a typed [`Store`] trait
//! plus the "new entity" request structs each creation method accepts.

pub mod store;

pub use store::{
    NewBooking, NewBroadcast, NewPointsLedgerEntry, NewRecurringAssignment, NewReport, NewSchedule,
    Store,
};
