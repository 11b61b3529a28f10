//! Background delivery for the night-watch shift coordinator: the outbox
//! dispatcher (C8) and recurring-assignment materializer (C7), plus the
//! `Transport` abstraction and composition helpers they route through.

pub mod broadcast;
pub mod composite;
pub mod dispatcher;
pub mod materializer;
pub mod transport;

pub use broadcast::BroadcastTransport;
pub use composite::CompositeTransport;
pub use dispatcher::{DispatcherConfig, OutboxDispatcher};
pub use materializer::{MaterializeStats, MaterializerConfig, RecurringMaterializer};
pub use transport::{Transport, TransportError};
