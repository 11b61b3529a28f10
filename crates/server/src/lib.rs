//! HTTP server for the night-watch shift coordinator: request handlers,
//! bearer-token/role middleware, configuration, and shared application
//! state. `main.rs` wires this together with the store, auth, and
//! notification backends and owns process lifecycle.

pub mod api;
pub mod auth_middleware;
pub mod config;
pub mod error;
pub mod state;
