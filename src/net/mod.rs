//! Network layer.
//!
//! Binds the inbound TCP listener handed to the HTTP server.

pub mod listener;

pub use listener::{bind, ListenerError};
