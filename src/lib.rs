//! Connection/command engine for a single-threaded, readiness-driven
//! IRC server. `server::Server` ties everything together; `main.rs` is
//! a thin CLI wrapper around it, and integration tests drive
//! `Server::tick_once` directly against in-memory socket pairs.

pub mod channel;
pub mod client;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod framer;
pub mod handlers;
pub mod liveness;
pub mod poller;
pub mod registry;
pub mod server;
pub mod signal;
