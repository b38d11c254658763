//! Ingress for the intake bot.
//!
//! Updates arrive either through the Telegram webhook served by
//! [`GatewayServer`] or through long polling ([`run_polling`]). Both paths
//! hand events to [`SessionLanes`], which keeps each user's events in
//! arrival order while different users are processed in parallel.

/// Per-session ordered event lanes.
pub mod lanes;
/// Long-polling driver.
pub mod polling;
/// Event routing to the conversation engine.
pub mod router;
/// HTTP server.
pub mod server;
/// Telegram webhook endpoint.
pub mod webhook;

pub use lanes::SessionLanes;
pub use polling::run_polling;
pub use router::MessageRouter;
pub use server::{AppState, GatewayServer};
