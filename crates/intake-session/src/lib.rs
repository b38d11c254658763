//! Session state for the intake form bot.
//!
//! A [`Session`] is the per-user record of one pass through the form. The
//! [`SessionStore`] owns every active session and hands out exclusive,
//! per-key access to them so that events for one user are applied one at a
//! time while other users proceed in parallel.

/// The per-user session value.
pub mod session;
/// Concurrent in-memory session store.
pub mod store;

pub use session::Session;
pub use store::{SessionGuard, SessionStore};
