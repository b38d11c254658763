//! Conversation state machine for the intake form.
//!
//! The form is driven by a pure [`transition`] function in the style of the
//! Elm architecture: given the current [`Session`](intake_session::Session)
//! and one inbound payload it returns the next session value, the prompts
//! to send back, and the [`Effect`]s to run. The [`Conversation`] engine
//! applies transitions under per-session exclusion and runs their effects.

/// The conversation engine.
pub mod engine;
/// User-facing prompt texts.
pub mod prompts;
/// Pure transition function.
pub mod transition;

pub use engine::Conversation;
pub use transition::{transition, Effect, TransitionResult};
