//! Core types and error definitions for the intake form bot.
//!
//! This crate provides the foundational types shared across all intake crates:
//! error handling, inbound event and outbound prompt representations, the
//! form state/field model, the finalized record, and the field validators.
//!
//! # Main types
//!
//! - [`IntakeError`]: Unified error enum for all intake subsystems.
//! - [`IntakeResult`]: Convenience alias for `Result<T, IntakeError>`.
//! - [`InboundEvent`]: One event received from an end user.
//! - [`Prompt`]: One message sent back to the end user.
//! - [`FormState`]: The step of the intake form a session is waiting on.
//! - [`FinalRecord`]: A completed form, ready for the notification sink.
//! - [`ValidationError`]: Why a raw field value was rejected.

/// Error types shared by every crate.
pub mod error;
/// Inbound events and session identifiers.
pub mod event;
/// Form states and accumulated field values.
pub mod form;
/// Outbound prompts and reply keyboards.
pub mod prompt;
/// Finalized intake record.
pub mod record;
/// Pure field validators.
pub mod validate;

pub use error::{IntakeError, IntakeResult};
pub use event::{AttachmentKind, AttachmentRef, Command, EventPayload, InboundEvent, SessionId};
pub use form::{DeliveryMethod, FormFields, FormState};
pub use prompt::{Prompt, ReplyMarkup};
pub use record::FinalRecord;
pub use validate::ValidationError;
