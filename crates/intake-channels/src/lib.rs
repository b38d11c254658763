//! Communication channels for the intake form bot.
//!
//! Provides a unified [`Channel`] trait for delivering messages, the
//! Telegram Bot API implementation used both to talk to end users and to
//! reach the operator chat, and the [`NotificationDispatcher`] that turns
//! finished forms and incoming receipts into operator notifications.
//!
//! # Main types
//!
//! - [`Channel`]: Trait for sending messages on a platform.
//! - [`TelegramChannel`]: Telegram Bot API sender and long-polling receiver.
//! - [`NotificationDispatcher`]: Delivers summaries and receipts to the sink.

/// Core channel trait and message types.
pub mod channel;
/// Operator notifications.
pub mod dispatcher;
/// Telegram channel integration.
pub mod telegram;

pub use channel::{Channel, ChannelMessage, MessageContent};
pub use dispatcher::{render_summary, NotificationDispatcher};
pub use telegram::{TelegramChannel, TelegramUpdate};
