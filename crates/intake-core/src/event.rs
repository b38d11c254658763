use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an end user, stable across that user's events.
///
/// For Telegram this is the sender's user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SessionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// The transport-level flavour of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// A compressed photo.
    Photo,
    /// A file sent as a document (e.g. an uncompressed scan or a PDF).
    Document,
}

/// Opaque handle to an attachment held by the chat provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Provider file id, usable to re-send the file without downloading it.
    pub file_id: String,
    /// Whether the file arrived as a photo or a document.
    pub kind: AttachmentKind,
}

impl AttachmentRef {
    /// Creates a photo attachment reference.
    pub fn photo(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            kind: AttachmentKind::Photo,
        }
    }

    /// Creates a document attachment reference.
    pub fn document(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            kind: AttachmentKind::Document,
        }
    }
}

/// Control commands recognized by the ingress adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Restart the form from the beginning, discarding collected fields.
    Start,
    /// Abandon the form.
    Cancel,
}

impl Command {
    /// Parses a `/command` token, ignoring a trailing `@botname` suffix.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        let token = token.split('@').next().unwrap_or(token);
        match token {
            "/start" => Some(Self::Start),
            "/cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// What an inbound event carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EventPayload {
    /// A free-text message.
    Text {
        /// The raw message text.
        text: String,
    },
    /// A single attachment (one event per photo).
    Attachment {
        /// Handle to the attached file.
        attachment: AttachmentRef,
    },
    /// A control command.
    Command {
        /// Which command.
        command: Command,
    },
}

impl EventPayload {
    /// Creates a text payload.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates an attachment payload.
    pub fn attachment(attachment: AttachmentRef) -> Self {
        Self::Attachment { attachment }
    }

    /// Creates a command payload.
    pub fn command(command: Command) -> Self {
        Self::Command { command }
    }

    /// Short name of the payload kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Attachment { .. } => "attachment",
            Self::Command { .. } => "command",
        }
    }
}

/// One event received from an end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// The user the event belongs to.
    pub session_id: SessionId,
    /// Chat the user's replies should be delivered to.
    pub chat_id: i64,
    /// The event content.
    pub payload: EventPayload,
    /// When the provider says the event occurred.
    pub occurred_at: DateTime<Utc>,
}

impl InboundEvent {
    /// Creates an event in a private chat (chat id equal to the user id), stamped now.
    pub fn new(session_id: impl Into<SessionId>, payload: EventPayload) -> Self {
        let session_id = session_id.into();
        Self {
            session_id,
            chat_id: session_id.0,
            payload,
            occurred_at: Utc::now(),
        }
    }

    /// Creates a text event.
    pub fn text(session_id: impl Into<SessionId>, text: impl Into<String>) -> Self {
        Self::new(session_id, EventPayload::text(text))
    }

    /// Creates an attachment event.
    pub fn attachment(session_id: impl Into<SessionId>, attachment: AttachmentRef) -> Self {
        Self::new(session_id, EventPayload::attachment(attachment))
    }

    /// Creates a command event.
    pub fn command(session_id: impl Into<SessionId>, command: Command) -> Self {
        Self::new(session_id, EventPayload::command(command))
    }
}
