use async_trait::async_trait;
use intake_core::{AttachmentRef, IntakeResult, Prompt, ReplyMarkup};
use serde::{Deserialize, Serialize};

/// What an outbound message carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
        #[serde(default)]
        markup: ReplyMarkup,
    },
    Attachment {
        attachment: AttachmentRef,
        caption: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub chat_id: String,
    pub content: MessageContent,
}

impl ChannelMessage {
    /// A plain text message without keyboard changes.
    pub fn text(chat_id: impl ToString, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            content: MessageContent::Text {
                text: text.into(),
                markup: ReplyMarkup::Keep,
            },
        }
    }

    /// A prompt for an end user, keyboard instruction included.
    pub fn prompt(chat_id: impl ToString, prompt: Prompt) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            content: MessageContent::Text {
                text: prompt.text,
                markup: prompt.markup,
            },
        }
    }

    /// Re-sends an attachment the provider already holds.
    pub fn attachment(
        chat_id: impl ToString,
        attachment: AttachmentRef,
        caption: Option<String>,
    ) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            content: MessageContent::Attachment {
                attachment,
                caption,
            },
        }
    }
}

#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, message: ChannelMessage) -> IntakeResult<()>;
}
