use crate::channel::{Channel, ChannelMessage, MessageContent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intake_core::{
    AttachmentKind, AttachmentRef, Command, EventPayload, InboundEvent, IntakeError,
    IntakeResult, ReplyMarkup, SessionId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API channel adapter.
///
/// Uses the Telegram Bot HTTP API for sending messages and long-polling
/// (`getUpdates`) for receiving them. Incoming messages are converted into
/// [`InboundEvent`]s and forwarded through a `tokio::sync::mpsc` channel.
pub struct TelegramChannel {
    bot_token: String,
    api_base: String,
    client: reqwest::Client,
    poll_timeout_secs: u64,
    retry_delay: Duration,
    event_tx: mpsc::Sender<InboundEvent>,
    event_rx: Option<mpsc::Receiver<InboundEvent>>,
}

// ── Telegram API response types ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
    result: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Why a Bot API call produced no result.
#[derive(Debug)]
enum ApiFailure {
    /// No well-formed answer: connection error or an unparseable body.
    Transport(String),
    /// Telegram answered with `ok: false`.
    Rejected {
        code: Option<u16>,
        description: String,
        retry_after: Option<u64>,
    },
}

impl ApiFailure {
    fn into_error(self, method: &str) -> IntakeError {
        match self {
            Self::Transport(e) => IntakeError::Http(format!("Telegram {method} error: {e}")),
            Self::Rejected { description, .. } => {
                IntakeError::Channel(format!("Telegram {method} failed: {description}"))
            }
        }
    }
}

/// One entry of a `getUpdates` result or a webhook request body.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub document: Option<TelegramDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramDocument {
    pub file_id: String,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct SendPhotoRequest<'a> {
    chat_id: &'a str,
    photo: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendDocumentRequest<'a> {
    chat_id: &'a str,
    document: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
}

// ── Update conversion ───────────────────────────────────────────────────────

impl TelegramUpdate {
    /// Converts the update into an [`InboundEvent`].
    ///
    /// Returns `None` for updates the form has no use for (edited messages,
    /// stickers, voice notes, service messages, ...).
    pub fn into_event(self) -> Option<InboundEvent> {
        let message = self.message?;
        let chat_id = message.chat.id;
        let session_id = message.from.as_ref().map_or(chat_id, |user| user.id);
        let occurred_at = DateTime::from_timestamp(message.date, 0).unwrap_or_else(Utc::now);
        let payload = message.into_payload()?;
        Some(InboundEvent {
            session_id: SessionId(session_id),
            chat_id,
            payload,
            occurred_at,
        })
    }
}

impl TelegramMessage {
    fn into_payload(self) -> Option<EventPayload> {
        if let Some(sizes) = self.photo {
            // Telegram lists every resolution of the same photo; keep the largest.
            let largest = sizes
                .into_iter()
                .max_by_key(|size| u64::from(size.width) * u64::from(size.height))?;
            return Some(EventPayload::attachment(AttachmentRef::photo(largest.file_id)));
        }
        if let Some(document) = self.document {
            return Some(EventPayload::attachment(AttachmentRef::document(
                document.file_id,
            )));
        }
        let text = self.text?;
        Some(match Command::parse(&text) {
            Some(command) => EventPayload::command(command),
            None => EventPayload::text(text),
        })
    }
}

/// Builds the Bot API `reply_markup` object for a keyboard instruction.
fn reply_markup(markup: &ReplyMarkup) -> Option<serde_json::Value> {
    match markup {
        ReplyMarkup::Keep => None,
        ReplyMarkup::Options(options) => {
            let rows: Vec<_> = options
                .iter()
                .map(|option| serde_json::json!([{ "text": option }]))
                .collect();
            Some(serde_json::json!({
                "keyboard": rows,
                "resize_keyboard": true,
                "one_time_keyboard": true,
            }))
        }
        ReplyMarkup::Clear => Some(serde_json::json!({ "remove_keyboard": true })),
    }
}

// ── Implementation ──────────────────────────────────────────────────────────

impl TelegramChannel {
    /// Create a new `TelegramChannel`.
    ///
    /// * `bot_token` – The bot token obtained from @BotFather.
    /// * `event_buffer` – Capacity of the internal mpsc event buffer.
    pub fn new(bot_token: impl Into<String>, event_buffer: usize) -> Self {
        let (event_tx, event_rx) = mpsc::channel(event_buffer);
        Self {
            bot_token: bot_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            client: reqwest::Client::new(),
            poll_timeout_secs: 30,
            retry_delay: Duration::from_secs(5),
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Point the channel at a different Bot API server (e.g. a local one).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Long-poll timeout passed to `getUpdates`, and the pause between
    /// polls after a transport error.
    pub fn with_polling(mut self, poll_timeout_secs: u64, retry_delay: Duration) -> Self {
        self.poll_timeout_secs = poll_timeout_secs;
        self.retry_delay = retry_delay;
        self
    }

    /// Take the receiving half of the event channel.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<InboundEvent>> {
        self.event_rx.take()
    }

    /// Start long-polling the Telegram `getUpdates` endpoint.
    ///
    /// This method runs until the event receiver is dropped, forwarding
    /// every usable message as an [`InboundEvent`]. Transport errors and
    /// 5xx replies are retried after the retry delay, 429 replies after the
    /// `retry_after` Telegram asks for. Any other rejection (bad token, a
    /// webhook still registered) ends polling with an error. It should be
    /// spawned onto a Tokio task.
    pub async fn poll_updates(&self) -> IntakeResult<()> {
        let mut offset: Option<i64> = None;

        loop {
            let request = GetUpdatesRequest {
                offset,
                timeout: self.poll_timeout_secs,
                allowed_updates: &["message"],
            };

            let updates: Vec<TelegramUpdate> = match self.call_api("getUpdates", &request).await {
                Ok(updates) => updates,
                Err(ApiFailure::Transport(e)) => {
                    warn!(error = %e, "Telegram poll failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
                Err(ApiFailure::Rejected {
                    code: Some(429),
                    retry_after,
                    description,
                }) => {
                    let wait = retry_after.map_or(self.retry_delay, Duration::from_secs);
                    warn!(
                        retry_after_secs = wait.as_secs(),
                        description = %description,
                        "Telegram poll rate limited, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Err(ApiFailure::Rejected {
                    code: Some(code),
                    description,
                    ..
                }) if code >= 500 => {
                    warn!(code, description = %description, "Telegram server error, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
                Err(failure) => return Err(failure.into_error("getUpdates")),
            };

            for update in updates {
                // Advance the offset so we do not receive this update again.
                offset = Some(update.update_id + 1);

                let update_id = update.update_id;
                let Some(event) = update.into_event() else {
                    debug!(update_id, "Ignoring unsupported Telegram update");
                    continue;
                };

                // If the receiver is dropped we stop.
                if self.event_tx.send(event).await.is_err() {
                    return Ok(());
                }
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn call<P, R>(&self, method: &str, payload: &P) -> IntakeResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call_api(method, payload)
            .await
            .map_err(|failure| failure.into_error(method))
    }

    async fn call_api<P, R>(&self, method: &str, payload: &P) -> Result<R, ApiFailure>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.api_url(method))
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(e.to_string()))?;

        let body: TelegramResponse<R> = response
            .json()
            .await
            .map_err(|e| ApiFailure::Transport(format!("bad response: {e}")))?;

        if !body.ok {
            return Err(ApiFailure::Rejected {
                code: body.error_code,
                description: body.description.unwrap_or_default(),
                retry_after: body.parameters.and_then(|p| p.retry_after),
            });
        }

        body.result.ok_or_else(|| ApiFailure::Rejected {
            code: None,
            description: "no result".into(),
            retry_after: None,
        })
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: ChannelMessage) -> IntakeResult<()> {
        let chat_id = message.chat_id.as_str();
        match &message.content {
            MessageContent::Text { text, markup } => {
                let payload = SendMessageRequest {
                    chat_id,
                    text,
                    reply_markup: reply_markup(markup),
                };
                self.call::<_, serde_json::Value>("sendMessage", &payload)
                    .await?;
            }
            MessageContent::Attachment {
                attachment,
                caption,
            } => match attachment.kind {
                AttachmentKind::Photo => {
                    let payload = SendPhotoRequest {
                        chat_id,
                        photo: &attachment.file_id,
                        caption: caption.as_deref(),
                    };
                    self.call::<_, serde_json::Value>("sendPhoto", &payload)
                        .await?;
                }
                AttachmentKind::Document => {
                    let payload = SendDocumentRequest {
                        chat_id,
                        document: &attachment.file_id,
                        caption: caption.as_deref(),
                    };
                    self.call::<_, serde_json::Value>("sendDocument", &payload)
                        .await?;
                }
            },
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> Option<InboundEvent> {
        serde_json::from_value::<TelegramUpdate>(json).unwrap().into_event()
    }

    #[test]
    fn test_text_update() {
        let event = parse(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "from": {"id": 42, "first_name": "Ivan", "is_bot": false},
                "chat": {"id": 42, "type": "private"},
                "date": 1_760_000_000,
                "text": "Ivan Petrov"
            }
        }))
        .unwrap();
        assert_eq!(event.session_id, SessionId(42));
        assert_eq!(event.chat_id, 42);
        assert_eq!(event.payload, EventPayload::text("Ivan Petrov"));
        assert_eq!(event.occurred_at.timestamp(), 1_760_000_000);
    }

    #[test]
    fn test_command_update() {
        let event = parse(serde_json::json!({
            "update_id": 2,
            "message": {
                "message_id": 11,
                "from": {"id": 42},
                "chat": {"id": 42},
                "date": 0,
                "text": "/cancel"
            }
        }))
        .unwrap();
        assert_eq!(event.payload, EventPayload::command(Command::Cancel));
    }

    #[test]
    fn test_photo_update_keeps_largest_size() {
        let event = parse(serde_json::json!({
            "update_id": 3,
            "message": {
                "message_id": 12,
                "from": {"id": 42},
                "chat": {"id": 42},
                "date": 0,
                "photo": [
                    {"file_id": "small", "file_unique_id": "s", "width": 90, "height": 60},
                    {"file_id": "large", "file_unique_id": "l", "width": 1280, "height": 853},
                    {"file_id": "medium", "file_unique_id": "m", "width": 320, "height": 213}
                ],
                "caption": "чек"
            }
        }))
        .unwrap();
        assert_eq!(
            event.payload,
            EventPayload::attachment(AttachmentRef::photo("large"))
        );
    }

    #[test]
    fn test_document_update() {
        let event = parse(serde_json::json!({
            "update_id": 4,
            "message": {
                "message_id": 13,
                "from": {"id": 7},
                "chat": {"id": -100},
                "date": 0,
                "document": {"file_id": "doc", "file_unique_id": "d", "mime_type": "application/pdf"}
            }
        }))
        .unwrap();
        assert_eq!(event.session_id, SessionId(7));
        assert_eq!(event.chat_id, -100);
        assert_eq!(
            event.payload,
            EventPayload::attachment(AttachmentRef::document("doc"))
        );
    }

    #[test]
    fn test_unsupported_updates_are_skipped() {
        assert!(parse(serde_json::json!({"update_id": 5})).is_none());
        assert!(parse(serde_json::json!({
            "update_id": 6,
            "message": {
                "message_id": 14,
                "chat": {"id": 1},
                "date": 0,
                "sticker": {"file_id": "st"}
            }
        }))
        .is_none());
    }

    #[test]
    fn test_reply_markup_shapes() {
        assert!(reply_markup(&ReplyMarkup::Keep).is_none());
        assert_eq!(
            reply_markup(&ReplyMarkup::Clear).unwrap(),
            serde_json::json!({"remove_keyboard": true})
        );
        let keyboard = reply_markup(&ReplyMarkup::Options(vec!["a".into(), "b".into()])).unwrap();
        assert_eq!(keyboard["keyboard"][1][0]["text"], "b");
        assert_eq!(keyboard["one_time_keyboard"], true);
    }
}
