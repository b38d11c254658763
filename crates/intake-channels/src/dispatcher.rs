use crate::channel::{Channel, ChannelMessage};
use intake_core::validate::format_date;
use intake_core::{AttachmentRef, DeliveryMethod, FinalRecord, IntakeResult, SessionId};
use std::sync::Arc;
use tracing::info;

const EMAIL_PLACEHOLDER: &str = "—";

/// Delivers finished forms and incoming receipts to the operator chat.
///
/// Delivery is best-effort: errors are returned to the caller, which logs
/// them and carries on with the user-facing flow.
pub struct NotificationDispatcher {
    channel: Arc<dyn Channel>,
    sink_chat_id: String,
}

impl NotificationDispatcher {
    /// * `channel` – Channel the sink is reachable through.
    /// * `sink_chat_id` – Operator chat that receives every notification.
    pub fn new(channel: Arc<dyn Channel>, sink_chat_id: impl ToString) -> Self {
        Self {
            channel,
            sink_chat_id: sink_chat_id.to_string(),
        }
    }

    /// Sends the rendered summary of a completed form.
    pub async fn dispatch_summary(&self, record: &FinalRecord) -> IntakeResult<()> {
        let text = render_summary(record);
        self.channel
            .send(ChannelMessage::text(&self.sink_chat_id, text))
            .await?;
        info!(
            session_id = %record.session_id,
            request_id = %record.request_id,
            channel = self.channel.name(),
            attachments = record.attachment_count(),
            "Summary dispatched"
        );
        Ok(())
    }

    /// Forwards one receipt, tagged with the user it came from.
    pub async fn relay_attachment(
        &self,
        session_id: SessionId,
        attachment: &AttachmentRef,
    ) -> IntakeResult<()> {
        let caption = format!("🧾 Чек от пользователя {session_id}");
        self.channel
            .send(ChannelMessage::attachment(
                &self.sink_chat_id,
                attachment.clone(),
                Some(caption),
            ))
            .await
    }
}

/// Renders the operator summary for a completed form.
///
/// Field order is fixed: identity fields, delivery method, e-mail (or a
/// placeholder), receipt count, user id, completion time.
pub fn render_summary(record: &FinalRecord) -> String {
    let email = match (record.delivery, record.email.as_deref()) {
        (DeliveryMethod::Email, Some(address)) => address,
        _ => EMAIL_PLACEHOLDER,
    };
    format!(
        "📄 Новая заявка на справку\n\
         № {request_id}\n\
         \n\
         👤 ФИО: {full_name}\n\
         🎂 Дата рождения: {birthdate}\n\
         🧾 ИНН: {tax_id}\n\
         📦 Получение: {delivery}\n\
         📧 Email: {email}\n\
         📎 Чеков: {attachments}\n\
         🆔 User ID: {session_id}\n\
         🕒 Время: {time}",
        request_id = record.request_id,
        full_name = record.full_name,
        birthdate = format_date(record.birthdate),
        tax_id = record.tax_id,
        delivery = record.delivery.label(),
        attachments = record.attachment_count(),
        session_id = record.session_id,
        time = record.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::channel::MessageContent;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use intake_core::{AttachmentKind, IntakeError};
    use tokio::sync::Mutex;

    /// Mock channel that records every message.
    #[derive(Default)]
    struct MockChannel {
        sent: Mutex<Vec<ChannelMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Channel for MockChannel {
        fn name(&self) -> &str {
            "mock"
        }

        async fn send(&self, message: ChannelMessage) -> IntakeResult<()> {
            if self.fail {
                return Err(IntakeError::Channel("sink unreachable".into()));
            }
            self.sent.lock().await.push(message);
            Ok(())
        }
    }

    fn record(delivery: DeliveryMethod, email: Option<&str>) -> FinalRecord {
        FinalRecord {
            request_id: uuid::Uuid::nil(),
            session_id: SessionId(42),
            full_name: "Ivan Petrov".into(),
            birthdate: NaiveDate::from_ymd_opt(1990, 3, 15).unwrap(),
            tax_id: "123456789012".into(),
            delivery,
            email: email.map(Into::into),
            attachments: vec![AttachmentRef::photo("a")],
            completed_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_summary_field_order() {
        let text = render_summary(&record(DeliveryMethod::Paper, None));
        let positions: Vec<usize> = [
            "ФИО: Ivan Petrov",
            "Дата рождения: 15.03.1990",
            "ИНН: 123456789012",
            "Получение: Оригинал на бумаге",
            "Email: —",
            "Чеков: 1",
            "User ID: 42",
            "Время: 2026-10-19 09:30:00 UTC",
        ]
        .iter()
        .map(|needle| text.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn test_summary_is_deterministic() {
        let r = record(DeliveryMethod::Email, Some("ivan@example.com"));
        assert_eq!(render_summary(&r), render_summary(&r));
        assert!(render_summary(&r).contains("Email: ivan@example.com"));
    }

    #[tokio::test]
    async fn test_dispatch_summary_goes_to_sink() {
        let channel = Arc::new(MockChannel::default());
        let dispatcher = NotificationDispatcher::new(channel.clone(), 1660333700_i64);
        dispatcher
            .dispatch_summary(&record(DeliveryMethod::Paper, None))
            .await
            .unwrap();

        let sent = channel.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, "1660333700");
        assert!(matches!(&sent[0].content, MessageContent::Text { text, .. } if text.contains("Ivan Petrov")));
    }

    #[tokio::test]
    async fn test_relay_attachment_is_tagged() {
        let channel = Arc::new(MockChannel::default());
        let dispatcher = NotificationDispatcher::new(channel.clone(), "sink");
        dispatcher
            .relay_attachment(SessionId(42), &AttachmentRef::document("doc-1"))
            .await
            .unwrap();

        let sent = channel.sent.lock().await;
        match &sent[0].content {
            MessageContent::Attachment {
                attachment,
                caption,
            } => {
                assert_eq!(attachment.kind, AttachmentKind::Document);
                assert!(caption.as_deref().unwrap().contains("42"));
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sink_failure_is_reported() {
        let channel = Arc::new(MockChannel {
            fail: true,
            ..Default::default()
        });
        let dispatcher = NotificationDispatcher::new(channel, "sink");
        let result = dispatcher
            .dispatch_summary(&record(DeliveryMethod::Paper, None))
            .await;
        assert!(matches!(result, Err(IntakeError::Channel(_))));
    }
}
