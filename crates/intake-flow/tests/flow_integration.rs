#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use intake_channels::{Channel, ChannelMessage, MessageContent, NotificationDispatcher};
use intake_core::{
    AttachmentRef, Command, FormState, InboundEvent, IntakeError, IntakeResult, SessionId,
};
use intake_flow::prompts;
use intake_flow::Conversation;
use intake_session::SessionStore;
use std::sync::Arc;
use tokio::sync::Mutex;

const SINK: &str = "1660333700";

/// Mock sink that records every message, optionally failing.
#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<ChannelMessage>>,
    fail: bool,
}

impl RecordingSink {
    async fn summaries(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|m| match &m.content {
                MessageContent::Text { text, .. } => Some(text.clone()),
                MessageContent::Attachment { .. } => None,
            })
            .collect()
    }

    async fn relays(&self) -> Vec<AttachmentRef> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|m| match &m.content {
                MessageContent::Attachment { attachment, .. } => Some(attachment.clone()),
                MessageContent::Text { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl Channel for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, message: ChannelMessage) -> IntakeResult<()> {
        if self.fail {
            return Err(IntakeError::Channel("sink unreachable".into()));
        }
        self.sent.lock().await.push(message);
        Ok(())
    }
}

fn conversation(sink: Arc<RecordingSink>) -> Conversation {
    let dispatcher = Arc::new(NotificationDispatcher::new(sink, SINK));
    Conversation::new(Arc::new(SessionStore::new()), dispatcher)
}

async fn send_all(conv: &Conversation, events: Vec<InboundEvent>) {
    for event in events {
        conv.handle(&event).await;
    }
}

fn paper_form(id: i64) -> Vec<InboundEvent> {
    vec![
        InboundEvent::text(id, "Ivan Petrov"),
        InboundEvent::text(id, "15.03.1990"),
        InboundEvent::text(id, "123456789012"),
        InboundEvent::text(id, "Оригинал на бумаге"),
    ]
}

#[tokio::test]
async fn test_end_to_end_paper_form() {
    let sink = Arc::new(RecordingSink::default());
    let conv = conversation(sink.clone());

    let mut events = paper_form(42);
    events.push(InboundEvent::attachment(42, AttachmentRef::photo("A")));
    send_all(&conv, events).await;

    assert_eq!(sink.relays().await, vec![AttachmentRef::photo("A")]);
    assert!(sink.summaries().await.is_empty());

    let prompts = conv.handle(&InboundEvent::text(42, "Чеков нет")).await;
    assert_eq!(prompts[0].text, prompts::THANKS);

    let summaries = sink.summaries().await;
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    for needle in [
        "ФИО: Ivan Petrov",
        "Дата рождения: 15.03.1990",
        "ИНН: 123456789012",
        "Получение: Оригинал на бумаге",
        "Email: —",
        "Чеков: 1",
        "User ID: 42",
    ] {
        assert!(summary.contains(needle), "missing {needle} in {summary}");
    }

    // The relay came before the summary.
    let sent = sink.sent.lock().await;
    assert!(matches!(sent[0].content, MessageContent::Attachment { .. }));
    assert!(sent.iter().all(|m| m.chat_id == SINK));
    drop(sent);

    assert!(conv.store().get(SessionId(42)).await.is_none());
}

#[tokio::test]
async fn test_email_form_carries_address() {
    let sink = Arc::new(RecordingSink::default());
    let conv = conversation(sink.clone());

    send_all(
        &conv,
        vec![
            InboundEvent::text(7, "Anna Ivanova"),
            InboundEvent::text(7, "01.01.1985"),
            InboundEvent::text(7, "1234567890"),
            InboundEvent::text(7, "На email"),
            InboundEvent::text(7, "anna@example.com"),
            InboundEvent::text(7, "done"),
        ],
    )
    .await;

    let summaries = sink.summaries().await;
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].contains("Email: anna@example.com"));
    assert!(summaries[0].contains("Чеков: 0"));
}

#[tokio::test]
async fn test_event_after_finalize_starts_a_new_session() {
    let sink = Arc::new(RecordingSink::default());
    let conv = conversation(sink.clone());

    send_all(&conv, paper_form(42)).await;
    conv.handle(&InboundEvent::text(42, "Чеков нет")).await;
    let first = sink.summaries().await.len();

    conv.handle(&InboundEvent::text(42, "Чеков нет")).await;

    let session = conv.store().get(SessionId(42)).await.unwrap();
    assert_eq!(first, 1);
    assert_eq!(sink.summaries().await.len(), 1, "no second dispatch");
    // A fresh pass that took the text as its first answer.
    assert_eq!(session.fields.full_name.as_deref(), Some("Чеков нет"));
    assert_eq!(session.fields.len(), 1);
    assert!(session.attachments.is_empty());
}

#[tokio::test]
async fn test_cancel_never_dispatches() {
    let steps = paper_form(5);
    for taken in 0..=steps.len() {
        let sink = Arc::new(RecordingSink::default());
        let conv = conversation(sink.clone());

        send_all(&conv, steps[..taken].to_vec()).await;
        let prompts = conv
            .handle(&InboundEvent::command(5, Command::Cancel))
            .await;

        assert_eq!(prompts[0].text, prompts::CANCELLED);
        assert!(conv.store().get(SessionId(5)).await.is_none());
        assert!(sink.sent.lock().await.is_empty(), "dispatch after {taken} steps");
    }
}

#[tokio::test]
async fn test_cancel_from_email_state() {
    let sink = Arc::new(RecordingSink::default());
    let conv = conversation(sink.clone());
    send_all(
        &conv,
        vec![
            InboundEvent::text(6, "Anna"),
            InboundEvent::text(6, "01.01.1985"),
            InboundEvent::text(6, "1234567890"),
            InboundEvent::text(6, "На email"),
        ],
    )
    .await;
    assert_eq!(
        conv.store().get(SessionId(6)).await.unwrap().state,
        FormState::Email
    );
    conv.handle(&InboundEvent::command(6, Command::Cancel)).await;
    assert!(conv.store().is_empty());
    assert!(sink.sent.lock().await.is_empty());
}

#[tokio::test]
async fn test_sink_failure_still_confirms_user() {
    let sink = Arc::new(RecordingSink {
        fail: true,
        ..Default::default()
    });
    let conv = conversation(sink);

    let mut events = paper_form(9);
    events.push(InboundEvent::attachment(9, AttachmentRef::photo("A")));
    send_all(&conv, events).await;
    assert_eq!(
        conv.store().get(SessionId(9)).await.unwrap().attachments.len(),
        1
    );

    let prompts = conv.handle(&InboundEvent::text(9, "Чеков нет")).await;
    assert_eq!(prompts[0].text, prompts::THANKS);
    assert!(conv.store().get(SessionId(9)).await.is_none());
}

#[tokio::test]
async fn test_restart_discards_fields() {
    let sink = Arc::new(RecordingSink::default());
    let conv = conversation(sink);
    send_all(&conv, paper_form(3)).await;

    let prompts = conv.handle(&InboundEvent::command(3, Command::Start)).await;
    assert_eq!(prompts[0].text, prompts::ASK_FULL_NAME);
    let session = conv.store().get(SessionId(3)).await.unwrap();
    assert_eq!(session.state, FormState::FullName);
    assert!(session.fields.is_empty());
}

#[tokio::test]
async fn test_answer_after_sweep_gets_restart_notice() {
    let sink = Arc::new(RecordingSink::default());
    let conv = conversation(sink);

    let first = conv.handle(&InboundEvent::text(8, "Ivan Petrov")).await;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].text, prompts::ASK_BIRTHDATE);

    let later = chrono::Utc::now() + chrono::Duration::hours(2);
    assert_eq!(conv.store().sweep_idle_at(later, chrono::Duration::hours(1)), 1);

    let reply = conv.handle(&InboundEvent::text(8, "15.03.1990")).await;
    assert_eq!(reply.len(), 2);
    assert_eq!(reply[0].text, prompts::SESSION_EXPIRED);
    assert_eq!(reply[1].text, prompts::ASK_BIRTHDATE);
    let session = conv.store().get(SessionId(8)).await.unwrap();
    assert_eq!(session.fields.full_name.as_deref(), Some("15.03.1990"));

    // Only the first event after the sweep carries the notice.
    let next = conv.handle(&InboundEvent::text(8, "01.01.1990")).await;
    assert!(next.iter().all(|p| p.text != prompts::SESSION_EXPIRED));
}

#[tokio::test]
async fn test_start_after_sweep_has_no_notice() {
    let sink = Arc::new(RecordingSink::default());
    let conv = conversation(sink);

    conv.handle(&InboundEvent::text(9, "Ivan Petrov")).await;
    let later = chrono::Utc::now() + chrono::Duration::hours(2);
    conv.store().sweep_idle_at(later, chrono::Duration::hours(1));

    let reply = conv.handle(&InboundEvent::command(9, Command::Start)).await;
    assert_eq!(reply.len(), 1);
    assert_eq!(reply[0].text, prompts::ASK_FULL_NAME);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_sessions_run_concurrently() {
    let sink = Arc::new(RecordingSink::default());
    let conv = Arc::new(conversation(sink.clone()));

    let mut tasks = Vec::new();
    for id in 100..120_i64 {
        let conv = conv.clone();
        tasks.push(tokio::spawn(async move {
            let events = vec![
                InboundEvent::text(id, format!("User {id}")),
                InboundEvent::text(id, "15.03.1990"),
                InboundEvent::text(id, format!("{:012}", id)),
                InboundEvent::text(id, "Оригинал на бумаге"),
                InboundEvent::attachment(id, AttachmentRef::photo(format!("r{id}"))),
            ];
            for event in events {
                conv.handle(&event).await;
                tokio::task::yield_now().await;
            }
        }));
    }
    for task in futures_util::future::join_all(tasks).await {
        task.unwrap();
    }

    for id in 100..120_i64 {
        let session = conv.store().get(SessionId(id)).await.unwrap();
        assert_eq!(session.state, FormState::Receipts);
        assert_eq!(session.fields.full_name, Some(format!("User {id}")));
        assert_eq!(session.fields.tax_id, Some(format!("{:012}", id)));
        assert_eq!(session.attachments, vec![AttachmentRef::photo(format!("r{id}"))]);
    }
    assert_eq!(sink.relays().await.len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attachments_for_one_session() {
    let sink = Arc::new(RecordingSink::default());
    let conv = Arc::new(conversation(sink.clone()));
    send_all(&conv, paper_form(77)).await;

    let mut tasks = Vec::new();
    for n in 0..25 {
        let conv = conv.clone();
        tasks.push(tokio::spawn(async move {
            conv.handle(&InboundEvent::attachment(
                77,
                AttachmentRef::photo(format!("p{n}")),
            ))
            .await
        }));
    }
    for task in futures_util::future::join_all(tasks).await {
        task.unwrap();
    }

    let session = conv.store().get(SessionId(77)).await.unwrap();
    assert_eq!(session.state, FormState::Receipts);
    assert_eq!(session.attachments.len(), 25);
    // Relays follow the order the session applied the attachments in.
    assert_eq!(sink.relays().await, session.attachments);
}
