use chrono::{DateTime, Utc};
use intake_core::{AttachmentRef, FormFields, FormState, SessionId};
use serde::{Deserialize, Serialize};

/// One user's in-progress pass through the intake form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub state: FormState,
    pub fields: FormFields,
    pub attachments: Vec<AttachmentRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session in the initial state with nothing collected.
    pub fn new(session_id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            state: FormState::INITIAL,
            fields: FormFields::default(),
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    /// Whether the session has been idle for at least `max_idle` at `now`.
    pub fn is_idle(&self, now: DateTime<Utc>, max_idle: chrono::Duration) -> bool {
        now.signed_duration_since(self.updated_at) >= max_idle
    }
}
