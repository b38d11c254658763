use crate::event::{AttachmentRef, SessionId};
use crate::form::DeliveryMethod;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed intake form, handed to the notification sink once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalRecord {
    /// Reference number for operator follow-up.
    pub request_id: Uuid,
    /// The user the form belongs to.
    pub session_id: SessionId,
    /// Full name.
    pub full_name: String,
    /// Birth date.
    pub birthdate: NaiveDate,
    /// Tax id digits.
    pub tax_id: String,
    /// Chosen delivery method.
    pub delivery: DeliveryMethod,
    /// E-mail address, present only on the e-mail path.
    pub email: Option<String>,
    /// Receipts, in arrival order.
    pub attachments: Vec<AttachmentRef>,
    /// When the terminator phrase was received.
    pub completed_at: DateTime<Utc>,
}

impl FinalRecord {
    /// Number of receipts attached to the request.
    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }
}
