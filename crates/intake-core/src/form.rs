use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The step of the intake form a session is currently waiting on.
///
/// States advance strictly in declaration order, except that `DeliveryMethod`
/// skips `Email` when paper delivery is chosen, `Receipts` loops on itself
/// while attachments arrive, and `Cancelled` is reachable from every
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    /// Waiting for the user's full name.
    FullName,
    /// Waiting for the birth date.
    Birthdate,
    /// Waiting for the tax id.
    TaxId,
    /// Waiting for the delivery method choice.
    DeliveryMethod,
    /// Waiting for the e-mail address.
    Email,
    /// Collecting receipt attachments until a terminator phrase.
    Receipts,
    /// The form is complete and the record is being dispatched.
    Finalize,
    /// The user abandoned the form.
    Cancelled,
}

impl FormState {
    /// The state every fresh session starts in.
    pub const INITIAL: FormState = FormState::FullName;

    /// Returns true for `Finalize` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalize | Self::Cancelled)
    }

    /// Whether `self -> next` is an edge of the form's transition graph.
    ///
    /// Staying in the same non-terminal state is always allowed (validation
    /// failure, or another attachment in `Receipts`).
    pub fn can_transition_to(self, next: FormState) -> bool {
        use FormState::*;
        if self.is_terminal() {
            return false;
        }
        if self == next || next == Cancelled {
            return true;
        }
        matches!(
            (self, next),
            (FullName, Birthdate)
                | (Birthdate, TaxId)
                | (TaxId, DeliveryMethod)
                | (DeliveryMethod, Email)
                | (DeliveryMethod, Receipts)
                | (Email, Receipts)
                | (Receipts, Finalize)
        )
    }

    /// Stable snake_case name, for logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::Birthdate => "birthdate",
            Self::TaxId => "tax_id",
            Self::DeliveryMethod => "delivery_method",
            Self::Email => "email",
            Self::Receipts => "receipts",
            Self::Finalize => "finalize",
            Self::Cancelled => "cancelled",
        }
    }
}

/// How the user wants to receive the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    /// A paper original.
    Paper,
    /// An electronic copy by e-mail.
    Email,
}

impl DeliveryMethod {
    /// All options, in the order they are offered.
    pub const ALL: [DeliveryMethod; 2] = [DeliveryMethod::Paper, DeliveryMethod::Email];

    /// The exact reply-keyboard label the user has to send.
    pub fn label(self) -> &'static str {
        match self {
            Self::Paper => "Оригинал на бумаге",
            Self::Email => "На email",
        }
    }

    /// Looks up an option by its exact label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }
}

/// Validated field values accumulated while the form is filled in.
///
/// A field is only ever set by the transition out of its own state, so the
/// set of populated fields always matches the states already passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields {
    /// Full name, trimmed.
    pub full_name: Option<String>,
    /// Birth date.
    pub birthdate: Option<NaiveDate>,
    /// Tax id digits.
    pub tax_id: Option<String>,
    /// Chosen delivery method.
    pub delivery: Option<DeliveryMethod>,
    /// E-mail address; stays `None` on the paper path.
    pub email: Option<String>,
}

impl FormFields {
    /// Number of populated fields.
    pub fn len(&self) -> usize {
        [
            self.full_name.is_some(),
            self.birthdate.is_some(),
            self.tax_id.is_some(),
            self.delivery.is_some(),
            self.email.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Returns true when no field has been collected yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
