//! Pure state transition function
//!
//! Given the same session, payload and clock reading, [`transition`] always
//! produces the same result and performs no I/O. Everything that touches the
//! outside world is returned as an [`Effect`] for the engine to run.

use crate::prompts;
use chrono::{DateTime, Utc};
use intake_core::{
    validate, AttachmentRef, Command, DeliveryMethod, EventPayload, FinalRecord, FormState,
    Prompt, ValidationError,
};
use intake_session::Session;
use uuid::Uuid;

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Forward one receipt to the notification sink.
    RelayAttachment { attachment: AttachmentRef },
    /// Deliver the completed record to the notification sink.
    DispatchSummary { record: FinalRecord },
    /// Remove the session from the store.
    Evict,
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    /// The session as it should be stored after this event.
    pub session: Session,
    /// Messages for the end user, in order.
    pub prompts: Vec<Prompt>,
    /// Effects to run, in order.
    pub effects: Vec<Effect>,
    /// Set when the event was rejected as input for the current state.
    pub rejected: Option<ValidationError>,
}

impl TransitionResult {
    fn new(session: Session) -> Self {
        Self {
            session,
            prompts: vec![],
            effects: vec![],
            rejected: None,
        }
    }

    fn with_prompt(mut self, prompt: Prompt) -> Self {
        self.prompts.push(prompt);
        self
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn advance(mut self, state: FormState) -> Self {
        self.session.state = state;
        self.with_prompt(prompts::ask(state))
    }

    fn reject(mut self, reason: ValidationError) -> Self {
        self.rejected = Some(reason);
        let state = self.session.state;
        self.with_prompt(prompts::reprompt(state, reason))
    }

    /// Whether the session is to be removed once the effects have run.
    pub fn evicts(&self) -> bool {
        self.effects.contains(&Effect::Evict)
    }
}

/// Computes the next session value, prompts and effects for one payload.
///
/// Total over every `(state, payload)` pair: combinations the form does not
/// expect re-prompt at the current state instead of failing.
pub fn transition(
    session: &Session,
    payload: &EventPayload,
    now: DateTime<Utc>,
) -> TransitionResult {
    let result = TransitionResult::new(session.clone());

    // A terminal session is evicted in the same critical section that
    // entered it, so this only fires if that invariant is broken.
    if session.state.is_terminal() {
        return result.with_effect(Effect::Evict);
    }

    match (session.state, payload) {
        (_, EventPayload::Command { command: Command::Cancel }) => {
            let mut result = result
                .with_prompt(Prompt::clearing(prompts::CANCELLED))
                .with_effect(Effect::Evict);
            result.session.state = FormState::Cancelled;
            result
        }

        (_, EventPayload::Command { command: Command::Start }) => restart(result),

        (FormState::FullName, EventPayload::Text { text }) => match validate::full_name(text) {
            Ok(name) => {
                let mut result = result;
                result.session.fields.full_name = Some(name);
                result.advance(FormState::Birthdate)
            }
            Err(reason) => result.reject(reason),
        },

        (FormState::Birthdate, EventPayload::Text { text }) => match validate::birthdate(text) {
            Ok(date) => {
                let mut result = result;
                result.session.fields.birthdate = Some(date);
                result.advance(FormState::TaxId)
            }
            Err(reason) => result.reject(reason),
        },

        (FormState::TaxId, EventPayload::Text { text }) => match validate::tax_id(text) {
            Ok(tax_id) => {
                let mut result = result;
                result.session.fields.tax_id = Some(tax_id);
                result.advance(FormState::DeliveryMethod)
            }
            Err(reason) => result.reject(reason),
        },

        (FormState::DeliveryMethod, EventPayload::Text { text }) => {
            match validate::delivery_method(text) {
                Ok(method) => {
                    let mut result = result;
                    result.session.fields.delivery = Some(method);
                    let next = match method {
                        DeliveryMethod::Email => FormState::Email,
                        DeliveryMethod::Paper => FormState::Receipts,
                    };
                    result.advance(next)
                }
                Err(reason) => result.reject(reason),
            }
        }

        (FormState::Email, EventPayload::Text { text }) => match validate::email(text) {
            Ok(address) => {
                let mut result = result;
                result.session.fields.email = Some(address);
                result.advance(FormState::Receipts)
            }
            Err(reason) => result.reject(reason),
        },

        (FormState::Receipts, EventPayload::Attachment { attachment }) => {
            let mut result = result;
            result.session.attachments.push(attachment.clone());
            let count = result.session.attachments.len();
            result
                .with_prompt(prompts::receipt_received(count))
                .with_effect(Effect::RelayAttachment {
                    attachment: attachment.clone(),
                })
        }

        (FormState::Receipts, EventPayload::Text { text }) => match validate::terminator(text) {
            Ok(()) => finalize(result, now),
            Err(reason) => result.reject(reason),
        },

        // Attachments anywhere but the receipts step.
        (_, EventPayload::Attachment { .. }) => result.reject(ValidationError::ExpectedText),

        (FormState::Finalize | FormState::Cancelled, EventPayload::Text { .. }) => {
            result.with_effect(Effect::Evict)
        }
    }
}

/// Builds the record for a session that has passed every field state.
pub fn final_record(session: &Session, completed_at: DateTime<Utc>) -> Option<FinalRecord> {
    let fields = &session.fields;
    Some(FinalRecord {
        request_id: Uuid::new_v4(),
        session_id: session.session_id,
        full_name: fields.full_name.clone()?,
        birthdate: fields.birthdate?,
        tax_id: fields.tax_id.clone()?,
        delivery: fields.delivery?,
        email: fields.email.clone(),
        attachments: session.attachments.clone(),
        completed_at,
    })
}

fn finalize(mut result: TransitionResult, now: DateTime<Utc>) -> TransitionResult {
    match final_record(&result.session, now) {
        Some(record) => {
            result.session.state = FormState::Finalize;
            result
                .with_prompt(Prompt::clearing(prompts::THANKS))
                .with_effect(Effect::DispatchSummary { record })
                .with_effect(Effect::Evict)
        }
        None => {
            let result = result.with_prompt(Prompt::text(prompts::INCOMPLETE));
            restart(result)
        }
    }
}

fn restart(mut result: TransitionResult) -> TransitionResult {
    let session = &mut result.session;
    session.state = FormState::INITIAL;
    session.fields = Default::default();
    session.attachments.clear();
    result.with_prompt(prompts::ask(FormState::INITIAL))
}
