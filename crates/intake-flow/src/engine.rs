use crate::prompts;
use crate::transition::{transition, Effect};
use chrono::Utc;
use intake_channels::NotificationDispatcher;
use intake_core::{EventPayload, InboundEvent, Prompt, SessionId};
use intake_session::SessionStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives sessions through the intake form.
///
/// Each event is applied while holding that session's lock in the
/// [`SessionStore`], so events for one user are strictly serialized while
/// other users proceed concurrently. Effects run at the tail of the same
/// critical section: a slow sink delays only the session it belongs to, and
/// a session's sink deliveries keep their event order.
pub struct Conversation {
    store: Arc<SessionStore>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl Conversation {
    pub fn new(store: Arc<SessionStore>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Applies one inbound event and returns the prompts for the user.
    ///
    /// Never fails: invalid input becomes a re-prompt and sink failures are
    /// logged without affecting the user-facing flow.
    pub async fn handle(&self, event: &InboundEvent) -> Vec<Prompt> {
        let session_id = event.session_id;
        let mut session = self.store.lock_or_create(session_id).await;
        if session.is_new() {
            info!(session_id = %session_id, "Session started");
        }
        // An answer meant for a swept form would otherwise be taken as the
        // first field of a new one without the user noticing.
        let restarted_by_sweep = session.replaces_expired()
            && !matches!(event.payload, EventPayload::Command { .. });
        if restarted_by_sweep {
            info!(session_id = %session_id, "Expired session restarted");
        }

        let from = session.state;
        let result = transition(&session, &event.payload, Utc::now());
        let to = result.session.state;

        match result.rejected {
            Some(reason) => debug!(
                session_id = %session_id,
                state = from.as_str(),
                kind = event.payload.kind(),
                reason = %reason,
                "Input rejected"
            ),
            None => debug!(
                session_id = %session_id,
                from = from.as_str(),
                to = to.as_str(),
                "Transition"
            ),
        }

        let evict = result.evicts();
        *session = result.session;
        session.touch();

        for effect in result.effects {
            self.run_effect(session_id, effect).await;
        }

        if evict {
            let last = session.evict();
            info!(
                session_id = %session_id,
                state = last.state.as_str(),
                attachments = last.attachment_count(),
                "Session closed"
            );
        }

        let mut replies = result.prompts;
        if restarted_by_sweep {
            replies.insert(0, Prompt::text(prompts::SESSION_EXPIRED));
        }
        replies
    }

    async fn run_effect(&self, session_id: SessionId, effect: Effect) {
        match effect {
            Effect::RelayAttachment { attachment } => {
                if let Err(e) = self
                    .dispatcher
                    .relay_attachment(session_id, &attachment)
                    .await
                {
                    warn!(session_id = %session_id, error = %e, "Receipt relay failed");
                }
            }
            Effect::DispatchSummary { record } => {
                if let Err(e) = self.dispatcher.dispatch_summary(&record).await {
                    warn!(
                        session_id = %session_id,
                        request_id = %record.request_id,
                        error = %e,
                        "Summary dispatch failed"
                    );
                }
            }
            // Applied by the caller once every other effect has run.
            Effect::Evict => {}
        }
    }
}
