use intake_channels::{Channel, ChannelMessage};
use intake_core::InboundEvent;
use intake_flow::Conversation;
use std::sync::Arc;
use tracing::warn;

/// Routes inbound events to the conversation engine and sends the
/// resulting prompts back to the user.
pub struct MessageRouter {
    conversation: Conversation,
    replies: Arc<dyn Channel>,
}

impl MessageRouter {
    pub fn new(conversation: Conversation, replies: Arc<dyn Channel>) -> Self {
        Self {
            conversation,
            replies,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Applies the event and delivers every prompt in order.
    ///
    /// A failed reply is logged and the remaining prompts are still sent.
    pub async fn handle_event(&self, event: InboundEvent) {
        let prompts = self.conversation.handle(&event).await;
        for prompt in prompts {
            let message = ChannelMessage::prompt(event.chat_id, prompt);
            if let Err(e) = self.replies.send(message).await {
                warn!(
                    session_id = %event.session_id,
                    chat_id = event.chat_id,
                    channel = self.replies.name(),
                    error = %e,
                    "Failed to deliver prompt"
                );
            }
        }
    }
}
