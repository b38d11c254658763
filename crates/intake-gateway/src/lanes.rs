use crate::router::MessageRouter;
use intake_core::{InboundEvent, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Ordered event lanes, one per active session.
///
/// Every session with pending events owns a worker task fed by an unbounded
/// queue. Events submitted for the same session are handled one at a time
/// in submission order; events for different sessions never wait on each
/// other. A worker that stays idle for `idle_timeout` retires its lane.
pub struct SessionLanes {
    lanes: Mutex<HashMap<SessionId, mpsc::UnboundedSender<InboundEvent>>>,
    router: Arc<MessageRouter>,
    idle_timeout: Duration,
}

impl SessionLanes {
    pub fn new(router: Arc<MessageRouter>, idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            lanes: Mutex::new(HashMap::new()),
            router,
            idle_timeout,
        })
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    /// Queues an event behind any earlier events of the same session.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(self: &Arc<Self>, event: InboundEvent) {
        let session_id = event.session_id;
        let mut lanes = self.lanes.lock();

        let event = match lanes.get(&session_id) {
            Some(tx) => match tx.send(event) {
                Ok(()) => return,
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(event);
        lanes.insert(session_id, tx);
        drop(lanes);

        debug!(session_id = %session_id, "Lane opened");
        tokio::spawn(self.clone().drain(session_id, rx));
    }

    /// Number of sessions with a live worker.
    pub fn active(&self) -> usize {
        self.lanes.lock().len()
    }

    async fn drain(
        self: Arc<Self>,
        session_id: SessionId,
        mut rx: mpsc::UnboundedReceiver<InboundEvent>,
    ) {
        loop {
            let event = match tokio::time::timeout(self.idle_timeout, rx.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(_) => match self.take_or_retire(session_id, &mut rx) {
                    Some(event) => event,
                    None => break,
                },
            };
            self.router.handle_event(event).await;
        }
        debug!(session_id = %session_id, "Lane closed");
    }

    /// Submitters send under the map lock, so a queue found empty here
    /// stays empty until the entry is gone.
    fn take_or_retire(
        &self,
        session_id: SessionId,
        rx: &mut mpsc::UnboundedReceiver<InboundEvent>,
    ) -> Option<InboundEvent> {
        let mut lanes = self.lanes.lock();
        match rx.try_recv() {
            Ok(event) => Some(event),
            Err(_) => {
                lanes.remove(&session_id);
                None
            }
        }
    }
}
