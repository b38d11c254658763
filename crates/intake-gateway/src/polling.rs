use crate::lanes::SessionLanes;
use intake_channels::TelegramChannel;
use intake_core::{InboundEvent, IntakeError, IntakeResult};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Long-polls Telegram and feeds every update into `lanes`.
///
/// `events` must be the receiver taken from `telegram`. Returns when
/// polling stops, with the error that stopped it.
pub async fn run_polling(
    telegram: Arc<TelegramChannel>,
    mut events: mpsc::Receiver<InboundEvent>,
    lanes: Arc<SessionLanes>,
) -> IntakeResult<()> {
    let mut poller = tokio::spawn(async move { telegram.poll_updates().await });
    info!("Polling Telegram for updates");

    loop {
        tokio::select! {
            Some(event) = events.recv() => lanes.submit(event),
            joined = &mut poller => {
                return joined
                    .map_err(|e| IntakeError::Gateway(format!("poller task failed: {e}")))?;
            }
        }
    }
}
