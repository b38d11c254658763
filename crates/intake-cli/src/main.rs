//! `intake` binary: runs the Telegram intake bot.

mod config;

use clap::{Parser, Subcommand};
use config::IntakeConfig;
use intake_channels::{NotificationDispatcher, TelegramChannel};
use intake_flow::Conversation;
use intake_gateway::{run_polling, AppState, GatewayServer, MessageRouter, SessionLanes};
use intake_session::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Capacity of the buffer between the poller and the session lanes.
const EVENT_BUFFER: usize = 256;

#[derive(Parser)]
#[command(name = "intake", about = "Telegram intake bot for tax-deduction certificate requests")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "intake.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the Telegram webhook
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Long-poll Telegram for updates
    Poll,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = IntakeConfig::load(&cli.config)?;

    let mut telegram = TelegramChannel::new(config.telegram.bot_token.clone(), EVENT_BUFFER)
        .with_api_base(config.telegram.api_base_url.clone())
        .with_polling(config.telegram.poll_timeout_secs, Duration::from_secs(5));
    let events = telegram.take_event_receiver();
    let telegram = Arc::new(telegram);

    let store = Arc::new(SessionStore::new());
    let sweeper = store
        .clone()
        .spawn_sweeper(config.sessions.sweep_interval(), config.sessions.idle_ttl());

    let dispatcher = Arc::new(NotificationDispatcher::new(
        telegram.clone(),
        config.telegram.admin_chat_id,
    ));
    let conversation = Conversation::new(store, dispatcher);
    let router = Arc::new(MessageRouter::new(conversation, telegram.clone()));
    let lanes = SessionLanes::new(
        router,
        Duration::from_secs(config.server.lane_idle_secs.max(1)),
    );

    info!(
        admin_chat_id = config.telegram.admin_chat_id,
        idle_ttl_secs = config.sessions.idle_ttl_secs,
        "Intake bot configured"
    );

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            let state = AppState::new(lanes, config.server.webhook_secret);
            if state.webhook_secret.is_none() {
                warn!("No webhook secret configured; accepting unauthenticated updates");
            }
            let app = GatewayServer::build(state);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(%addr, "Intake gateway listening");
            axum::serve(listener, app).await?;
        }
        Commands::Poll => {
            let events = events
                .ok_or_else(|| anyhow::anyhow!("Telegram event receiver already taken"))?;
            run_polling(telegram, events, lanes).await?;
        }
    }

    sweeper.abort();
    Ok(())
}
