use crate::lanes::SessionLanes;
use crate::webhook::telegram_webhook;
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use intake_session::SessionStore;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub lanes: Arc<SessionLanes>,
    pub sessions: Arc<SessionStore>,
    /// Expected value of the webhook secret header; `None` accepts any request.
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(lanes: Arc<SessionLanes>, webhook_secret: Option<String>) -> Arc<Self> {
        let sessions = lanes.router().conversation().store().clone();
        Arc::new(Self {
            lanes,
            sessions,
            webhook_secret: webhook_secret.filter(|s| !s.is_empty()),
        })
    }
}

/// The main gateway server.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router serving `/health` and `/telegram/webhook`.
    pub fn build(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/telegram/webhook", post(telegram_webhook))
            .with_state(state)
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "intake",
        "sessions": state.sessions.len(),
    }))
}
