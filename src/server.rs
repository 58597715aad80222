//! HTTP chat surface.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::answer::{AnswerOptions, AnswerService};
use crate::document::ScoredRecord;
use crate::error::RagError;
use crate::prompt::ChatMode;
use crate::session::{ChatSession, ChatTurn};

pub struct AppState {
    service: AnswerService,
    session: Mutex<ChatSession>,
    defaults: AnswerOptions,
}

impl AppState {
    pub fn new(service: AnswerService, defaults: AnswerOptions) -> Self {
        Self {
            service,
            session: Mutex::new(ChatSession::new()),
            defaults,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub temperature: Option<f32>,
    pub mode: Option<ChatMode>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<ScoredRecord>,
    pub history: Vec<ChatTurn>,
}

pub struct ApiError(RagError);

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::BAD_GATEWAY
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/history", get(history).delete(clear_history))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "chat server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let options = AnswerOptions {
        temperature: payload.temperature.unwrap_or(state.defaults.temperature),
        mode: payload.mode.unwrap_or(state.defaults.mode),
    };

    // Held for the whole turn so questions are answered one at a time.
    let mut session = state.session.lock().await;
    let answer = state
        .service
        .handle_turn(&mut session, &payload.message, options)
        .await?;

    Ok(Json(ChatResponse {
        answer: answer.answer,
        sources: answer.sources,
        history: session.turns().to_vec(),
    }))
}

pub async fn history(State(state): State<Arc<AppState>>) -> Json<Vec<ChatTurn>> {
    Json(state.session.lock().await.turns().to_vec())
}

pub async fn clear_history(State(state): State<Arc<AppState>>) -> StatusCode {
    state.session.lock().await.clear();
    info!("chat history cleared");
    StatusCode::NO_CONTENT
}

pub async fn health() -> &'static str {
    "ok"
}
