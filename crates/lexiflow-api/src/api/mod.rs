//! HTTP surface of the Lexiflow server

pub mod stream;

use axum::{Json, Router, extract::State, routing::get};
use lexiflow_common::{LexiflowConfig, StreamConfig, routes};
use lexiflow_llm::TextGenerator;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state: the process-wide generator plus streaming settings
pub struct AppState {
    pub generator: Arc<dyn TextGenerator>,
    pub stream: StreamConfig,
    pub system_prompt: Option<String>,
}

impl AppState {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &LexiflowConfig) -> Self {
        Self {
            generator,
            stream: config.stream.clone(),
            system_prompt: config.provider.system_prompt.clone(),
        }
    }
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "generator": state.generator.name(),
    }))
}

/// All routes with tracing and permissive CORS
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health))
        .merge(stream::stream_routes())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
