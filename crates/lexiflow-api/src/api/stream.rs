//! NDJSON streaming endpoints
//!
//! Every handler validates its request, builds a prompt and hands the
//! process-wide generator to a [`StreamProducer`]. The producer task writes
//! records into the response body as they are generated.

use crate::api::AppState;
use crate::prompts;
use axum::{
    Router,
    body::Body,
    extract::{Json, State},
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use lexiflow_common::{
    DEFAULT_RECORD_COUNT, LexiflowError, NDJSON_CONTENT_TYPE, clamp_count, routes, truncate_string,
};
use lexiflow_llm::GenerationRequest;
use lexiflow_stream::catalog::{evaluation_contract, product_contract, vocabulary_contract};
use lexiflow_stream::{ShapeContract, StreamProducer};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct VocabularyRequest {
    #[serde(default)]
    pub topic: String,
    pub count: Option<usize>,
    pub level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    #[serde(default)]
    pub query: String,
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    #[serde(default)]
    pub question: String,
    pub context: Option<String>,
}

fn require(field: &str, value: &str) -> Result<(), LexiflowError> {
    if value.trim().is_empty() {
        return Err(LexiflowError::InvalidRequest(format!(
            "'{}' must not be empty",
            field
        )));
    }
    Ok(())
}

fn bad_request(err: LexiflowError) -> (StatusCode, String) {
    debug!("Rejecting request: {}", err);
    (StatusCode::BAD_REQUEST, err.to_string())
}

impl AppState {
    fn request(&self, prompt: String) -> GenerationRequest {
        let request = GenerationRequest::new(prompt);
        match &self.system_prompt {
            Some(system) => request.with_system(system.clone()),
            None => request.with_system(prompts::DEFAULT_SYSTEM_PROMPT),
        }
    }

    fn domain_producer(&self, contract: ShapeContract) -> StreamProducer {
        StreamProducer::domain(self.generator.clone(), contract).with_config(&self.stream)
    }
}

/// Wrap a running producer as a chunked NDJSON response
fn ndjson_response(producer: StreamProducer, request: GenerationRequest) -> Response {
    let body = Body::from_stream(producer.spawn(request).into_body());
    (
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response()
}

/// POST /api/stream/vocabulary
pub async fn stream_vocabulary(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VocabularyRequest>,
) -> Result<Response, (StatusCode, String)> {
    require("topic", &request.topic).map_err(bad_request)?;
    let count = clamp_count(request.count, DEFAULT_RECORD_COUNT, state.stream.max_records);
    info!("Vocabulary stream: topic={}, count={}", request.topic, count);

    let prompt = prompts::vocabulary(request.topic.trim(), count, request.level.as_deref());
    let producer = state.domain_producer(vocabulary_contract()).with_record_limit(count);
    Ok(ndjson_response(producer, state.request(prompt)))
}

/// POST /api/stream/products
pub async fn stream_products(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProductRequest>,
) -> Result<Response, (StatusCode, String)> {
    require("query", &request.query).map_err(bad_request)?;
    let count = clamp_count(request.count, DEFAULT_RECORD_COUNT, state.stream.max_records);
    info!("Product stream: query={}, count={}", request.query, count);

    let prompt = prompts::products(request.query.trim(), count);
    let producer = state.domain_producer(product_contract()).with_record_limit(count);
    Ok(ndjson_response(producer, state.request(prompt)))
}

/// POST /api/stream/evaluation
pub async fn stream_evaluation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EvaluationRequest>,
) -> Result<Response, (StatusCode, String)> {
    require("task", &request.task).map_err(bad_request)?;
    require("answer", &request.answer).map_err(bad_request)?;
    info!("Evaluation stream: task={}", truncate_string(&request.task, 60));

    let prompt = prompts::evaluation(request.task.trim(), request.answer.trim());
    let producer = state.domain_producer(evaluation_contract()).with_record_limit(1);
    Ok(ndjson_response(producer, state.request(prompt)))
}

/// POST /api/stream/answer
pub async fn stream_answer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnswerRequest>,
) -> Result<Response, (StatusCode, String)> {
    require("question", &request.question).map_err(bad_request)?;
    info!("Answer stream: question={}", truncate_string(&request.question, 60));

    let prompt = prompts::answer(request.question.trim(), request.context.as_deref());
    let producer = StreamProducer::frames(state.generator.clone()).with_config(&state.stream);
    Ok(ndjson_response(producer, state.request(prompt)))
}

pub fn stream_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(routes::VOCABULARY, post(stream_vocabulary))
        .route(routes::PRODUCTS, post(stream_products))
        .route(routes::EVALUATION, post(stream_evaluation))
        .route(routes::ANSWER, post(stream_answer))
}
