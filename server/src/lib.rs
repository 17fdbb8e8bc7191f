use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use lyricsir_core::corpus::load_corpus;
use lyricsir_core::{DocId, EngineConfig, EngineError, Ranking, SearchEngine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: SearchEngine,
    pub admin_token: Option<String>,
}

/// Load the corpus, build the engine and wire the routes.
pub fn build_app(corpus_dir: &std::path::Path, config: EngineConfig) -> Result<Router> {
    let corpus = load_corpus(corpus_dir)?;
    let engine = SearchEngine::build(corpus, config);
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(engine, admin_token))
}

pub fn router(engine: SearchEngine, admin_token: Option<String>) -> Router {
    let app_state = AppState { engine, admin_token };
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/status", get(status_handler))
        .route("/search/boolean", get(boolean_handler))
        .route("/search/phrase", get(phrase_handler))
        .route("/search/exact", get(exact_handler))
        .route("/search/vector", get(vector_handler))
        .route("/search/latent", get(latent_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/admin/latent/cancel", post(cancel_latent))
        .with_state(app_state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

// CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|val| val.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let index = state.engine.index();
    let mut obj = serde_json::json!({
        "documents": index.num_docs(),
        "terms": index.num_terms(),
        "config": state.engine.config(),
    });
    match state.engine.latent().try_get() {
        Ok(model) => {
            obj["latent"] = "ready".into();
            obj["latent_dimensions"] = model.k().into();
        }
        Err(EngineError::LatentNotReady) => obj["latent"] = "building".into(),
        Err(err) => {
            obj["latent"] = "failed".into();
            obj["latent_error"] = err.to_string().into();
        }
    }
    Json(obj)
}

pub async fn boolean_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = Instant::now();
    let docs = state.engine.submit_boolean(&params.q);
    Json(set_response(&state.engine, params, &docs, start))
}

pub async fn phrase_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = Instant::now();
    let docs = state.engine.submit_phrase(&params.q);
    Json(set_response(&state.engine, params, &docs, start))
}

pub async fn exact_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = Instant::now();
    let docs = state.engine.submit_exact(&params.q);
    Json(set_response(&state.engine, params, &docs, start))
}

pub async fn vector_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = Instant::now();
    let ranked = state.engine.submit_vector(&params.q);
    Json(ranked_response(&state.engine, params, &ranked, start))
}

/// Never blocks: answers 503 while the SVD job is still running.
pub async fn latent_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = Instant::now();
    let ranked = state.engine.try_submit_latent(&params.q).map_err(|err| {
        let status = match err {
            EngineError::LatentNotReady => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, err.to_string())
    })?;
    Ok(Json(ranked_response(&state.engine, params, &ranked, start)))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match state.engine.label(doc_id) {
        Some(label) => Ok(Json(serde_json::json!({ "doc_id": doc_id, "label": label }))),
        None => Err((StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" })))),
    }
}

fn set_response(engine: &SearchEngine, params: SearchParams, docs: &BTreeSet<DocId>, start: Instant) -> SearchResponse {
    let results = docs
        .iter()
        .take(clamp_k(params.k))
        .filter_map(|&doc_id| engine.label(doc_id).map(|label| SearchHit { doc_id, label: label.to_string(), score: None }))
        .collect();
    SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits: docs.len(), results }
}

fn ranked_response(engine: &SearchEngine, params: SearchParams, ranked: &Ranking, start: Instant) -> SearchResponse {
    let results = ranked
        .iter()
        .take(clamp_k(params.k))
        .filter_map(|&(doc_id, score)| {
            engine.label(doc_id).map(|label| SearchHit { doc_id, label: label.to_string(), score: Some(score) })
        })
        .collect();
    SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits: ranked.len(), results }
}

fn clamp_k(k: usize) -> usize { k.clamp(1, MAX_K) }

// --- Admin endpoints ---
async fn cancel_latent(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    state.engine.latent().cancel();
    tracing::info!("latent build cancel requested");
    Ok(Json(serde_json::json!({ "cancelled": true, "ready": state.engine.latent().is_ready() })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
