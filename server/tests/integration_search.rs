use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use lyricsir_core::latent::{CancelToken, DenseMatrix, Factorization, Factorizer, JacobiSvd};
use lyricsir_core::{EngineConfig, EngineError, SearchEngine};
use serde_json::Value;
use std::sync::{mpsc, Arc, Mutex};
use tower::ServiceExt;

fn love_corpus() -> Vec<(String, String)> {
    [("d/1", "love love song"), ("d/2", "love is blind"), ("d/3", "war and peace")]
        .iter()
        .map(|(l, t)| (l.to_string(), t.to_string()))
        .collect()
}

fn config() -> EngineConfig { EngineConfig { latent_dimensions: 10, ..EngineConfig::default() } }

/// Jacobi SVD that waits for a signal before it starts.
struct Gated {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl Factorizer for Gated {
    fn factorize(&self, matrix: &DenseMatrix, k: usize, cancel: &CancelToken) -> Result<Factorization, EngineError> {
        let _ = self.gate.lock().unwrap().recv();
        JacobiSvd.factorize(matrix, k, cancel)
    }
}

fn gated_engine() -> (SearchEngine, mpsc::Sender<()>) {
    let (tx, rx) = mpsc::channel();
    let engine = SearchEngine::build_with(love_corpus(), config(), Arc::new(Gated { gate: Mutex::new(rx) }));
    (engine, tx)
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Bytes) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn doc_ids(json: &Value) -> Vec<u64> {
    json["results"].as_array().unwrap().iter().map(|hit| hit["doc_id"].as_u64().unwrap()).collect()
}

#[tokio::test]
async fn health_is_ok() {
    let app = server::router(SearchEngine::build(love_corpus(), config()), None);
    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn vector_search_returns_ranked_results() {
    let app = server::router(SearchEngine::build(love_corpus(), config()), None);
    let (status, body) = get(app, "/search/vector?q=love&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(doc_ids(&json), vec![1, 2]);
    assert_eq!(json["total_hits"], 3);
    assert_eq!(json["results"][0]["label"], "d/1");
    let s0 = json["results"][0]["score"].as_f64().unwrap();
    let s1 = json["results"][1]["score"].as_f64().unwrap();
    assert!(s0 > s1 && s1 > 0.0);
}

#[tokio::test]
async fn boolean_phrase_and_exact_search() {
    let app = server::router(SearchEngine::build(love_corpus(), config()), None);

    let (_, body) = get(app.clone(), "/search/boolean?q=love%20and%20blind").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(doc_ids(&json), vec![2]);
    assert!(json["results"][0].get("score").is_none());

    let (_, body) = get(app.clone(), "/search/boolean?q=not%20love").await;
    assert_eq!(doc_ids(&serde_json::from_slice(&body).unwrap()), vec![3]);

    let (_, body) = get(app.clone(), "/search/phrase?q=love+song").await;
    assert_eq!(doc_ids(&serde_json::from_slice(&body).unwrap()), vec![1]);

    // stopwords are dropped before positions are assigned
    let (_, body) = get(app.clone(), "/search/exact?q=%22love%20is%20blind%22").await;
    assert_eq!(doc_ids(&serde_json::from_slice(&body).unwrap()), vec![2]);

    let (_, body) = get(app, "/search/exact?q=%22blind%20love%22").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 0);
    assert!(doc_ids(&json).is_empty());
}

#[tokio::test]
async fn latent_search_after_build() {
    let engine = SearchEngine::build(love_corpus(), config());
    engine.latent().wait().unwrap();
    let app = server::router(engine, None);

    let (status, body) = get(app.clone(), "/search/latent?q=love").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 3);
    assert_eq!(doc_ids(&json)[2], 3);
    assert!(json["results"][2]["score"].as_f64().unwrap().abs() < 1e-9);

    let (_, body) = get(app, "/status").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["latent"], "ready");
    assert_eq!(json["documents"], 3);
}

#[tokio::test]
async fn latent_search_is_unavailable_while_building() {
    let (engine, release) = gated_engine();
    let app = server::router(engine.clone(), None);

    let (status, _) = get(app.clone(), "/search/latent?q=love").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (_, body) = get(app.clone(), "/status").await;
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap()["latent"], "building");

    release.send(()).unwrap();
    engine.latent().wait().unwrap();
    let (status, _) = get(app, "/search/latent?q=love").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_cancel_requires_token_and_fails_the_build() {
    let (engine, release) = gated_engine();
    let app = server::router(engine.clone(), Some("secret".into()));

    let unauthorized = Request::post("/admin/latent/cancel").body(Body::empty()).unwrap();
    let (status, _) = call(app.clone(), unauthorized).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authorized =
        Request::post("/admin/latent/cancel").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, _) = call(app.clone(), authorized).await;
    assert_eq!(status, StatusCode::OK);

    release.send(()).unwrap();
    assert!(matches!(engine.latent().wait(), Err(EngineError::LatentCancelled)));
    let (status, _) = get(app.clone(), "/search/latent?q=love").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (_, body) = get(app, "/status").await;
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap()["latent"], "failed");
}

#[tokio::test]
async fn doc_lookup() {
    let app = server::router(SearchEngine::build(love_corpus(), config()), None);
    let (status, body) = get(app.clone(), "/doc/2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["label"], "d/2");

    let (status, _) = get(app, "/doc/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
