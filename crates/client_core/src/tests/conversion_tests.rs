use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tokio::sync::{oneshot, Mutex};

use super::*;
use crate::test_support::{client, endpoint, spawn_server, unreachable_server};

const WAV_BYTES: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

#[derive(Clone)]
struct CaptureState {
    tx: Arc<Mutex<Option<oneshot::Sender<(Option<String>, ConversionRequest)>>>>,
}

async fn handle_tts(
    State(state): State<CaptureState>,
    headers: HeaderMap,
    Json(payload): Json<ConversionRequest>,
) -> impl axum::response::IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if let Some(tx) = state.tx.lock().await.take() {
        let _ = tx.send((content_type, payload));
    }
    ([(header::CONTENT_TYPE, "audio/wav")], WAV_BYTES)
}

#[tokio::test]
async fn posts_json_text_and_returns_audio_bytes() {
    let (tx, rx) = oneshot::channel();
    let app = Router::new()
        .route("/api/tts", post(handle_tts))
        .with_state(CaptureState {
            tx: Arc::new(Mutex::new(Some(tx))),
        });
    let base = spawn_server(app).await.expect("spawn server");
    let submitter = ConversionSubmitter::new(client(), endpoint(&base, "/api/tts"));

    let audio = submitter.convert("  hello world ").await.expect("audio");
    assert_eq!(audio, WAV_BYTES);

    let (content_type, payload) = rx.await.expect("captured request");
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(payload.text, "  hello world ");
}

#[tokio::test]
async fn failure_status_is_reported_without_reading_body() {
    let app = Router::new().route(
        "/api/tts",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "synthesis crashed") }),
    );
    let base = spawn_server(app).await.expect("spawn server");
    let submitter = ConversionSubmitter::new(client(), endpoint(&base, "/api/tts"));

    match submitter.convert("hello").await {
        Err(RequestError::Status(status)) => {
            assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR)
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn transport_failure_is_reported() {
    let base = unreachable_server().await.expect("free port");
    let submitter = ConversionSubmitter::new(client(), endpoint(&base, "/api/tts"));

    let err = submitter.convert("hello").await.expect_err("must fail");
    assert!(matches!(err, RequestError::Transport(_)), "unexpected: {err:?}");
}
