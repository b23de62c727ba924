//! Service and client tests
//!
//! Router tests drive the axum app in-process through `tower::ServiceExt`
//! against an in-memory store. Client tests serve the same app on a local
//! port, or point at a closed port to exercise the file fallback.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ruutu_api::{app, HighscoreClient, HighscoreStore, Source};
use ruutu_core::{Game, HighscoreRecord, LineKey, ScoreSubmission, DISPLAY_LIMIT, RETAIN_LIMIT};

fn test_app(retain: usize) -> Router {
    app(HighscoreStore::open_in_memory().unwrap(), retain)
}

fn submission(score: u32) -> ScoreSubmission {
    ScoreSubmission {
        score,
        lines: (0..score)
            .map(|i| LineKey {
                key: format!("0,{i}|1,{i}|2,{i}|3,{i}|4,{i}"),
            })
            .collect(),
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json)
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn post_score(app: &Router, submission: &ScoreSubmission) -> (StatusCode, Value) {
    let body = serde_json::to_string(submission).unwrap();
    send(app, Method::POST, "/api/highscores", Some(body)).await
}

// =============================================================================
// Router
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = test_app(RETAIN_LIMIT);
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_submit_accepts_consistent_score() {
    let app = test_app(RETAIN_LIMIT);
    let (status, body) = post_score(&app, &submission(3)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    let top = body["top"].as_array().unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0]["score"], json!(3));
    assert!(top[0]["date"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_submit_rejects_score_mismatch() {
    let app = test_app(RETAIN_LIMIT);
    let mut forged = submission(2);
    forged.score = 40;
    let (status, body) = post_score(&app, &forged).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "score mismatch"}));

    let (_, list) = send(&app, Method::GET, "/api/highscores", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_submit_rejects_invalid_payload() {
    let app = test_app(RETAIN_LIMIT);
    for body in [
        "not json",
        r#"{"score": "7", "lines": []}"#,
        r#"{"score": 1}"#,
        r#"{"score": 1, "lines": [{"key": 5}]}"#,
        r#"{"score": -1, "lines": []}"#,
    ] {
        let (status, value) =
            send(&app, Method::POST, "/api/highscores", Some(body.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(value, json!({"error": "invalid payload"}), "{}", body);
    }
}

#[tokio::test]
async fn test_list_is_ranked() {
    let app = test_app(RETAIN_LIMIT);
    for score in [4, 9, 0, 6] {
        let (status, _) = post_score(&app, &submission(score)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&app, Method::GET, "/api/highscores", None).await;
    assert_eq!(status, StatusCode::OK);
    let records: Vec<HighscoreRecord> = serde_json::from_value(body).unwrap();
    let scores: Vec<u32> = records.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![9, 6, 4, 0]);
}

#[tokio::test]
async fn test_retention_limit() {
    let app = test_app(3);
    let mut last = Value::Null;
    for score in [2, 8, 5, 1, 7] {
        let (_, body) = post_score(&app, &submission(score)).await;
        last = body;
    }
    let top: Vec<u32> = last["top"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["score"].as_u64().unwrap() as u32)
        .collect();
    assert_eq!(top, vec![8, 7, 5]);

    let (_, body) = send(&app, Method::GET, "/api/highscores", None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_engine_submission_is_accepted() {
    let app = test_app(RETAIN_LIMIT);
    let game = Game::new();
    let submission = game.submission().unwrap();
    let (status, body) = post_score(&app, &submission).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["top"][0]["score"], json!(0));
}

// =============================================================================
// Client
// =============================================================================

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A base URL nothing listens on.
async fn closed_port() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_client_submit_mirrors_remote_top() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(test_app(RETAIN_LIMIT)).await;
    let client = HighscoreClient::new(base, dir.path().join("hs.json")).unwrap();

    for score in 1..=12 {
        client.submit(&submission(score)).await.unwrap();
    }
    let result = client.submit(&submission(5)).await.unwrap();
    assert_eq!(result.source, Source::Remote);
    assert_eq!(result.records.len(), DISPLAY_LIMIT);
    assert_eq!(result.records[0].score, 12);
    assert_eq!(client.local().load().unwrap(), result.records);

    let fetched = client.fetch().await.unwrap();
    assert_eq!(fetched.source, Source::Remote);
    assert_eq!(fetched.records, result.records);
}

#[tokio::test]
async fn test_client_falls_back_when_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let client = HighscoreClient::new(closed_port().await, dir.path().join("hs.json")).unwrap();

    let first = client.submit(&submission(2)).await.unwrap();
    assert_eq!(first.source, Source::Local);
    let second = client.submit(&submission(6)).await.unwrap();
    let scores: Vec<u32> = second.records.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![6, 2]);

    let fetched = client.fetch().await.unwrap();
    assert_eq!(fetched.source, Source::Local);
    assert_eq!(fetched.records, second.records);
}

#[tokio::test]
async fn test_client_falls_back_on_rejection() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(test_app(RETAIN_LIMIT)).await;
    let client = HighscoreClient::new(base, dir.path().join("hs.json")).unwrap();

    let mut forged = submission(1);
    forged.score = 99;
    let result = client.submit(&forged).await.unwrap();
    assert_eq!(result.source, Source::Local);
    assert_eq!(result.records[0].score, 99);
}
