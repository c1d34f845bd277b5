//! Tests for the REST API router.

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use strictly_wordle::{
    Game, GameId, GameRepository, InMemoryGameRepository, InMemoryStatisticsStore,
    InMemoryWordRepository, NewGame, SessionManager, SessionSettings, StoreError,
};
use strictly_wordle_server::router;

fn app_with(games: Arc<dyn GameRepository>) -> Router {
    let sessions = SessionManager::new(
        Arc::new(InMemoryWordRepository::from_words([
            "apple", "crane", "slate", "plead",
        ])),
        games,
        Arc::new(InMemoryStatisticsStore::new()),
        SessionSettings::default(),
    );
    router(sessions)
}

fn app() -> Router {
    app_with(Arc::new(InMemoryGameRepository::new()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body is not JSON")
    };
    (status, value)
}

/// Creates a game owned by `owner` and returns its id.
async fn create(app: &Router, owner: &str) -> i64 {
    let (status, body) = send(app, "POST", "/api/games", Some(json!({ "ownerId": owner }))).await;
    assert_eq!(status, StatusCode::OK);
    body["gameData"]["id"].as_i64().expect("Missing game id")
}

#[tokio::test]
async fn test_create_game() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/games",
        Some(json!({ "ownerId": "alice", "wordLength": 5 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["gameData"];
    assert_eq!(data["state"], "IN_PROGRESS");
    assert_eq!(data["maxAttempts"], 6);
    assert_eq!(data["ownerId"], "alice");
    assert_eq!(data["attempts"], json!([]));
    assert_eq!(data["feedback"], json!([]));
}

#[tokio::test]
async fn test_create_game_without_word_of_length() {
    let app = app();
    let (status, body) = send(&app, "POST", "/api/games", Some(json!({ "wordLength": 9 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_attempt_returns_feedback() {
    let games = InMemoryGameRepository::new();
    let id = games
        .insert(NewGame::new("apple".to_string(), 6, None, chrono::Utc::now()))
        .await
        .expect("Insert failed");
    let app_known = app_with(Arc::new(games));

    let uri = format!("/api/games/{}/attempts", id);
    let (status, body) = send(&app_known, "POST", &uri, Some(json!({ "word": "plead" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resultCode"], "WRONG_WORD");
    assert_eq!(body["gameData"]["attempts"], json!(["plead"]));
    assert_eq!(
        body["gameData"]["feedback"],
        json!([["PARTIAL", "PARTIAL", "PARTIAL", "PARTIAL", "NONE"]])
    );

    let (_, body) = send(&app_known, "POST", &uri, Some(json!({ "word": "APPLE" }))).await;
    assert_eq!(body["resultCode"], "WINNER");
    assert_eq!(body["gameData"]["state"], "WINNER");
    assert!(body["gameData"]["endTimestamp"].is_string());
}

#[tokio::test]
async fn test_rejection_has_null_game_data() {
    let app = app();
    let id = create(&app, "bob").await;
    let uri = format!("/api/games/{}/attempts", id);

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "word": "amber" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resultCode"], "NOT_IN_WORD_LIST");
    assert_eq!(body["gameData"], Value::Null);

    let (_, body) = send(&app, "POST", &uri, Some(json!({ "word": "toolong" }))).await;
    assert_eq!(body["resultCode"], "WORD_LENGTH_MISMATCH");
}

#[tokio::test]
async fn test_unknown_game() {
    let app = app();

    let (status, body) = send(&app, "GET", "/api/games/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/api/games/999/attempts",
        Some(json!({ "word": "crane" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resultCode"], "GAME_NOT_FOUND");
}

#[tokio::test]
async fn test_abandon_then_already_over() {
    let app = app();
    let id = create(&app, "carol").await;
    let uri = format!("/api/games/{}/abandon", id);

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resultCode"], "GAME_ALREADY_OVER");

    let (_, body) = send(&app, "GET", &format!("/api/games/{}", id), None).await;
    assert_eq!(body["gameData"]["state"], "ABANDONED");

    let (_, body) = send(&app, "GET", "/api/users/carol/statistics", None).await;
    assert_eq!(body["abandoned"], 1);
    assert_eq!(body["totalGames"], 1);
}

#[tokio::test]
async fn test_statistics_include_derived_values() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/users/nobody/statistics", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalGames"], 0);
    assert_eq!(body["gamesWon"], 0);
    assert_eq!(body["winRate"], 0.0);
    assert_eq!(body["guessDistribution"], json!([0, 0, 0, 0, 0, 0]));
}

/// Game repository whose writes always fail.
#[derive(Debug, Default)]
struct BrokenGames {
    inner: InMemoryGameRepository,
}

#[async_trait]
impl GameRepository for BrokenGames {
    async fn find_by_id(&self, id: GameId) -> Result<Option<Game>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, game: NewGame) -> Result<GameId, StoreError> {
        self.inner.insert(game).await
    }

    async fn update(&self, _game: &Game, _expected_version: u32) -> Result<bool, StoreError> {
        Err(StoreError::new("database is locked at /var/lib/secret.db"))
    }
}

#[tokio::test]
async fn test_internal_error_does_not_leak_detail() {
    let app = app_with(Arc::new(BrokenGames::default()));
    let id = create(&app, "dave").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/games/{}/attempts", id),
        Some(json!({ "word": "crane" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "internal server error" }));
}
