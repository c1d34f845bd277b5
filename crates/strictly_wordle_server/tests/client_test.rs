//! Tests for the REST client against a live server.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::net::TcpListener;

use strictly_wordle::{
    FinishedGame, GameId, GameRepository, GameState, InMemoryGameRepository,
    InMemoryStatisticsStore, InMemoryWordRepository, NewGame, ResultCode, SessionManager,
    SessionSettings, StatisticsAggregator, StoreError, UserId, UserStatistics,
    UserStatisticsStore,
};
use strictly_wordle_server::{ClientSession, RestGameClient, router};

struct TestServer {
    url: String,
    games: Arc<InMemoryGameRepository>,
    sessions: SessionManager,
}

/// Starts a server on an ephemeral port backed by in-memory collaborators.
async fn start_server() -> TestServer {
    start_server_with(Arc::new(InMemoryStatisticsStore::new())).await
}

async fn start_server_with(statistics: Arc<dyn UserStatisticsStore>) -> TestServer {
    let games = Arc::new(InMemoryGameRepository::new());
    let sessions = SessionManager::new(
        Arc::new(InMemoryWordRepository::from_words([
            "apple", "crane", "slate", "irate", "plead",
        ])),
        games.clone(),
        statistics,
        SessionSettings::default(),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    let app = router(sessions.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestServer {
        url: format!("http://{}", addr),
        games,
        sessions,
    }
}

async fn seed_game(server: &TestServer, word: &str, owner: Option<&str>) -> GameId {
    server
        .games
        .insert(NewGame::new(
            word.to_string(),
            6,
            owner.map(UserId::from),
            Utc::now(),
        ))
        .await
        .expect("Insert failed")
}

#[tokio::test]
async fn test_guess_commits_server_snapshot() {
    let server = start_server().await;
    let id = seed_game(&server, "apple", None).await;
    let mut session = ClientSession::resume(RestGameClient::new(&server.url), id)
        .await
        .expect("Resume failed");

    let outcome = session.guess("crane").await.expect("Guess failed");
    assert_eq!(*outcome.result_code(), ResultCode::WrongWord);
    assert!(!*outcome.resynced());

    let game = session.game().expect("No local game");
    assert_eq!(game.attempts(), &vec!["crane".to_string()]);
    assert!(!session.local().needs_resync());
    assert!(session.local().keyboard().state_of('e').is_some());
}

#[tokio::test]
async fn test_local_rejection_skips_server() {
    let server = start_server().await;
    let id = seed_game(&server, "apple", None).await;
    let mut session = ClientSession::resume(RestGameClient::new(&server.url), id)
        .await
        .expect("Resume failed");

    session.guess("crane").await.expect("Guess failed");
    let outcome = session.guess("crane").await.expect("Guess failed");
    assert_eq!(*outcome.result_code(), ResultCode::DuplicateAttempt);
    assert_eq!(session.game().expect("No local game").attempts().len(), 1);
}

#[tokio::test]
async fn test_server_rejection_rolls_back() {
    let server = start_server().await;
    let id = seed_game(&server, "apple", None).await;
    let mut session = ClientSession::resume(RestGameClient::new(&server.url), id)
        .await
        .expect("Resume failed");

    let outcome = session.guess("amber").await.expect("Guess failed");
    assert_eq!(*outcome.result_code(), ResultCode::NotInWordList);
    assert!(session.game().expect("No local game").attempts().is_empty());
    assert!(session.local().keyboard().is_empty());
}

#[tokio::test]
async fn test_divergence_forces_resync() {
    let server = start_server().await;
    let id = seed_game(&server, "apple", None).await;
    let mut session = ClientSession::resume(RestGameClient::new(&server.url), id)
        .await
        .expect("Resume failed");

    // Another player moves behind this client's back
    server
        .sessions
        .process_attempt(id, "slate")
        .await
        .expect("Attempt failed");

    let outcome = session.guess("crane").await.expect("Guess failed");
    assert_eq!(*outcome.result_code(), ResultCode::WrongWord);
    assert!(*outcome.resynced());

    let game = session.game().expect("No local game");
    assert_eq!(
        game.attempts(),
        &vec!["slate".to_string(), "crane".to_string()]
    );
    assert!(!session.local().needs_resync());
}

#[tokio::test]
async fn test_winning_updates_statistics() {
    let server = start_server().await;
    let id = seed_game(&server, "apple", Some("erin")).await;
    let client = RestGameClient::new(&server.url);
    let mut session = ClientSession::resume(client.clone(), id)
        .await
        .expect("Resume failed");

    session.guess("plead").await.expect("Guess failed");
    let outcome = session.guess("apple").await.expect("Guess failed");
    assert_eq!(*outcome.result_code(), ResultCode::Winner);
    assert_eq!(
        *session.game().expect("No local game").state(),
        GameState::Winner
    );

    let stats = client
        .statistics(&UserId::from("erin"))
        .await
        .expect("Stats failed");
    assert_eq!(*stats.total_games(), 1);
    assert_eq!(stats.wins().get(&2), Some(&1));
}

#[tokio::test]
async fn test_create_and_abandon() {
    let server = start_server().await;
    let client = RestGameClient::new(&server.url);

    let mut session = ClientSession::start(client.clone(), Some(UserId::from("finn")), None)
        .await
        .expect("Start failed");
    assert_eq!(
        *session.game().expect("No local game").state(),
        GameState::InProgress
    );

    assert_eq!(session.abandon().await.expect("Abandon failed"), None);
    assert_eq!(
        *session.game().expect("No local game").state(),
        GameState::Abandoned
    );
    assert_eq!(
        session.abandon().await.expect("Abandon failed"),
        Some(ResultCode::GameAlreadyOver)
    );

    let missing = client.get_game(GameId::new(404)).await;
    assert!(missing.is_err());
}

/// Statistics store whose writes always fail.
#[derive(Debug, Default)]
struct UnwritableStats;

#[async_trait]
impl UserStatisticsStore for UnwritableStats {
    async fn load(&self, _user_id: &UserId) -> Result<UserStatistics, StoreError> {
        Ok(UserStatistics::default())
    }

    async fn record(
        &self,
        _game: &FinishedGame,
        _aggregator: StatisticsAggregator,
    ) -> Result<bool, StoreError> {
        Err(StoreError::new("statistics table locked"))
    }
}

#[tokio::test]
async fn test_server_error_rereads_game() {
    let server = start_server_with(Arc::new(UnwritableStats)).await;
    let id = seed_game(&server, "apple", Some("gus")).await;
    let mut session = ClientSession::resume(RestGameClient::new(&server.url), id)
        .await
        .expect("Resume failed");

    // The win is stored, then the statistics write fails with a 500
    let result = session.guess("apple").await;
    assert!(result.is_err());

    let game = session.game().expect("Game not re-read");
    assert_eq!(*game.state(), GameState::Winner);
    assert_eq!(game.attempts(), &vec!["apple".to_string()]);
    assert!(!session.local().needs_resync());

    let outcome = session.guess("crane").await.expect("Guess failed");
    assert_eq!(*outcome.result_code(), ResultCode::GameAlreadyOver);
}
