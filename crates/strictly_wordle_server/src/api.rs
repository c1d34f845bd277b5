//! REST API over the session manager.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use strictly_wordle::{
    Game, GameError, GameId, LetterMatchState, ResultCode, SessionManager, UserId, UserStatistics,
};
use tracing::{error, info, instrument, warn};

/// Shared state of the HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    sessions: SessionManager,
}

/// Builds the API router.
#[instrument(skip(sessions))]
pub fn router(sessions: SessionManager) -> Router {
    info!("Building API router");
    Router::new()
        .route("/api/games", post(create_game))
        .route("/api/games/{id}", get(get_game))
        .route("/api/games/{id}/attempts", post(submit_attempt))
        .route("/api/games/{id}/abandon", post(abandon_game))
        .route("/api/users/{user_id}/statistics", get(user_statistics))
        .with_state(AppState { sessions })
}

/// A game together with the feedback for each of its attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GameData {
    #[serde(flatten)]
    game: Game,
    #[serde(default)]
    feedback: Vec<Vec<LetterMatchState>>,
}

impl GameData {
    /// Consumes the data, returning the game.
    pub fn into_game(self) -> Game {
        self.game
    }
}

impl From<Game> for GameData {
    fn from(game: Game) -> Self {
        Self {
            feedback: game.feedback(),
            game,
        }
    }
}

/// Body of `POST /api/games`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateGameRequest {
    /// Owning user; anonymous games record no statistics.
    pub owner_id: Option<UserId>,
    /// Word length; the configured default when absent.
    pub word_length: Option<usize>,
}

/// Response carrying a game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    /// The game.
    pub game_data: GameData,
}

/// Body of `POST /api/games/{id}/attempts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRequest {
    /// Candidate word.
    pub word: String,
}

/// Response to an attempt: the result code and, if accepted, the updated game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
    /// Outcome of the attempt.
    pub result_code: ResultCode,
    /// Updated game; `null` when the attempt was rejected.
    pub game_data: Option<GameData>,
}

/// Response to an abandon; empty on success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonResponse {
    /// Set only when the game was already over.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_code: Option<ResultCode>,
}

/// Statistics with derived values.
///
/// Clients may read the body as plain [`UserStatistics`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    /// Stored counters.
    #[serde(flatten)]
    pub statistics: UserStatistics,
    /// Total games won.
    pub games_won: u32,
    /// Win percentage.
    pub win_rate: f64,
    /// Wins per attempt count, starting at one attempt.
    pub guess_distribution: Vec<u32>,
}

/// Error body for non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Client-safe message.
    pub error: String,
}

/// Maps engine errors onto HTTP responses without leaking internals.
#[derive(Debug)]
pub struct ApiError(GameError);

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            GameError::Rejected(rejection) => {
                let body = AttemptResponse {
                    result_code: rejection.result_code(),
                    game_data: None,
                };
                return (StatusCode::OK, Json(body)).into_response();
            }
            GameError::NotFound(id) => (StatusCode::NOT_FOUND, format!("game {} not found", id)),
            GameError::Conflict { game_id, retries } => {
                warn!(game_id = %game_id, retries, "Responding with conflict");
                (
                    StatusCode::CONFLICT,
                    "game was modified concurrently, retry".to_string(),
                )
            }
            GameError::NoWordAvailable(length) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("no word of length {} available", length),
            ),
            GameError::Internal(e) => {
                error!(error = %e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[instrument(skip(state, request), fields(owner_id = ?request.owner_id))]
async fn create_game(
    State(state): State<AppState>,
    Json(request): Json<CreateGameRequest>,
) -> Result<Json<GameResponse>, ApiError> {
    let game = state
        .sessions
        .start_game(request.owner_id, request.word_length)
        .await?;
    Ok(Json(GameResponse {
        game_data: game.into(),
    }))
}

#[instrument(skip(state))]
async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<GameResponse>, ApiError> {
    let game = state.sessions.find_game(GameId::new(id)).await?;
    Ok(Json(GameResponse {
        game_data: game.into(),
    }))
}

#[instrument(skip(state, request), fields(word = %request.word))]
async fn submit_attempt(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<AttemptRequest>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let outcome = state
        .sessions
        .process_attempt(GameId::new(id), &request.word)
        .await?;
    Ok(Json(AttemptResponse {
        result_code: *outcome.result_code(),
        game_data: Some(outcome.into_game().into()),
    }))
}

#[instrument(skip(state))]
async fn abandon_game(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AbandonResponse>, ApiError> {
    match state.sessions.abandon(GameId::new(id)).await {
        Ok(_) => Ok(Json(AbandonResponse::default())),
        Err(GameError::Rejected(rejection)) => Ok(Json(AbandonResponse {
            result_code: Some(rejection.result_code()),
        })),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(state))]
async fn user_statistics(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let statistics = state.sessions.statistics(&UserId::from(user_id)).await?;
    let max_attempts = state.sessions.settings().max_attempts;
    Ok(Json(StatisticsResponse {
        games_won: statistics.games_won(),
        win_rate: statistics.win_rate(),
        guess_distribution: statistics.guess_distribution(max_attempts),
        statistics,
    }))
}
