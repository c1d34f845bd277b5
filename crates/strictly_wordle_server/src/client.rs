//! Type-safe HTTP client using the REST API.

use anyhow::{Context, Result};
use derive_getters::Getters;
use serde::de::DeserializeOwned;
use strictly_wordle::{Game, GameId, LocalGame, ResultCode, UserId, UserStatistics};
use tracing::{debug, info, instrument, warn};

use crate::api::{
    AbandonResponse, AttemptRequest, AttemptResponse, CreateGameRequest, ErrorBody, GameResponse,
};

/// Type-safe HTTP game client.
#[derive(Debug, Clone)]
pub struct RestGameClient {
    base_url: String,
    client: reqwest::Client,
}

impl RestGameClient {
    /// Creates a client for the server at `base_url` (e.g. `http://127.0.0.1:3000`).
    #[instrument(skip_all, fields(base_url = %base_url.as_ref()))]
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Starts a new game.
    #[instrument(skip(self))]
    pub async fn create_game(
        &self,
        owner_id: Option<UserId>,
        word_length: Option<usize>,
    ) -> Result<Game> {
        let request = CreateGameRequest {
            owner_id,
            word_length,
        };
        let response = self
            .client
            .post(format!("{}/api/games", self.base_url))
            .json(&request)
            .send()
            .await?;
        let body: GameResponse = Self::decode(response).await?;
        info!(game_id = %body.game_data.game().id(), "Game created");
        Ok(body.game_data.into_game())
    }

    /// Fetches the authoritative copy of a game.
    #[instrument(skip(self))]
    pub async fn get_game(&self, id: GameId) -> Result<Game> {
        debug!("Getting game state via REST");
        let response = self
            .client
            .get(format!("{}/api/games/{}", self.base_url, id))
            .send()
            .await?;
        let body: GameResponse = Self::decode(response).await?;
        Ok(body.game_data.into_game())
    }

    /// Submits an attempt.
    #[instrument(skip(self))]
    pub async fn submit_attempt(&self, id: GameId, word: &str) -> Result<AttemptResponse> {
        let response = self
            .client
            .post(format!("{}/api/games/{}/attempts", self.base_url, id))
            .json(&AttemptRequest {
                word: word.to_string(),
            })
            .send()
            .await?;
        let body: AttemptResponse = Self::decode(response).await?;
        debug!(result_code = %body.result_code, "Attempt submitted");
        Ok(body)
    }

    /// Abandons a game.
    #[instrument(skip(self))]
    pub async fn abandon(&self, id: GameId) -> Result<AbandonResponse> {
        let response = self
            .client
            .post(format!("{}/api/games/{}/abandon", self.base_url, id))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Fetches a user's statistics.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn statistics(&self, user_id: &UserId) -> Result<UserStatistics> {
        let response = self
            .client
            .get(format!(
                "{}/api/users/{}/statistics",
                self.base_url,
                user_id.as_str()
            ))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_default();
            anyhow::bail!("Request failed: {} - {}", status, message);
        }
        response
            .json()
            .await
            .context("Failed to decode response body")
    }
}

/// Result of [`ClientSession::guess`].
#[derive(Debug, Clone, Getters)]
pub struct GuessOutcome {
    result_code: ResultCode,
    /// True if the local copy diverged and was re-fetched.
    resynced: bool,
}

/// One player's view of a game: predicts locally, then reconciles with the server.
#[derive(Debug, Getters)]
pub struct ClientSession {
    client: RestGameClient,
    game_id: GameId,
    local: LocalGame,
}

impl ClientSession {
    /// Starts a new game on the server.
    #[instrument(skip(client))]
    pub async fn start(
        client: RestGameClient,
        owner_id: Option<UserId>,
        word_length: Option<usize>,
    ) -> Result<Self> {
        let game = client.create_game(owner_id, word_length).await?;
        Ok(Self {
            client,
            game_id: *game.id(),
            local: LocalGame::new(game),
        })
    }

    /// Attaches to an existing game.
    #[instrument(skip(client))]
    pub async fn resume(client: RestGameClient, game_id: GameId) -> Result<Self> {
        let game = client.get_game(game_id).await?;
        Ok(Self {
            client,
            game_id,
            local: LocalGame::new(game),
        })
    }

    /// The local copy, including any pending prediction.
    pub fn game(&self) -> Option<&Game> {
        self.local.current()
    }

    /// Guesses `word`.
    ///
    /// The attempt is predicted locally, submitted, and the server's snapshot
    /// reconciled against the prediction. A locally inadmissible word is
    /// reported without contacting the server. On divergence the local copy
    /// is discarded and re-fetched.
    ///
    /// # Errors
    ///
    /// Returns the submit error when the server fails or cannot be reached.
    /// The server may have applied the attempt anyway, so the local copy is
    /// discarded and re-read; if that read fails too, the next call retries it.
    #[instrument(skip(self), fields(game_id = %self.game_id))]
    pub async fn guess(&mut self, word: &str) -> Result<GuessOutcome> {
        if self.local.needs_resync() {
            self.resync().await?;
        }

        if let Err(rejection) = self.local.predict(word) {
            debug!(%rejection, "Rejected locally");
            return Ok(GuessOutcome {
                result_code: rejection.result_code(),
                resynced: false,
            });
        }

        let response = match self.client.submit_attempt(self.game_id, word).await {
            Ok(response) => response,
            Err(e) => {
                self.recover_unknown_outcome(&e).await;
                return Err(e);
            }
        };

        let Some(game_data) = response.game_data else {
            debug!(result_code = %response.result_code, "Server rejected attempt");
            self.local.rollback();
            return Ok(GuessOutcome {
                result_code: response.result_code,
                resynced: false,
            });
        };

        let resynced = match self.local.commit(game_data.into_game()) {
            Ok(_) => false,
            Err(divergence) => {
                warn!(%divergence, "Local copy diverged, resynchronizing");
                self.resync().await?;
                true
            }
        };

        Ok(GuessOutcome {
            result_code: response.result_code,
            resynced,
        })
    }

    /// Abandons the game and refreshes the local copy.
    #[instrument(skip(self), fields(game_id = %self.game_id))]
    pub async fn abandon(&mut self) -> Result<Option<ResultCode>> {
        let response = match self.client.abandon(self.game_id).await {
            Ok(response) => response,
            Err(e) => {
                self.recover_unknown_outcome(&e).await;
                return Err(e);
            }
        };
        self.resync().await?;
        Ok(response.result_code)
    }

    /// Drops the local copy after a failed request and tries to re-read it.
    async fn recover_unknown_outcome(&mut self, error: &anyhow::Error) {
        warn!(%error, "Request outcome unknown, discarding local copy");
        self.local.invalidate();
        if let Err(resync_error) = self.resync().await {
            warn!(error = %resync_error, "Re-read failed, retrying on next guess");
        }
    }

    /// Replaces the local copy with the server's.
    #[instrument(skip(self), fields(game_id = %self.game_id))]
    pub async fn resync(&mut self) -> Result<()> {
        let game = self.client.get_game(self.game_id).await?;
        self.local.resync(game);
        Ok(())
    }
}
