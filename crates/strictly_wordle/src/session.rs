//! Game session orchestration.
//!
//! [`SessionManager`] runs every mutating operation for a game end to end:
//! it serializes writers per game id, validates, applies the state machine
//! transition, persists with a version check, and folds finished games into
//! the owner's statistics.
//!
//! Statistics are recorded after the finished game is stored, keyed by game
//! id so a game is counted at most once. If recording fails, the next call
//! that finds the game finished records it.

use chrono::Utc;
use derive_getters::Getters;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{GameError, Rejection, ResultCode, StoreError};
use crate::game::{Game, GameId, NewGame, UserId};
use crate::stats::{AbandonPolicy, FinishedGame, StatisticsAggregator, UserStatistics};
use crate::store::{GameRepository, UserStatisticsStore, WordRepository};
use crate::validation::AttemptValidator;

/// Tunables for new games and write retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Word length used when a caller does not ask for one.
    pub word_length: usize,
    /// Attempts allowed per game.
    pub max_attempts: u32,
    /// Reload-and-retry rounds after a failed version check.
    pub max_conflict_retries: u32,
    /// Whether abandoning breaks a win streak.
    pub abandon_policy: AbandonPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            word_length: 5,
            max_attempts: 6,
            max_conflict_retries: 3,
            abandon_policy: AbandonPolicy::KeepStreak,
        }
    }
}

/// Result of an accepted attempt.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct AttemptOutcome {
    result_code: ResultCode,
    game: Game,
}

impl AttemptOutcome {
    /// Consumes the outcome, returning the updated game.
    pub fn into_game(self) -> Game {
        self.game
    }
}

/// Single-writer locks keyed by game id.
#[derive(Debug, Default)]
struct GameLocks {
    locks: Mutex<HashMap<GameId, Arc<AsyncMutex<()>>>>,
}

impl GameLocks {
    /// Waits for exclusive access to `id`.
    async fn acquire(&self, id: GameId) -> Result<OwnedMutexGuard<()>, StoreError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|e| StoreError::new(format!("Lock registry poisoned: {}", e)))?;
            // Entries nobody holds or waits on can go
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(id).or_default())
        };
        Ok(lock.lock_owned().await)
    }
}

/// Orchestrates game creation, attempts and abandons.
#[derive(Debug, Clone)]
pub struct SessionManager {
    words: Arc<dyn WordRepository>,
    games: Arc<dyn GameRepository>,
    statistics: Arc<dyn UserStatisticsStore>,
    validator: AttemptValidator,
    aggregator: StatisticsAggregator,
    settings: SessionSettings,
    locks: Arc<GameLocks>,
}

impl SessionManager {
    /// Creates a session manager over the given collaborators.
    #[instrument(skip(words, games, statistics))]
    pub fn new(
        words: Arc<dyn WordRepository>,
        games: Arc<dyn GameRepository>,
        statistics: Arc<dyn UserStatisticsStore>,
        settings: SessionSettings,
    ) -> Self {
        info!("Creating session manager");
        Self {
            validator: AttemptValidator::new(Arc::clone(&words)),
            aggregator: StatisticsAggregator::new(settings.abandon_policy),
            words,
            games,
            statistics,
            settings,
            locks: Arc::new(GameLocks::default()),
        }
    }

    /// Returns the settings in effect.
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Starts a new game with a random word.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NoWordAvailable`] if the word list has no word of
    /// the requested length, or [`GameError::Internal`] on store failure.
    #[instrument(skip(self))]
    pub async fn start_game(
        &self,
        owner_id: Option<UserId>,
        word_length: Option<usize>,
    ) -> Result<Game, GameError> {
        let length = word_length.unwrap_or(self.settings.word_length);
        let word = self
            .words
            .random_word_of_length(length)
            .await?
            .ok_or(GameError::NoWordAvailable(length))?;

        let new_game = NewGame::new(word, self.settings.max_attempts, owner_id, Utc::now());
        let id = self.games.insert(new_game).await?;
        info!(game_id = %id, length, "Game started");

        self.find_game(id).await
    }

    /// Loads a game.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] if no such game exists.
    #[instrument(skip(self))]
    pub async fn find_game(&self, id: GameId) -> Result<Game, GameError> {
        self.games
            .find_by_id(id)
            .await?
            .ok_or(GameError::NotFound(id))
    }

    /// Loads a user's cumulative statistics.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Internal`] on store failure.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn statistics(&self, user_id: &UserId) -> Result<UserStatistics, GameError> {
        Ok(self.statistics.load(user_id).await?)
    }

    /// Submits an attempt.
    ///
    /// The word is trimmed and lowercased first. Writers to the same game are
    /// serialized; if another process wins the version check anyway, the game
    /// is reloaded and the attempt re-validated against the fresh copy.
    ///
    /// # Errors
    ///
    /// - [`GameError::Rejected`] when the attempt is inadmissible; nothing changed
    /// - [`GameError::Internal`] when persistence fails; the outcome is unknown
    ///   and authoritative state must be re-read
    /// - [`GameError::Conflict`] when retries are exhausted
    #[instrument(skip(self, word), fields(word = %word.trim()))]
    pub async fn process_attempt(
        &self,
        game_id: GameId,
        word: &str,
    ) -> Result<AttemptOutcome, GameError> {
        let word = word.trim().to_lowercase();
        let _guard = self.locks.acquire(game_id).await?;
        let mut word_checked = false;

        for retry in 0..=self.settings.max_conflict_retries {
            let Some(mut game) = self.games.find_by_id(game_id).await? else {
                warn!("Attempt on unknown game");
                return Err(Rejection::GameNotFound.into());
            };
            if game.is_terminal() {
                warn!(state = %game.state(), "Attempt on finished game");
                self.replay_statistics(&game).await;
                return Err(Rejection::GameAlreadyOver.into());
            }
            if !word_checked {
                self.validator.validate(&word, Some(&game)).await?;
                word_checked = true;
            }

            let prior_state = *game.state();
            let expected_version = *game.version();
            let verdict = game.apply_attempt(&word, Utc::now())?;

            match self.games.update(&game, expected_version).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(retry, "Game changed concurrently, retrying");
                    continue;
                }
                Err(e) => {
                    error!(
                        game_id = %game_id,
                        word = %word,
                        prior_state = %prior_state,
                        error = %e,
                        "Failed to persist attempt"
                    );
                    return Err(e.into());
                }
            }

            if game.is_terminal() {
                self.record_statistics(&game).await?;
            }

            info!(
                result_code = %verdict.result_code(),
                attempts = game.attempts().len(),
                "Attempt processed"
            );
            return Ok(AttemptOutcome {
                result_code: verdict.result_code(),
                game,
            });
        }

        error!(retries = self.settings.max_conflict_retries, "Giving up after conflicts");
        Err(GameError::Conflict {
            game_id,
            retries: self.settings.max_conflict_retries,
        })
    }

    /// Abandons a game in progress.
    ///
    /// # Errors
    ///
    /// - [`GameError::NotFound`] if no such game exists
    /// - [`GameError::Rejected`] with [`Rejection::GameAlreadyOver`] for a finished game
    /// - [`GameError::Internal`] / [`GameError::Conflict`] as for attempts
    #[instrument(skip(self))]
    pub async fn abandon(&self, game_id: GameId) -> Result<Game, GameError> {
        let _guard = self.locks.acquire(game_id).await?;

        for retry in 0..=self.settings.max_conflict_retries {
            let mut game = self.find_game(game_id).await?;
            if game.is_terminal() {
                warn!(state = %game.state(), "Abandon of finished game");
                self.replay_statistics(&game).await;
                return Err(Rejection::GameAlreadyOver.into());
            }
            let prior_state = *game.state();
            let expected_version = *game.version();
            game.abandon(Utc::now())?;

            match self.games.update(&game, expected_version).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(retry, "Game changed concurrently, retrying");
                    continue;
                }
                Err(e) => {
                    error!(
                        game_id = %game_id,
                        prior_state = %prior_state,
                        error = %e,
                        "Failed to persist abandon"
                    );
                    return Err(e.into());
                }
            }

            self.record_statistics(&game).await?;
            return Ok(game);
        }

        Err(GameError::Conflict {
            game_id,
            retries: self.settings.max_conflict_retries,
        })
    }

    /// Folds a persisted finished game into its owner's statistics.
    ///
    /// Returns false for anonymous games and games recorded before.
    async fn record_statistics(&self, game: &Game) -> Result<bool, GameError> {
        let Some(finished) = FinishedGame::from_game(game) else {
            debug!("Anonymous game, no statistics to record");
            return Ok(false);
        };

        self.statistics
            .record(&finished, self.aggregator)
            .await
            .map_err(|e| {
                error!(
                    game_id = %game.id(),
                    user_id = %finished.owner_id(),
                    state = %game.state(),
                    error = %e,
                    "Failed to record statistics"
                );
                GameError::from(e)
            })
    }

    /// Records statistics an earlier call failed to record.
    async fn replay_statistics(&self, game: &Game) {
        match self.record_statistics(game).await {
            Ok(true) => info!(game_id = %game.id(), "Recorded statistics left over from a failed call"),
            Ok(false) => {}
            Err(e) => warn!(game_id = %game.id(), error = %e, "Statistics still not recorded"),
        }
    }
}
