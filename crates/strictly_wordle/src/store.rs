//! Collaborator traits consumed by the engine.
//!
//! Persistence and word lookup live outside the engine; implementations are
//! expected to bound their own I/O with a timeout policy.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::StoreError;
use crate::game::{Game, GameId, NewGame, UserId};
use crate::stats::{FinishedGame, StatisticsAggregator, UserStatistics};

/// Word list lookup.
#[async_trait]
pub trait WordRepository: Debug + Send + Sync {
    /// Returns true if `word` is in the word list.
    async fn exists(&self, word: &str) -> Result<bool, StoreError>;

    /// Picks a random word of `length` letters, or `None` if there is none.
    async fn random_word_of_length(&self, length: usize) -> Result<Option<String>, StoreError>;
}

/// Authoritative storage of games.
#[async_trait]
pub trait GameRepository: Debug + Send + Sync {
    /// Loads a game by id.
    async fn find_by_id(&self, id: GameId) -> Result<Option<Game>, StoreError>;

    /// Inserts a new game and returns the assigned id.
    async fn insert(&self, game: NewGame) -> Result<GameId, StoreError>;

    /// Writes `game` only if the stored version still equals `expected_version`.
    ///
    /// Returns `false` when the stored game was changed by another writer
    /// (or no longer exists).
    async fn update(&self, game: &Game, expected_version: u32) -> Result<bool, StoreError>;
}

/// Storage of cumulative per-user statistics.
#[async_trait]
pub trait UserStatisticsStore: Debug + Send + Sync {
    /// Loads a user's statistics; users without games get empty statistics.
    async fn load(&self, user_id: &UserId) -> Result<UserStatistics, StoreError>;

    /// Folds a finished game into its owner's statistics, once per game.
    ///
    /// Reading, folding and writing happen as one atomic step, so games of
    /// the same owner finishing together never overwrite each other. A game
    /// already recorded leaves the statistics untouched and returns `false`.
    async fn record(
        &self,
        game: &FinishedGame,
        aggregator: StatisticsAggregator,
    ) -> Result<bool, StoreError>;
}
