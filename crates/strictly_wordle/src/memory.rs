//! In-memory collaborators for tests and single-process play.

use async_trait::async_trait;
use rand::seq::IteratorRandom;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::game::{Game, GameId, NewGame, UserId};
use crate::stats::{FinishedGame, StatisticsAggregator, UserStatistics};
use crate::store::{GameRepository, UserStatisticsStore, WordRepository};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|e| StoreError::new(format!("Lock poisoned: {}", e)))
}

/// Word list held in memory.
#[derive(Debug, Default)]
pub struct InMemoryWordRepository {
    words: Mutex<BTreeSet<String>>,
}

impl InMemoryWordRepository {
    /// Creates an empty word list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a word list from the given words, lowercased.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            words: Mutex::new(words),
        }
    }

    /// Adds a word to the list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the list lock is poisoned.
    pub fn insert(&self, word: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.words)?.insert(word.to_lowercase()))
    }
}

#[async_trait]
impl WordRepository for InMemoryWordRepository {
    #[instrument(skip(self))]
    async fn exists(&self, word: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.words)?.contains(word))
    }

    #[instrument(skip(self))]
    async fn random_word_of_length(&self, length: usize) -> Result<Option<String>, StoreError> {
        let words = lock(&self.words)?;
        let word = words
            .iter()
            .filter(|w| w.chars().count() == length)
            .choose(&mut rand::rng())
            .cloned();
        debug!(found = word.is_some(), "Picked random word");
        Ok(word)
    }
}

/// Games held in memory, with compare-and-swap updates.
#[derive(Debug, Default)]
pub struct InMemoryGameRepository {
    games: Mutex<HashMap<GameId, Game>>,
    next_id: Mutex<i32>,
}

impl InMemoryGameRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `game` as is, replacing any game with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a lock is poisoned.
    pub fn put(&self, game: Game) -> Result<(), StoreError> {
        let mut next_id = lock(&self.next_id)?;
        *next_id = (*next_id).max(game.id().get());
        lock(&self.games)?.insert(*game.id(), game);
        Ok(())
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: GameId) -> Result<Option<Game>, StoreError> {
        Ok(lock(&self.games)?.get(&id).cloned())
    }

    #[instrument(skip(self, game))]
    async fn insert(&self, game: NewGame) -> Result<GameId, StoreError> {
        let id = {
            let mut next_id = lock(&self.next_id)?;
            *next_id += 1;
            GameId::new(*next_id)
        };
        lock(&self.games)?.insert(id, game.into_game(id));
        debug!(game_id = %id, "Game inserted");
        Ok(id)
    }

    #[instrument(skip(self, game), fields(game_id = %game.id(), version = game.version()))]
    async fn update(&self, game: &Game, expected_version: u32) -> Result<bool, StoreError> {
        let mut games = lock(&self.games)?;
        match games.get_mut(game.id()) {
            Some(stored) if *stored.version() == expected_version => {
                *stored = game.clone();
                Ok(true)
            }
            _ => {
                debug!("Version check failed");
                Ok(false)
            }
        }
    }
}

/// User statistics held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStatisticsStore {
    state: Mutex<RecordedStatistics>,
}

/// Statistics plus the games already folded into them, under one lock.
#[derive(Debug, Default)]
struct RecordedStatistics {
    stats: HashMap<UserId, UserStatistics>,
    recorded: HashSet<GameId>,
}

impl InMemoryStatisticsStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStatisticsStore for InMemoryStatisticsStore {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn load(&self, user_id: &UserId) -> Result<UserStatistics, StoreError> {
        Ok(lock(&self.state)?
            .stats
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    #[instrument(skip(self, game, aggregator), fields(game_id = %game.game_id(), user_id = %game.owner_id()))]
    async fn record(
        &self,
        game: &FinishedGame,
        aggregator: StatisticsAggregator,
    ) -> Result<bool, StoreError> {
        let mut state = lock(&self.state)?;
        if !state.recorded.insert(*game.game_id()) {
            debug!("Game already recorded");
            return Ok(false);
        }
        let stats = state.stats.entry(game.owner_id().clone()).or_default();
        *stats = aggregator.apply_game(std::mem::take(stats), game);
        Ok(true)
    }
}
