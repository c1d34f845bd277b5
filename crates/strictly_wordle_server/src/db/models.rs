//! Row types and their conversions to engine types.

use chrono::NaiveDateTime;
use derive_new::new;
use diesel::prelude::*;
use std::collections::BTreeMap;
use strictly_wordle::{
    FinishedGame, Game, GameId, GameRecord, GameState, NewGame, UserId, UserStatistics,
};
use tracing::instrument;

use crate::db::{DbError, schema};

/// Word list entry.
#[derive(Debug, Clone, Insertable, Queryable, Selectable, new)]
#[diesel(table_name = schema::words)]
pub struct WordRow {
    word: String,
    length: i32,
}

impl WordRow {
    /// Builds a row for `word`, recording its letter count.
    pub fn from_word(word: &str) -> Self {
        Self::new(word.to_string(), word.chars().count() as i32)
    }
}

/// Stored game.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::games)]
pub struct GameRow {
    id: i32,
    word: String,
    attempts: String,
    max_attempts: i32,
    state: String,
    start_timestamp: NaiveDateTime,
    end_timestamp: Option<NaiveDateTime>,
    owner_id: Option<String>,
    version: i32,
}

impl GameRow {
    /// Decodes the row, checking every game invariant.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a column cannot be decoded or the stored game is
    /// inconsistent.
    #[instrument(skip(self), fields(game_id = self.id))]
    pub fn into_game(self) -> Result<Game, DbError> {
        let state: GameState = self
            .state
            .parse()
            .map_err(|_| DbError::new(format!("Invalid game state: '{}'", self.state)))?;

        let record = GameRecord {
            id: GameId::new(self.id),
            word: self.word,
            attempts: serde_json::from_str(&self.attempts)?,
            max_attempts: to_u32(self.max_attempts, "max_attempts")?,
            state,
            start_timestamp: self.start_timestamp.and_utc(),
            end_timestamp: self.end_timestamp.map(|t| t.and_utc()),
            owner_id: self.owner_id.map(UserId::from),
            version: to_u32(self.version, "version")?,
        };

        Game::try_from(record).map_err(|e| DbError::new(e.message))
    }
}

/// Insertable game; the database assigns the id.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::games)]
pub struct NewGameRow {
    word: String,
    attempts: String,
    max_attempts: i32,
    state: String,
    start_timestamp: NaiveDateTime,
    owner_id: Option<String>,
    version: i32,
}

impl TryFrom<NewGame> for NewGameRow {
    type Error = DbError;

    fn try_from(game: NewGame) -> Result<Self, Self::Error> {
        Ok(Self {
            attempts: "[]".to_string(),
            max_attempts: to_i32(*game.max_attempts(), "max_attempts")?,
            state: GameState::InProgress.to_string(),
            start_timestamp: game.start_timestamp().naive_utc(),
            owner_id: game.owner_id().as_ref().map(|o| o.as_str().to_string()),
            version: 0,
            word: game.word().clone(),
        })
    }
}

/// Mutable columns of a game, written under a version check.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::games, treat_none_as_null = true)]
pub struct GameChangeset {
    attempts: String,
    state: String,
    end_timestamp: Option<NaiveDateTime>,
    version: i32,
}

impl TryFrom<&Game> for GameChangeset {
    type Error = DbError;

    fn try_from(game: &Game) -> Result<Self, Self::Error> {
        Ok(Self {
            attempts: serde_json::to_string(game.attempts())?,
            state: game.state().to_string(),
            end_timestamp: game.end_timestamp().as_ref().map(|t| t.naive_utc()),
            version: to_i32(*game.version(), "version")?,
        })
    }
}

/// Cumulative statistics of one user.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = schema::user_statistics, primary_key(user_id))]
pub struct StatisticsRow {
    user_id: String,
    total_games: i32,
    wins: String,
    losses: i32,
    abandoned: i32,
    win_streak: i32,
    best_win_streak: i32,
}

impl StatisticsRow {
    /// Encodes `stats` for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a counter does not fit its column.
    pub fn from_statistics(user_id: &UserId, stats: &UserStatistics) -> Result<Self, DbError> {
        Ok(Self {
            user_id: user_id.as_str().to_string(),
            total_games: to_i32(*stats.total_games(), "total_games")?,
            wins: serde_json::to_string(stats.wins())?,
            losses: to_i32(*stats.losses(), "losses")?,
            abandoned: to_i32(*stats.abandoned(), "abandoned")?,
            win_streak: to_i32(*stats.win_streak(), "win_streak")?,
            best_win_streak: to_i32(*stats.best_win_streak(), "best_win_streak")?,
        })
    }

    /// Decodes the row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a column cannot be decoded.
    pub fn into_statistics(self) -> Result<UserStatistics, DbError> {
        let wins: BTreeMap<u32, u32> = serde_json::from_str(&self.wins)?;
        Ok(UserStatistics::from_parts(
            to_u32(self.total_games, "total_games")?,
            wins,
            to_u32(self.losses, "losses")?,
            to_u32(self.abandoned, "abandoned")?,
            to_u32(self.win_streak, "win_streak")?,
            to_u32(self.best_win_streak, "best_win_streak")?,
        ))
    }
}

/// Marks a game as folded into its owner's statistics.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::recorded_games)]
pub struct RecordedGameRow {
    game_id: i32,
    user_id: String,
}

impl From<&FinishedGame> for RecordedGameRow {
    fn from(game: &FinishedGame) -> Self {
        Self {
            game_id: game.game_id().get(),
            user_id: game.owner_id().as_str().to_string(),
        }
    }
}

#[track_caller]
fn to_u32(value: i32, column: &str) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|_| DbError::new(format!("Negative {}: {}", column, value)))
}

#[track_caller]
fn to_i32(value: u32, column: &str) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|_| DbError::new(format!("{} out of range: {}", column, value)))
}
