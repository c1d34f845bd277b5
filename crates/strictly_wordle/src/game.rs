//! Game model and the attempt state machine.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_more::{Display, From};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use crate::error::{Rejection, ResultCode, StoreError};
use crate::matching::{KeyboardState, LetterMatchState, compute_letter_states};
use crate::validation::AttemptValidator;

/// Identifier assigned to a game by the [`GameRepository`](crate::GameRepository).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct GameId(i32);

impl GameId {
    /// Wraps a raw id.
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub fn get(self) -> i32 {
        self.0
    }
}

/// Opaque identifier of the user owning a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle phase of a game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    /// Attempts may still be submitted.
    InProgress,
    /// The word was guessed.
    Winner,
    /// All attempts were used without guessing the word.
    Loser,
    /// The player gave up.
    Abandoned,
}

impl GameState {
    /// Returns true for states with no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Result of an accepted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptVerdict {
    /// Incorrect word, attempts remain.
    WrongWord,
    /// The word was guessed.
    Winner,
    /// Incorrect word on the final attempt.
    Loser,
}

impl AttemptVerdict {
    /// Wire result code for this verdict.
    pub fn result_code(self) -> ResultCode {
        match self {
            Self::WrongWord => ResultCode::WrongWord,
            Self::Winner => ResultCode::Winner,
            Self::Loser => ResultCode::Loser,
        }
    }

    /// Game state reached by this verdict.
    pub fn state(self) -> GameState {
        match self {
            Self::WrongWord => GameState::InProgress,
            Self::Winner => GameState::Winner,
            Self::Loser => GameState::Loser,
        }
    }
}

/// A game about to be inserted; the repository assigns its id.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct NewGame {
    word: String,
    max_attempts: u32,
    owner_id: Option<UserId>,
    start_timestamp: DateTime<Utc>,
}

impl NewGame {
    /// Materializes the stored game once an id is known.
    pub fn into_game(self, id: GameId) -> Game {
        Game {
            id,
            word: self.word,
            attempts: Vec::new(),
            max_attempts: self.max_attempts,
            state: GameState::InProgress,
            start_timestamp: self.start_timestamp,
            end_timestamp: None,
            owner_id: self.owner_id,
            version: 0,
        }
    }
}

/// Unvalidated persisted shape of a [`Game`].
///
/// Converting into a [`Game`] checks every model invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    /// Game id.
    pub id: GameId,
    /// Target word.
    pub word: String,
    /// Attempts in submission order.
    pub attempts: Vec<String>,
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Lifecycle phase.
    pub state: GameState,
    /// When the game started.
    pub start_timestamp: DateTime<Utc>,
    /// When the game reached a terminal state.
    pub end_timestamp: Option<DateTime<Utc>>,
    /// Owning user, if any.
    pub owner_id: Option<UserId>,
    /// Optimistic concurrency version, bumped on every mutation.
    pub version: u32,
}

impl TryFrom<GameRecord> for Game {
    type Error = StoreError;

    #[track_caller]
    fn try_from(record: GameRecord) -> Result<Self, Self::Error> {
        let word_length = record.word.chars().count();

        if record.attempts.len() > record.max_attempts as usize {
            return Err(StoreError::new(format!(
                "Game {} has {} attempts but allows {}",
                record.id,
                record.attempts.len(),
                record.max_attempts
            )));
        }
        if let Some(bad) = record
            .attempts
            .iter()
            .find(|a| a.chars().count() != word_length)
        {
            return Err(StoreError::new(format!(
                "Game {} has attempt '{}' of the wrong length",
                record.id, bad
            )));
        }
        let distinct: HashSet<&String> = record.attempts.iter().collect();
        if distinct.len() != record.attempts.len() {
            return Err(StoreError::new(format!(
                "Game {} has duplicate attempts",
                record.id
            )));
        }
        if record.state.is_terminal() != record.end_timestamp.is_some() {
            return Err(StoreError::new(format!(
                "Game {} in state {} has inconsistent end timestamp",
                record.id, record.state
            )));
        }

        Ok(Self {
            id: record.id,
            word: record.word,
            attempts: record.attempts,
            max_attempts: record.max_attempts,
            state: record.state,
            start_timestamp: record.start_timestamp,
            end_timestamp: record.end_timestamp,
            owner_id: record.owner_id,
            version: record.version,
        })
    }
}

/// A single game and its attempt history.
///
/// Invariants, enforced by every constructor and transition:
/// - `attempts.len() <= max_attempts`
/// - every attempt has the same length as `word`, and no attempt repeats
/// - `end_timestamp` is set if and only if `state` is terminal
/// - `word` never changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase", try_from = "GameRecord")]
pub struct Game {
    id: GameId,
    word: String,
    attempts: Vec<String>,
    max_attempts: u32,
    state: GameState,
    start_timestamp: DateTime<Utc>,
    end_timestamp: Option<DateTime<Utc>>,
    owner_id: Option<UserId>,
    version: u32,
}

impl Game {
    /// Returns true once the game can no longer change.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Number of letters in the target word.
    pub fn word_length(&self) -> usize {
        self.word.chars().count()
    }

    /// Attempts still available.
    pub fn attempts_left(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts.len() as u32)
    }

    /// Converts back into the persisted shape.
    pub fn to_record(&self) -> GameRecord {
        GameRecord {
            id: self.id,
            word: self.word.clone(),
            attempts: self.attempts.clone(),
            max_attempts: self.max_attempts,
            state: self.state,
            start_timestamp: self.start_timestamp,
            end_timestamp: self.end_timestamp,
            owner_id: self.owner_id.clone(),
            version: self.version,
        }
    }

    /// Records an attempt and advances the state machine.
    ///
    /// Only the pure admissibility checks run here; word-list membership is
    /// the caller's concern. On error the game is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::GameAlreadyOver`] for a terminal game, otherwise
    /// the first failing check of [`AttemptValidator::check_admissible`].
    #[instrument(skip(self), fields(game_id = %self.id, state = %self.state))]
    pub fn apply_attempt(
        &mut self,
        word: &str,
        now: DateTime<Utc>,
    ) -> Result<AttemptVerdict, Rejection> {
        if self.is_terminal() {
            warn!("Attempt on finished game");
            return Err(Rejection::GameAlreadyOver);
        }
        AttemptValidator::check_admissible(word, self)?;

        self.attempts.push(word.to_string());
        self.version += 1;

        let is_correct = word == self.word;
        let is_final = self.attempts.len() as u32 == self.max_attempts;
        let verdict = if is_correct {
            AttemptVerdict::Winner
        } else if is_final {
            AttemptVerdict::Loser
        } else {
            AttemptVerdict::WrongWord
        };

        self.state = verdict.state();
        if self.is_terminal() {
            self.end_timestamp = Some(now);
            info!(attempts = self.attempts.len(), state = %self.state, "Game finished");
        } else {
            debug!(attempts_left = self.attempts_left(), "Attempt recorded");
        }

        Ok(verdict)
    }

    /// Gives up on the game.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::GameAlreadyOver`] unless the game is in progress.
    #[instrument(skip(self), fields(game_id = %self.id, state = %self.state))]
    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<(), Rejection> {
        if self.is_terminal() {
            warn!("Abandon on finished game");
            return Err(Rejection::GameAlreadyOver);
        }
        self.state = GameState::Abandoned;
        self.end_timestamp = Some(now);
        self.version += 1;
        info!(attempts = self.attempts.len(), "Game abandoned");
        Ok(())
    }

    /// Feedback for every attempt, in submission order.
    pub fn feedback(&self) -> Vec<Vec<LetterMatchState>> {
        self.attempts
            .iter()
            .filter_map(|attempt| compute_letter_states(attempt, &self.word).ok())
            .collect()
    }

    /// Keyboard coloring derived from all attempts so far.
    pub fn keyboard(&self) -> KeyboardState {
        KeyboardState::from_attempts(&self.word, &self.attempts)
    }
}
