//! Error types and result codes for the game engine.

use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::game::GameId;

/// Result code reported to the HTTP boundary for an attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    /// Attempt accepted, game continues.
    WrongWord,
    /// Attempt guessed the word.
    Winner,
    /// Attempt used the last try without guessing the word.
    Loser,
    /// No game with the requested id.
    GameNotFound,
    /// The game has no attempts left.
    AttemptsExceeded,
    /// The word was already attempted in this game.
    DuplicateAttempt,
    /// The word length differs from the target word length.
    WordLengthMismatch,
    /// The word is not in the word list.
    NotInWordList,
    /// The game already reached a terminal state.
    GameAlreadyOver,
}

impl ResultCode {
    /// Returns true for codes produced by an accepted attempt.
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::WrongWord | Self::Winner | Self::Loser)
    }
}

/// Reason an attempt (or abandon) was refused without mutating the game.
///
/// Variants are listed in the priority order in which they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Error)]
pub enum Rejection {
    /// The game reference is absent.
    #[display("Game not found")]
    GameNotFound,
    /// The game already reached a terminal state.
    #[display("Game is already over")]
    GameAlreadyOver,
    /// All attempts have been used.
    #[display("No attempts left")]
    AttemptsExceeded,
    /// The word was already attempted.
    #[display("Word already attempted")]
    DuplicateAttempt,
    /// The word length differs from the target.
    #[display("Word length does not match")]
    WordLengthMismatch,
    /// The word is not in the word list.
    #[display("Word is not in the word list")]
    NotInWordList,
}

impl Rejection {
    /// Maps the rejection onto its wire result code.
    pub fn result_code(self) -> ResultCode {
        match self {
            Self::GameNotFound => ResultCode::GameNotFound,
            Self::GameAlreadyOver => ResultCode::GameAlreadyOver,
            Self::AttemptsExceeded => ResultCode::AttemptsExceeded,
            Self::DuplicateAttempt => ResultCode::DuplicateAttempt,
            Self::WordLengthMismatch => ResultCode::WordLengthMismatch,
            Self::NotInWordList => ResultCode::NotInWordList,
        }
    }
}

/// Source location an error was raised at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{}:{}", file, line)]
pub struct ErrorLocation {
    /// Source file where error occurred.
    pub file: &'static str,
    /// Line number where error occurred.
    pub line: u32,
}

impl ErrorLocation {
    /// Captures the location of the caller.
    #[track_caller]
    pub fn caller() -> Self {
        let loc = std::panic::Location::caller();
        Self {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

/// Collaborator (repository/store) failure with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Store error: {} at {}", message, location)]
pub struct StoreError {
    /// Error message.
    pub message: String,
    /// Where the error was raised.
    pub location: ErrorLocation,
}

impl StoreError {
    /// Creates a new store error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Serialization error: {}", err))
    }
}

/// Error returned by every engine operation.
#[derive(Debug, Clone, Display, Error, From)]
pub enum GameError {
    /// Inadmissible input; the game was not mutated.
    #[display("Rejected: {}", _0)]
    Rejected(Rejection),

    /// Game absent.
    #[display("Game {} not found", _0)]
    #[from(ignore)]
    NotFound(#[error(not(source))] GameId),

    /// Repository or store failure. The in-memory transition may have
    /// happened; re-read authoritative state before trusting it.
    #[display("Internal error: {}", _0)]
    Internal(StoreError),

    /// Concurrent writers kept winning the compare-and-swap.
    #[display("Conflicting update on game {} after {} retries", game_id, retries)]
    #[from(ignore)]
    Conflict {
        /// Game being mutated.
        game_id: GameId,
        /// Retries performed before giving up.
        retries: u32,
    },

    /// The word repository has no word of the requested length.
    #[display("No word of length {} available", _0)]
    #[from(ignore)]
    NoWordAvailable(#[error(not(source))] usize),
}

impl GameError {
    /// Returns the wire result code for rejections, if any.
    pub fn result_code(&self) -> Option<ResultCode> {
        match self {
            Self::Rejected(rejection) => Some(rejection.result_code()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_records_caller() {
        let err = StoreError::new("boom");
        assert!(err.location.file.ends_with("error.rs"));
        assert!(err.to_string().starts_with("Store error: boom at "));
    }

    #[test]
    fn test_rejections_map_to_result_codes() {
        assert_eq!(
            GameError::from(Rejection::GameAlreadyOver).result_code(),
            Some(ResultCode::GameAlreadyOver)
        );
        assert_eq!(GameError::Internal(StoreError::new("x")).result_code(), None);
    }
}
