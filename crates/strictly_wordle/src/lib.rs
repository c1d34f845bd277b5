//! Strictly Wordle - game session engine for a word-guessing puzzle.
//!
//! A player submits candidate words of fixed length; each attempt is scored
//! letter by letter until the player guesses the word or runs out of attempts.
//!
//! # Architecture
//!
//! - **Matching**: two-pass per-letter feedback with duplicate-letter handling
//! - **Validation**: prioritized attempt admissibility checks
//! - **Game**: the attempt state machine (`IN_PROGRESS` → `WINNER` | `LOSER` | `ABANDONED`)
//! - **Stats**: folds a finished game into cumulative player statistics
//! - **Sync**: client-side reconciliation of optimistic copies with server snapshots
//! - **Session**: orchestrates locking, validation, mutation and persistence
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use strictly_wordle::{
//!     InMemoryGameRepository, InMemoryStatisticsStore, InMemoryWordRepository, SessionManager,
//!     SessionSettings,
//! };
//!
//! # async fn example() -> Result<(), strictly_wordle::GameError> {
//! let words = Arc::new(InMemoryWordRepository::from_words(["apple", "crane", "slate"]));
//! let sessions = SessionManager::new(
//!     words,
//!     Arc::new(InMemoryGameRepository::new()),
//!     Arc::new(InMemoryStatisticsStore::new()),
//!     SessionSettings::default(),
//! );
//!
//! let game = sessions.start_game(None, None).await?;
//! let outcome = sessions.process_attempt(*game.id(), "crane").await?;
//! println!("{}", outcome.result_code());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod error;
mod game;
mod matching;
mod memory;
mod session;
mod stats;
mod store;
mod sync;
mod validation;

// Crate-level exports - Errors and result codes
pub use error::{ErrorLocation, GameError, Rejection, ResultCode, StoreError};

// Crate-level exports - Game model
pub use game::{AttemptVerdict, Game, GameId, GameRecord, GameState, NewGame, UserId};

// Crate-level exports - Letter matching
pub use matching::{KeyboardState, LetterMatchState, MatchError, best_state_for_letter, compute_letter_states};

// Crate-level exports - Validation
pub use validation::AttemptValidator;

// Crate-level exports - Statistics
pub use stats::{AbandonPolicy, FinishedGame, StatisticsAggregator, UserStatistics};

// Crate-level exports - Collaborators
pub use memory::{InMemoryGameRepository, InMemoryStatisticsStore, InMemoryWordRepository};
pub use store::{GameRepository, UserStatisticsStore, WordRepository};

// Crate-level exports - Session orchestration
pub use session::{AttemptOutcome, SessionManager, SessionSettings};

// Crate-level exports - Client reconciliation
pub use sync::{Divergence, LocalGame, ReconcileOutcome, reconcile};
