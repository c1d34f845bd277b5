//! Client-side reconciliation of optimistic game copies.
//!
//! A client predicts its own post-attempt snapshot before the server answers,
//! then checks that prediction against the authoritative snapshot. Any
//! disagreement discards the local copy; the two sides are never merged.

use chrono::Utc;
use derive_more::{Display, Error};
use tracing::{debug, info, instrument, warn};

use crate::error::Rejection;
use crate::game::{Game, GameId};
use crate::matching::{KeyboardState, compute_letter_states};

/// Why a server snapshot could not be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum Divergence {
    /// The snapshots describe different games.
    #[display("Game id mismatch: local {local}, server {server}")]
    GameId {
        /// Id held locally.
        local: GameId,
        /// Id returned by the server.
        server: GameId,
    },
    /// The target words differ.
    #[display("Target word mismatch")]
    Word,
    /// The attempt lists have different lengths.
    #[display("Attempt count mismatch: local {local}, server {server}")]
    AttemptCount {
        /// Attempts held locally.
        local: usize,
        /// Attempts returned by the server.
        server: usize,
    },
    /// The attempt lists differ at `index`.
    #[display("Attempt mismatch at index {index}")]
    AttemptContent {
        /// First differing position.
        index: usize,
    },
    /// There was no local prediction to check the server snapshot against.
    #[display("No local prediction to reconcile")]
    NoPrediction,
}

/// Verdict of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The server snapshot agrees with the prediction.
    Trusted(Game),
    /// The snapshots disagree; local state must be discarded.
    Diverged(Divergence),
}

/// Checks a server snapshot against the locally predicted one.
///
/// Identifier, target word, attempt count and attempt content must all agree,
/// otherwise the outcome is [`ReconcileOutcome::Diverged`].
#[instrument(skip(local, server), fields(game_id = %local.id()))]
pub fn reconcile(local: &Game, server: Game) -> ReconcileOutcome {
    let divergence = if local.id() != server.id() {
        Some(Divergence::GameId {
            local: *local.id(),
            server: *server.id(),
        })
    } else if local.word() != server.word() {
        Some(Divergence::Word)
    } else if local.attempts().len() != server.attempts().len() {
        Some(Divergence::AttemptCount {
            local: local.attempts().len(),
            server: server.attempts().len(),
        })
    } else {
        local
            .attempts()
            .iter()
            .zip(server.attempts())
            .position(|(l, s)| l != s)
            .map(|index| Divergence::AttemptContent { index })
    };

    match divergence {
        Some(divergence) => {
            warn!(%divergence, "Server snapshot diverged from local prediction");
            ReconcileOutcome::Diverged(divergence)
        }
        None => {
            debug!("Server snapshot trusted");
            ReconcileOutcome::Trusted(server)
        }
    }
}

/// A client's copy of one game: the last trusted server snapshot plus at
/// most one optimistic prediction on top of it.
#[derive(Debug, Clone, Default)]
pub struct LocalGame {
    committed: Option<Game>,
    predicted: Option<Game>,
    keyboard: KeyboardState,
    needs_resync: bool,
}

impl LocalGame {
    /// Starts from an authoritative snapshot.
    pub fn new(game: Game) -> Self {
        Self {
            keyboard: game.keyboard(),
            committed: Some(game),
            predicted: None,
            needs_resync: false,
        }
    }

    /// The predicted game if one is pending, otherwise the committed one.
    pub fn current(&self) -> Option<&Game> {
        self.predicted.as_ref().or(self.committed.as_ref())
    }

    /// The last snapshot trusted from the server.
    pub fn committed(&self) -> Option<&Game> {
        self.committed.as_ref()
    }

    /// Keyboard coloring including any pending prediction.
    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// True after a divergence or an unknown outcome, until
    /// [`LocalGame::resync`] is called.
    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    /// Optimistically applies `word` to a copy of the committed game.
    ///
    /// Only the pure admissibility checks run; word-list membership is left
    /// to the server.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::GameNotFound`] while a resync is pending, or the
    /// rejection the server would give for an inadmissible attempt.
    #[instrument(skip(self))]
    pub fn predict(&mut self, word: &str) -> Result<&Game, Rejection> {
        let committed = match (&self.committed, self.needs_resync) {
            (Some(game), false) => game,
            _ => return Err(Rejection::GameNotFound),
        };

        let word = word.trim().to_lowercase();
        let mut predicted = committed.clone();
        predicted.apply_attempt(&word, Utc::now())?;

        if let Ok(states) = compute_letter_states(&word, predicted.word()) {
            self.keyboard.record(&word, &states);
        }
        debug!(attempts = predicted.attempts().len(), "Prediction recorded");
        Ok(self.predicted.insert(predicted))
    }

    /// Drops the pending prediction after the server refused the attempt.
    #[instrument(skip(self))]
    pub fn rollback(&mut self) {
        if self.predicted.take().is_some() {
            debug!("Prediction rolled back");
        }
        self.keyboard = self
            .committed
            .as_ref()
            .map(Game::keyboard)
            .unwrap_or_default();
    }

    /// Commits the server's answer to the pending prediction.
    ///
    /// # Errors
    ///
    /// On divergence every piece of local state is discarded and
    /// [`LocalGame::needs_resync`] turns true.
    #[instrument(skip(self, server), fields(game_id = %server.id()))]
    pub fn commit(&mut self, server: Game) -> Result<&Game, Divergence> {
        let outcome = match self.predicted.take() {
            Some(predicted) => reconcile(&predicted, server),
            None => ReconcileOutcome::Diverged(Divergence::NoPrediction),
        };

        match outcome {
            ReconcileOutcome::Trusted(game) => {
                self.keyboard = game.keyboard();
                info!(state = %game.state(), "Server snapshot committed");
                Ok(self.committed.insert(game))
            }
            ReconcileOutcome::Diverged(divergence) => {
                warn!(%divergence, "Local copy diverged from server");
                self.invalidate();
                Err(divergence)
            }
        }
    }

    /// Discards every piece of local state until [`LocalGame::resync`].
    ///
    /// Called when the server may or may not have applied a submitted change.
    #[instrument(skip(self))]
    pub fn invalidate(&mut self) {
        warn!("Discarding local game state");
        *self = Self {
            needs_resync: true,
            ..Self::default()
        };
    }

    /// Replaces all local state with a freshly fetched authoritative copy.
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    pub fn resync(&mut self, game: Game) {
        info!("Local game resynchronized");
        *self = Self::new(game);
    }
}
