//! Cumulative player statistics.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use crate::game::{Game, GameId, GameState, UserId};

/// Cumulative statistics for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStatistics {
    total_games: u32,
    /// Wins keyed by the number of attempts used.
    wins: BTreeMap<u32, u32>,
    losses: u32,
    abandoned: u32,
    win_streak: u32,
    best_win_streak: u32,
}

impl UserStatistics {
    /// Builds statistics from stored counters.
    pub fn from_parts(
        total_games: u32,
        wins: BTreeMap<u32, u32>,
        losses: u32,
        abandoned: u32,
        win_streak: u32,
        best_win_streak: u32,
    ) -> Self {
        Self {
            total_games,
            wins,
            losses,
            abandoned,
            win_streak,
            best_win_streak,
        }
    }

    /// Total number of games won.
    pub fn games_won(&self) -> u32 {
        self.wins.values().sum()
    }

    /// Win rate as a percentage (0.0–100.0).
    pub fn win_rate(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            (self.games_won() as f64 / self.total_games as f64) * 100.0
        }
    }

    /// Wins per attempt count for `1..=max_attempts`; index 0 is one attempt.
    pub fn guess_distribution(&self, max_attempts: u32) -> Vec<u32> {
        (1..=max_attempts)
            .map(|n| self.wins.get(&n).copied().unwrap_or(0))
            .collect()
    }
}

/// A finished game with an owner, as folded into statistics.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct FinishedGame {
    game_id: GameId,
    owner_id: UserId,
    num_attempts: u32,
    outcome: GameState,
}

impl FinishedGame {
    /// Returns `None` for games still in progress or without an owner.
    pub fn from_game(game: &Game) -> Option<Self> {
        let owner_id = game.owner_id().clone()?;
        game.is_terminal().then(|| Self {
            game_id: *game.id(),
            owner_id,
            num_attempts: game.attempts().len() as u32,
            outcome: *game.state(),
        })
    }
}

/// Whether abandoning a game breaks the current win streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonPolicy {
    /// Abandoning is not a loss; the streak survives.
    #[default]
    KeepStreak,
    /// Abandoning resets the streak like a loss.
    ResetStreak,
}

/// Folds finished games into [`UserStatistics`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsAggregator {
    abandon_policy: AbandonPolicy,
}

impl StatisticsAggregator {
    /// Creates an aggregator with the given abandon policy.
    pub fn new(abandon_policy: AbandonPolicy) -> Self {
        Self { abandon_policy }
    }

    /// Returns the abandon policy in effect.
    pub fn abandon_policy(&self) -> AbandonPolicy {
        self.abandon_policy
    }

    /// Applies one finished game to `stats`.
    ///
    /// `outcome` must be terminal; an in-progress outcome leaves the
    /// statistics unchanged.
    #[instrument(skip(self, stats))]
    pub fn apply(
        &self,
        mut stats: UserStatistics,
        num_attempts: u32,
        outcome: GameState,
    ) -> UserStatistics {
        match outcome {
            GameState::InProgress => {
                warn!("Ignoring statistics for a game still in progress");
                return stats;
            }
            GameState::Winner => {
                stats.win_streak += 1;
                stats.best_win_streak = stats.best_win_streak.max(stats.win_streak);
                *stats.wins.entry(num_attempts).or_insert(0) += 1;
            }
            GameState::Loser => {
                stats.losses += 1;
                stats.win_streak = 0;
            }
            GameState::Abandoned => {
                stats.abandoned += 1;
                if self.abandon_policy == AbandonPolicy::ResetStreak {
                    stats.win_streak = 0;
                }
            }
        }
        stats.total_games += 1;

        debug!(
            total_games = stats.total_games,
            win_streak = stats.win_streak,
            "Statistics updated"
        );
        stats
    }

    /// Applies a [`FinishedGame`] to `stats`.
    pub fn apply_game(&self, stats: UserStatistics, game: &FinishedGame) -> UserStatistics {
        self.apply(stats, game.num_attempts, game.outcome)
    }
}
