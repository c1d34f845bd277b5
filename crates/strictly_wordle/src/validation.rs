//! Attempt admissibility checks.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{GameError, Rejection};
use crate::game::Game;
use crate::store::WordRepository;

/// Validates a candidate word against a game and the word list.
///
/// Checks run in strict priority order and stop at the first failure:
/// 1. game absent
/// 2. no attempts left
/// 3. word already attempted
/// 4. length differs from the target
/// 5. word not in the word list (the only check that performs I/O)
#[derive(Debug, Clone)]
pub struct AttemptValidator {
    words: Arc<dyn WordRepository>,
}

impl AttemptValidator {
    /// Creates a validator backed by the given word repository.
    pub fn new(words: Arc<dyn WordRepository>) -> Self {
        Self { words }
    }

    /// Runs the pure checks (2–4) against a present game.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`Rejection`].
    #[instrument(skip(game), fields(game_id = %game.id()))]
    pub fn check_admissible(word: &str, game: &Game) -> Result<(), Rejection> {
        if game.attempts().len() >= *game.max_attempts() as usize {
            return Err(Rejection::AttemptsExceeded);
        }
        if game.attempts().iter().any(|a| a == word) {
            return Err(Rejection::DuplicateAttempt);
        }
        if word.chars().count() != game.word_length() {
            return Err(Rejection::WordLengthMismatch);
        }
        Ok(())
    }

    /// Runs every check; never mutates `game`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Rejected`] for an inadmissible attempt and
    /// [`GameError::Internal`] if the word lookup fails.
    #[instrument(skip(self, game), fields(game_id = game.map(|g| g.id().get())))]
    pub async fn validate(&self, word: &str, game: Option<&Game>) -> Result<(), GameError> {
        let game = game.ok_or(Rejection::GameNotFound)?;

        if let Err(rejection) = Self::check_admissible(word, game) {
            warn!(%rejection, "Attempt rejected before word lookup");
            return Err(rejection.into());
        }

        self.check_word_list(word).await
    }

    /// Runs only the word-list check (5).
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::NotInWordList`] or an internal lookup failure.
    #[instrument(skip(self))]
    pub async fn check_word_list(&self, word: &str) -> Result<(), GameError> {
        if self.words.exists(word).await? {
            debug!("Word found in word list");
            Ok(())
        } else {
            warn!("Word not in word list");
            Err(Rejection::NotInWordList.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::game::{GameId, GameRecord, GameState};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Word repository that accepts everything and counts lookups.
    #[derive(Debug, Default)]
    struct CountingWords {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl WordRepository for CountingWords {
        async fn exists(&self, _word: &str) -> Result<bool, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn random_word_of_length(&self, _length: usize) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
    }

    fn game_with(attempts: &[&str], max_attempts: u32) -> Game {
        Game::try_from(GameRecord {
            id: GameId::new(7),
            word: "apple".to_string(),
            attempts: attempts.iter().map(|a| a.to_string()).collect(),
            max_attempts,
            state: GameState::InProgress,
            start_timestamp: Utc::now(),
            end_timestamp: None,
            owner_id: None,
            version: attempts.len() as u32,
        })
        .unwrap()
    }

    fn rejection(result: Result<(), GameError>) -> Option<Rejection> {
        match result {
            Err(GameError::Rejected(r)) => Some(r),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_missing_game_rejected_first() {
        let words = Arc::new(CountingWords::default());
        let validator = AttemptValidator::new(words.clone());

        let result = validator.validate("crane", None).await;
        assert_eq!(rejection(result), Some(Rejection::GameNotFound));
        assert_eq!(words.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_attempts_exceeded_wins_over_duplicate_and_length() {
        let words = Arc::new(CountingWords::default());
        let validator = AttemptValidator::new(words.clone());
        let game = game_with(&["crane", "slate"], 2);

        // Duplicate and wrong length too, but exceeding comes first
        let result = validator.validate("crane", Some(&game)).await;
        assert_eq!(rejection(result), Some(Rejection::AttemptsExceeded));
        assert_eq!(words.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duplicate_before_length() {
        let words = Arc::new(CountingWords::default());
        let validator = AttemptValidator::new(words.clone());
        let game = game_with(&["crane"], 6);

        let result = validator.validate("crane", Some(&game)).await;
        assert_eq!(rejection(result), Some(Rejection::DuplicateAttempt));

        let result = validator.validate("cranes", Some(&game)).await;
        assert_eq!(rejection(result), Some(Rejection::WordLengthMismatch));
        assert_eq!(words.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_word_lookup_only_for_admissible_attempts() {
        let words = Arc::new(CountingWords::default());
        let validator = AttemptValidator::new(words.clone());
        let game = game_with(&[], 6);

        assert!(validator.validate("crane", Some(&game)).await.is_ok());
        assert_eq!(words.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_word_rejected() {
        let words = Arc::new(crate::memory::InMemoryWordRepository::from_words(["apple"]));
        let validator = AttemptValidator::new(words);
        let game = game_with(&[], 6);

        let result = validator.validate("amber", Some(&game)).await;
        assert_eq!(rejection(result), Some(Rejection::NotInWordList));
    }
}
