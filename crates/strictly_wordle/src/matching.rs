//! Per-letter feedback for a guess against a target word.
//!
//! Feedback is computed in two passes so that duplicate letters are scored
//! against the letters the target actually has left:
//! 1. Exact matches claim their letter from the target's letter budget.
//! 2. Remaining positions, left to right, claim a partial match while budget lasts.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::instrument;

/// Feedback for a single letter position.
///
/// Variants are ordered `None < Partial < Exact`, so `max` yields the
/// strongest evidence seen for a letter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LetterMatchState {
    /// Letter absent from the remaining budget of the target.
    None,
    /// Letter present in the target but at another position.
    Partial,
    /// Letter correct and in position.
    Exact,
}

/// Error raised when feedback is requested for words of different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[display("Length mismatch: guess has {guess} letters, target has {target}")]
pub struct MatchError {
    /// Letters in the guess.
    pub guess: usize,
    /// Letters in the target.
    pub target: usize,
}

/// Computes the feedback for `guess` against `target`, one state per position.
///
/// # Errors
///
/// Returns [`MatchError`] if the words differ in length.
///
/// # Examples
///
/// ```
/// use strictly_wordle::{LetterMatchState::*, compute_letter_states};
///
/// let states = compute_letter_states("alloy", "llama").unwrap();
/// assert_eq!(states, vec![Partial, Exact, Partial, None, None]);
/// ```
#[instrument]
pub fn compute_letter_states(
    guess: &str,
    target: &str,
) -> Result<Vec<LetterMatchState>, MatchError> {
    let guess: Vec<char> = guess.chars().collect();
    let target: Vec<char> = target.chars().collect();

    if guess.len() != target.len() {
        return Err(MatchError {
            guess: guess.len(),
            target: target.len(),
        });
    }

    let mut states = vec![LetterMatchState::None; guess.len()];
    let mut remaining: HashMap<char, usize> = HashMap::new();
    for letter in &target {
        *remaining.entry(*letter).or_insert(0) += 1;
    }

    // First pass: exact matches
    for (i, (g, t)) in guess.iter().zip(&target).enumerate() {
        if g == t {
            states[i] = LetterMatchState::Exact;
            if let Some(count) = remaining.get_mut(g) {
                *count = count.saturating_sub(1);
            }
        }
    }

    // Second pass: earlier positions win the partial designation
    for (i, letter) in guess.iter().enumerate() {
        if states[i] == LetterMatchState::Exact {
            continue;
        }
        if let Some(count) = remaining.get_mut(letter)
            && *count > 0
        {
            states[i] = LetterMatchState::Partial;
            *count -= 1;
        }
    }

    Ok(states)
}

/// Returns the strongest state observed for `letter` across scored attempts.
///
/// `history` yields each attempt with its feedback. Returns `None` when the
/// letter was never guessed. An `Exact` observation is never downgraded by a
/// later weaker one.
#[instrument(skip(history))]
pub fn best_state_for_letter<'a, I>(letter: char, history: I) -> Option<LetterMatchState>
where
    I: IntoIterator<Item = (&'a str, &'a [LetterMatchState])>,
{
    history
        .into_iter()
        .flat_map(|(guess, states)| guess.chars().zip(states.iter().copied()))
        .filter(|(c, _)| *c == letter)
        .map(|(_, state)| state)
        .max()
}

/// Virtual keyboard coloring for one game, owned by whoever renders it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardState {
    keys: BTreeMap<char, LetterMatchState>,
}

impl KeyboardState {
    /// Creates an empty keyboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the keyboard for every attempt made against `target`.
    ///
    /// Attempts whose length differs from the target are skipped.
    #[instrument(skip(attempts))]
    pub fn from_attempts<S: AsRef<str>>(target: &str, attempts: &[S]) -> Self {
        let mut keyboard = Self::new();
        for attempt in attempts {
            if let Ok(states) = compute_letter_states(attempt.as_ref(), target) {
                keyboard.record(attempt.as_ref(), &states);
            }
        }
        keyboard
    }

    /// Folds one scored attempt into the keyboard.
    pub fn record(&mut self, guess: &str, states: &[LetterMatchState]) {
        for (letter, state) in guess.chars().zip(states.iter().copied()) {
            self.keys
                .entry(letter)
                .and_modify(|best| *best = (*best).max(state))
                .or_insert(state);
        }
    }

    /// Returns the best known state for `letter`, if it has been guessed.
    pub fn state_of(&self, letter: char) -> Option<LetterMatchState> {
        self.keys.get(&letter).copied()
    }

    /// Iterates over guessed letters in alphabetical order.
    pub fn iter(&self) -> impl Iterator<Item = (char, LetterMatchState)> + '_ {
        self.keys.iter().map(|(letter, state)| (*letter, *state))
    }

    /// Returns true if no letter has been guessed.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::LetterMatchState::{Exact, None as Miss, Partial};
    use super::*;

    #[test]
    fn test_duplicate_letters_alloy_llama() {
        let states = compute_letter_states("alloy", "llama").unwrap();
        assert_eq!(states, vec![Partial, Exact, Partial, Miss, Miss]);
    }

    #[test]
    fn test_exact_positions_match_equal_letters() {
        let pairs = [
            ("crane", "slate"),
            ("speed", "erase"),
            ("robot", "floor"),
            ("aaaaa", "abaca"),
        ];
        for (guess, target) in pairs {
            let states = compute_letter_states(guess, target).unwrap();
            assert_eq!(states.len(), target.len());
            for (i, (g, t)) in guess.chars().zip(target.chars()).enumerate() {
                assert_eq!(states[i] == Exact, g == t, "{guess} vs {target} at {i}");
            }
        }
    }

    #[test]
    fn test_speed_against_erase() {
        // Both E's are partial: ERASE has two E's, neither at positions 2 or 3
        let states = compute_letter_states("speed", "erase").unwrap();
        assert_eq!(states, vec![Partial, Miss, Partial, Partial, Miss]);
    }

    #[test]
    fn test_exact_claims_before_partial() {
        // Second O is exact, so the first O only gets the remaining O
        let states = compute_letter_states("robot", "floor").unwrap();
        assert_eq!(states, vec![Partial, Partial, Miss, Exact, Miss]);
    }

    #[test]
    fn test_exact_match_consumes_budget_for_later_duplicates() {
        // Target has a single E, claimed by the exact match at the end
        let states = compute_letter_states("eerie", "crane").unwrap();
        assert_eq!(states, vec![Miss, Miss, Partial, Miss, Exact]);
    }

    #[test]
    fn test_all_correct() {
        let states = compute_letter_states("apple", "apple").unwrap();
        assert!(states.iter().all(|s| *s == Exact));
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let err = compute_letter_states("apples", "apple").unwrap_err();
        assert_eq!(err, MatchError { guess: 6, target: 5 });
    }

    #[test]
    fn test_best_state_never_downgrades_exact() {
        let first = compute_letter_states("crane", "cabin").unwrap();
        let second = compute_letter_states("scoop", "cabin").unwrap();
        let history = [("crane", first.as_slice()), ("scoop", second.as_slice())];

        assert_eq!(best_state_for_letter('c', history), Some(Exact));
        assert_eq!(best_state_for_letter('z', history), Option::None);
    }

    #[test]
    fn test_keyboard_keeps_strongest_state() {
        let mut keyboard = KeyboardState::new();
        keyboard.record("ab", &[Exact, Miss]);
        keyboard.record("ba", &[Partial, Miss]);

        assert_eq!(keyboard.state_of('a'), Some(Exact));
        assert_eq!(keyboard.state_of('b'), Some(Partial));
        assert_eq!(keyboard.state_of('c'), Option::None);
    }

    #[test]
    fn test_keyboard_from_attempts_skips_wrong_length() {
        let keyboard = KeyboardState::from_attempts("apple", &["plead", "toolong"]);
        assert_eq!(keyboard.state_of('p'), Some(Partial));
        assert_eq!(keyboard.state_of('t'), Option::None);
    }

    #[test]
    fn test_state_order() {
        assert!(Exact > Partial);
        assert!(Partial > Miss);
        assert_eq!(Exact.to_string(), "EXACT");
    }
}
