//! Word list loading.

use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::db::DbError;

/// Normalizes word list text: one word per line, trimmed and lowercased.
///
/// Blank lines and lines with anything but ASCII letters are skipped;
/// duplicates collapse.
pub fn parse_word_list(content: &str) -> Vec<String> {
    let words: BTreeSet<String> = content
        .lines()
        .map(|line| line.trim().to_ascii_lowercase())
        .filter(|word| !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic()))
        .collect();
    words.into_iter().collect()
}

/// Loads a word list from a file.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be read.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Vec<String>, DbError> {
    debug!("Reading word list");
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        DbError::new(format!(
            "Failed to read word list '{}': {}",
            path.as_ref().display(),
            e
        ))
    })?;

    let words = parse_word_list(&content);
    info!(count = words.len(), "Word list loaded");
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_and_skips_invalid() {
        let words = parse_word_list("Crane\n  slate \n\nit's\nCRANE\nnaïve\nirate\r\n");
        assert_eq!(words, vec!["crane", "irate", "slate"]);
    }
}
