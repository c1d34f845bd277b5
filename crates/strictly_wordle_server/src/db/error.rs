//! Database error types.

use derive_more::{Display, Error};
use strictly_wordle::{ErrorLocation, StoreError};
use tracing::instrument;

/// Database error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Database error: {} at {}", message, location)]
pub struct DbError {
    /// Error message.
    pub message: String,
    /// Where the error was raised.
    pub location: ErrorLocation,
}

impl DbError {
    /// Creates a new database error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(format!("Diesel error: {}", err))
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(format!("Connection error: {}", err))
    }
}

impl From<serde_json::Error> for DbError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Column encoding error: {}", err))
    }
}

/// Keeps the location the database error was raised at, not the conversion site.
impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self {
            message: err.message,
            location: err.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_keeps_database_location() {
        let db_err = DbError::new("locked");
        let location = db_err.location;
        let store_err = StoreError::from(db_err);
        assert_eq!(store_err.location, location);
        assert_eq!(store_err.message, "locked");
    }
}
