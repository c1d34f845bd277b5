//! SQLite persistence for words, games and user statistics.

mod error;
mod models;
mod schema;
mod store;

pub use error::DbError;
pub use models::{GameChangeset, GameRow, NewGameRow, RecordedGameRow, StatisticsRow, WordRow};
pub use store::SqliteStore;
