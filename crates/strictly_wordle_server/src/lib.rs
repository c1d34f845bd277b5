//! Strictly Wordle server - REST API, SQLite persistence and a reconciling client
//! for the [`strictly_wordle`] engine.
//!
//! # Architecture
//!
//! - **db**: Diesel/SQLite implementations of the engine's collaborator traits
//! - **api**: axum router mapping engine results onto HTTP
//! - **client**: REST client with optimistic prediction and reconciliation
//! - **config**: TOML configuration with environment overrides
//! - **words**: word list import

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod api;
mod client;
mod config;
mod db;
mod words;

// Crate-level exports - HTTP boundary
pub use api::{
    AbandonResponse, ApiError, AppState, AttemptRequest, AttemptResponse, CreateGameRequest,
    ErrorBody, GameData, GameResponse, StatisticsResponse, router,
};

// Crate-level exports - Client
pub use client::{ClientSession, GuessOutcome, RestGameClient};

// Crate-level exports - Configuration
pub use config::{ConfigError, DB_PATH_ENV, PORT_ENV, ServerConfig};

// Crate-level exports - Persistence
pub use db::{DbError, SqliteStore};

// Crate-level exports - Word lists
pub use words::{load_from_file, parse_word_list};
