//! Strictly Wordle - Unified CLI
//!
//! Runs the game server, imports word lists, and plays against a running server.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strictly_wordle::{Game, GameId, LetterMatchState, SessionManager, UserId};
use strictly_wordle_server::{
    ClientSession, RestGameClient, ServerConfig, SqliteStore, load_from_file, router,
};
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,strictly_wordle=debug,strictly_wordle_server=debug")
        }))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?.apply_env()?;
    if let Some(db_path) = cli.db_path {
        config = config.with_db_path(db_path);
    }

    match cli.command {
        Command::Serve { port, host } => run_server(config.with_bind(host, port)).await,
        Command::ImportWords { file } => import_words(&config, file),
        Command::NewGame {
            server_url,
            user,
            length,
        } => new_game(server_url, user, length).await,
        Command::Guess {
            game_id,
            word,
            server_url,
        } => guess(server_url, game_id, word).await,
        Command::Abandon {
            game_id,
            server_url,
        } => abandon(server_url, game_id).await,
        Command::Stats {
            user_id,
            server_url,
        } => stats(server_url, user_id, *config.max_attempts()).await,
    }
}

/// Loads the config file, falling back to defaults when it does not exist.
#[instrument]
fn load_config(path: &Path) -> Result<ServerConfig> {
    if path.exists() {
        Ok(ServerConfig::from_file(path)?)
    } else {
        info!(path = %path.display(), "No config file, using defaults");
        Ok(ServerConfig::default())
    }
}

/// Run the HTTP game server
#[instrument(skip(config))]
async fn run_server(config: ServerConfig) -> Result<()> {
    let store = Arc::new(SqliteStore::new(config.db_path().clone())?);
    store.run_migrations()?;

    let word_count = store.count_words()?;
    if word_count == 0 {
        warn!("Word list is empty; run import-words before starting games");
    }

    let sessions = SessionManager::new(
        store.clone(),
        store.clone(),
        store,
        config.session_settings(),
    );
    let app = router(sessions);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), word_count, "Strictly Wordle server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Import a word list into the database
#[instrument(skip(config))]
fn import_words(config: &ServerConfig, file: PathBuf) -> Result<()> {
    let store = SqliteStore::new(config.db_path().clone())?;
    store.run_migrations()?;

    let words = load_from_file(&file)?;
    let inserted = store.insert_words(&words)?;
    println!(
        "Imported {} new words ({} read, {} total)",
        inserted,
        words.len(),
        store.count_words()?
    );
    Ok(())
}

#[instrument]
async fn new_game(server_url: String, user: Option<String>, length: Option<usize>) -> Result<()> {
    let client = RestGameClient::new(&server_url);
    let game = client.create_game(user.map(UserId::from), length).await?;
    println!(
        "Game {} started: {} letters, {} attempts",
        game.id(),
        game.word_length(),
        game.max_attempts()
    );
    Ok(())
}

#[instrument]
async fn guess(server_url: String, game_id: i32, word: String) -> Result<()> {
    let client = RestGameClient::new(&server_url);
    let mut session = ClientSession::resume(client, GameId::new(game_id)).await?;
    let outcome = session.guess(&word).await?;

    println!("{}", outcome.result_code());
    if let Some(game) = session.game() {
        print_board(game);
    }
    Ok(())
}

#[instrument]
async fn abandon(server_url: String, game_id: i32) -> Result<()> {
    let client = RestGameClient::new(&server_url);
    let mut session = ClientSession::resume(client, GameId::new(game_id)).await?;
    match session.abandon().await? {
        Some(code) => println!("{}", code),
        None => println!("Game {} abandoned", game_id),
    }
    Ok(())
}

#[instrument]
async fn stats(server_url: String, user_id: String, max_attempts: u32) -> Result<()> {
    let client = RestGameClient::new(&server_url);
    let stats = client.statistics(&UserId::from(user_id)).await?;

    println!("Played:      {}", stats.total_games());
    println!("Win rate:    {:.1}%", stats.win_rate());
    println!("Streak:      {} (best {})", stats.win_streak(), stats.best_win_streak());
    println!("Abandoned:   {}", stats.abandoned());
    for (attempts, wins) in stats.guess_distribution(max_attempts).iter().enumerate() {
        println!("  {}: {}", attempts + 1, wins);
    }
    Ok(())
}

/// Prints each attempt with `[x]` for exact, `(x)` for partial and ` x ` for absent letters.
fn print_board(game: &Game) {
    for (attempt, states) in game.attempts().iter().zip(game.feedback()) {
        let row: String = attempt
            .chars()
            .zip(states)
            .map(|(letter, state)| match state {
                LetterMatchState::Exact => format!("[{}]", letter),
                LetterMatchState::Partial => format!("({})", letter),
                LetterMatchState::None => format!(" {} ", letter),
            })
            .collect();
        println!("{}", row);
    }
    println!("{} ({} attempts left)", game.state(), game.attempts_left());
}
