//! Command-line interface for strictly_wordle.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Wordle - word-guessing game server and client
#[derive(Parser, Debug)]
#[command(name = "strictly_wordle")]
#[command(about = "Word-guessing game server with REST API", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file (defaults apply if it does not exist)
    #[arg(short, long, default_value = "strictly_wordle.toml", global = true)]
    pub config: PathBuf,

    /// Override the database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server
    Serve {
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Import a word list (one word per line) into the database
    ImportWords {
        /// Word list file
        file: PathBuf,
    },

    /// Start a new game on a running server
    NewGame {
        /// Server URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server_url: String,

        /// Owning user
        #[arg(long)]
        user: Option<String>,

        /// Word length
        #[arg(long)]
        length: Option<usize>,
    },

    /// Guess a word in a game on a running server
    Guess {
        /// Game id
        game_id: i32,

        /// Candidate word
        word: String,

        /// Server URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server_url: String,
    },

    /// Abandon a game on a running server
    Abandon {
        /// Game id
        game_id: i32,

        /// Server URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server_url: String,
    },

    /// Show a user's statistics from a running server
    Stats {
        /// User id
        user_id: String,

        /// Server URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server_url: String,
    },
}
