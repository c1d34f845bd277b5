//! SQLite implementation of the engine's collaborator traits.

use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use strictly_wordle::{
    FinishedGame, Game, GameId, GameRepository, NewGame, StatisticsAggregator, StoreError, UserId,
    UserStatistics, UserStatisticsStore, WordRepository,
};
use tracing::{debug, info, instrument, warn};

use crate::db::{
    DbError, GameChangeset, GameRow, NewGameRow, RecordedGameRow, StatisticsRow, WordRow, schema,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Rows inserted per statement when importing words.
const WORD_BATCH: usize = 500;

/// Milliseconds a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// SQLite-backed store for words, games and user statistics.
///
/// Each call opens its own connection; the async trait methods run the
/// blocking Diesel calls on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: String,
}

impl SqliteStore {
    /// Creates a store for the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating SqliteStore");
        Ok(Self { db_path })
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))?;
        conn.batch_execute(&format!("PRAGMA busy_timeout = {};", BUSY_TIMEOUT_MS))?;
        Ok(conn)
    }

    /// Applies any pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migrations failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    /// Adds words to the word list, skipping ones already present.
    ///
    /// Returns the number of words actually inserted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs; nothing is inserted then.
    #[instrument(skip(self, words), fields(count = words.len()))]
    pub fn insert_words(&self, words: &[String]) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        let rows: Vec<WordRow> = words.iter().map(|w| WordRow::from_word(w)).collect();

        let inserted = conn.transaction::<_, DbError, _>(|conn| {
            let mut inserted = 0;
            for chunk in rows.chunks(WORD_BATCH) {
                inserted += diesel::insert_or_ignore_into(schema::words::table)
                    .values(chunk)
                    .execute(conn)?;
            }
            Ok(inserted)
        })?;

        info!(inserted, "Words imported");
        Ok(inserted)
    }

    /// Counts the words in the word list.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn count_words(&self) -> Result<i64, DbError> {
        let mut conn = self.connection()?;
        Ok(schema::words::table.count().get_result(&mut conn)?)
    }

    /// Returns true if `word` is in the word list.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn word_exists(&self, word: &str) -> Result<bool, DbError> {
        let mut conn = self.connection()?;
        let exists: bool = diesel::select(diesel::dsl::exists(
            schema::words::table.filter(schema::words::word.eq(word)),
        ))
        .get_result(&mut conn)?;
        debug!(exists, "Word lookup");
        Ok(exists)
    }

    /// Picks a random word with `length` letters.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn random_word(&self, length: usize) -> Result<Option<String>, DbError> {
        let length = i32::try_from(length)
            .map_err(|_| DbError::new(format!("Word length out of range: {}", length)))?;
        let mut conn = self.connection()?;

        let word = schema::words::table
            .filter(schema::words::length.eq(length))
            .select(schema::words::word)
            .order(sql::<Integer>("RANDOM()"))
            .first::<String>(&mut conn)
            .optional()?;

        if word.is_none() {
            warn!(length, "No word of requested length");
        }
        Ok(word)
    }

    /// Loads a game by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs or the row is corrupt.
    #[instrument(skip(self))]
    pub fn find_game(&self, id: GameId) -> Result<Option<Game>, DbError> {
        let mut conn = self.connection()?;

        let row = schema::games::table
            .find(id.get())
            .select(GameRow::as_select())
            .first(&mut conn)
            .optional()?;

        row.map(GameRow::into_game).transpose()
    }

    /// Inserts a new game and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, game))]
    pub fn insert_game(&self, game: NewGame) -> Result<GameId, DbError> {
        let mut conn = self.connection()?;
        let row = NewGameRow::try_from(game)?;

        let id: i32 = diesel::insert_into(schema::games::table)
            .values(&row)
            .returning(schema::games::id)
            .get_result(&mut conn)?;

        info!(game_id = id, "Game inserted");
        Ok(GameId::new(id))
    }

    /// Writes `game` if its stored version is still `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, game), fields(game_id = %game.id(), version = game.version()))]
    pub fn update_game(&self, game: &Game, expected_version: u32) -> Result<bool, DbError> {
        let expected = i32::try_from(expected_version)
            .map_err(|_| DbError::new(format!("Version out of range: {}", expected_version)))?;
        let changes = GameChangeset::try_from(game)?;
        let mut conn = self.connection()?;

        let updated = diesel::update(
            schema::games::table
                .filter(schema::games::id.eq(game.id().get()))
                .filter(schema::games::version.eq(expected)),
        )
        .set(&changes)
        .execute(&mut conn)?;

        if updated == 0 {
            warn!(expected_version, "Version check failed");
        }
        Ok(updated == 1)
    }

    /// Loads a user's statistics, empty if the user has none yet.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs or the row is corrupt.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn load_statistics(&self, user_id: &UserId) -> Result<UserStatistics, DbError> {
        let mut conn = self.connection()?;
        read_statistics(&mut conn, user_id)
    }

    /// Folds a finished game into its owner's statistics unless it was
    /// recorded before.
    ///
    /// The claim on the game id, the read and the write share one immediate
    /// transaction, which holds the database write lock throughout.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs; nothing is written then.
    #[instrument(skip(self, game, aggregator), fields(game_id = %game.game_id(), user_id = %game.owner_id()))]
    pub fn record_game(
        &self,
        game: &FinishedGame,
        aggregator: StatisticsAggregator,
    ) -> Result<bool, DbError> {
        let mut conn = self.connection()?;

        let recorded = conn.immediate_transaction::<_, DbError, _>(|conn| {
            let claimed = diesel::insert_or_ignore_into(schema::recorded_games::table)
                .values(&RecordedGameRow::from(game))
                .execute(conn)?;
            if claimed == 0 {
                return Ok(false);
            }

            let stats = read_statistics(conn, game.owner_id())?;
            let updated = aggregator.apply_game(stats, game);
            write_statistics(conn, game.owner_id(), &updated)?;
            Ok(true)
        })?;

        if recorded {
            info!("Game recorded in statistics");
        } else {
            debug!("Game already recorded");
        }
        Ok(recorded)
    }

    /// Runs a blocking database call off the async runtime.
    async fn blocking<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteStore) -> Result<T, DbError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || call(&store))
            .await
            .map_err(|e| StoreError::new(format!("Database task failed: {}", e)))?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl WordRepository for SqliteStore {
    async fn exists(&self, word: &str) -> Result<bool, StoreError> {
        let word = word.to_string();
        self.blocking(move |store| store.word_exists(&word)).await
    }

    async fn random_word_of_length(&self, length: usize) -> Result<Option<String>, StoreError> {
        self.blocking(move |store| store.random_word(length)).await
    }
}

#[async_trait]
impl GameRepository for SqliteStore {
    async fn find_by_id(&self, id: GameId) -> Result<Option<Game>, StoreError> {
        self.blocking(move |store| store.find_game(id)).await
    }

    async fn insert(&self, game: NewGame) -> Result<GameId, StoreError> {
        self.blocking(move |store| store.insert_game(game)).await
    }

    async fn update(&self, game: &Game, expected_version: u32) -> Result<bool, StoreError> {
        let game = game.clone();
        self.blocking(move |store| store.update_game(&game, expected_version))
            .await
    }
}

#[async_trait]
impl UserStatisticsStore for SqliteStore {
    async fn load(&self, user_id: &UserId) -> Result<UserStatistics, StoreError> {
        let user_id = user_id.clone();
        self.blocking(move |store| store.load_statistics(&user_id))
            .await
    }

    async fn record(
        &self,
        game: &FinishedGame,
        aggregator: StatisticsAggregator,
    ) -> Result<bool, StoreError> {
        let game = game.clone();
        self.blocking(move |store| store.record_game(&game, aggregator))
            .await
    }
}

fn read_statistics(conn: &mut SqliteConnection, user_id: &UserId) -> Result<UserStatistics, DbError> {
    let row = schema::user_statistics::table
        .find(user_id.as_str())
        .select(StatisticsRow::as_select())
        .first(conn)
        .optional()?;

    match row {
        Some(row) => row.into_statistics(),
        None => {
            debug!("No statistics yet");
            Ok(UserStatistics::default())
        }
    }
}

fn write_statistics(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    stats: &UserStatistics,
) -> Result<(), DbError> {
    let row = StatisticsRow::from_statistics(user_id, stats)?;
    diesel::insert_into(schema::user_statistics::table)
        .values(&row)
        .on_conflict(schema::user_statistics::user_id)
        .do_update()
        .set(&row)
        .execute(conn)?;
    debug!(total_games = stats.total_games(), "Statistics saved");
    Ok(())
}
