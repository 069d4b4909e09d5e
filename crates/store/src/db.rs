//! Database connection and pool management.

use blog_config::DatabaseConfig;
use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// The shared storage handle.
///
/// Open it once at process start and hand clones to whoever needs it: cloning
/// only clones the underlying pool handle, and the pool takes care of
/// acquiring and releasing physical connections for concurrent callers.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Apply the query-based PRAGMAs to every connection the pool
            // opens, not just the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Connection)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Connect using a SQLite connection URL and the default pool settings.
    ///
    /// Accepts anything `sqlx` understands, for example
    /// `sqlite://blog.db?mode=rwc` or `sqlite::memory:`. The database file is
    /// only created if the URL asks for it (`mode=rwc`).
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let config = DatabaseConfig {
            url: url.as_ref().to_string(),
            ..DatabaseConfig::default()
        };
        Self::connect_with(&config).await
    }

    /// Connect using the `database` section of the configuration.
    #[instrument(name = "connecting to database", skip(config), fields(max_connections = config.max_connections))]
    pub async fn connect_with(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url).or_raise(|| ErrorKind::Connection)?;
        let options = Self::base_options(options, Duration::from_millis(config.busy_timeout_ms));
        Self::new(options, config.max_connections).await
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(":memory:");
        let options = Self::base_options(options, Duration::from_millis(DatabaseConfig::default().busy_timeout_ms));
        // A private in-memory database is per-connection, so parallel
        // connections would each see their own empty schema.
        Self::new(options, 1).await
    }

    fn base_options(options: SqliteConnectOptions, busy_timeout: Duration) -> SqliteConnectOptions {
        options
            .journal_mode(SqliteJournalMode::Wal)
            // post_tags relies on the engine for referential integrity.
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(busy_timeout)
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA temp_store = MEMORY;
                PRAGMA cache_size = -8192;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Run database migrations.
    ///
    /// Called automatically by every constructor.
    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    ///
    /// Waits for all connections to be returned to the pool and then closes
    /// them. The `Database` (and every clone of it) is unusable afterwards.
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(!db.pool().is_closed());
        db.close().await;
        assert!(db.pool().is_closed());
    }

    #[tokio::test]
    async fn test_connect_with_memory_url() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('posts', 'tags', 'post_tags') ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();
        assert_eq!(tables, ["post_tags", "posts", "tags"]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_pragmas_are_applied() {
        let db = Database::connect_in_memory().await.unwrap();
        let row: (i64,) = sqlx::query_as("PRAGMA foreign_keys").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, 1, "foreign_keys should be ON");
        let row: (i64,) = sqlx::query_as("PRAGMA cache_size").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, -8192, "cache_size should be set by after_connect()");
        db.close().await;
    }

    #[tokio::test]
    async fn test_malformed_url() {
        let err = Database::connect("sqlite://blog.db?no_such_option=1").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_unreachable_target() {
        let err = Database::connect("sqlite:///definitely/not/here/blog.db?mode=rwc").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Connection);
        assert!(err.is_retryable());
    }
}
