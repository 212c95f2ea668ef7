//! Persistence for the Swiss pairing core.
//!
//! [`TournamentStore`] is the only seam the pairing core depends on. Two
//! implementations ship here: [`InMemoryStore`] and [`PgTournamentStore`],
//! the latter on a PostgreSQL pool managed by [`Database`].

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod repository;
pub mod timeouts;

pub use config::{ConfigError, DatabaseConfig};
pub use memory::InMemoryStore;
pub use repository::{PgTournamentStore, TournamentStore};

use crate::tournament::SwissResult;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    query_timeout: Duration,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// A database that cannot be reached is reported as
    /// `SwissError::Connection`; the pool is never handed out half-initialized.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use swiss_pairing::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = DatabaseConfig::from_env()?;
    ///     let db = Database::new(&config).await?;
    ///     db.run_migrations().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> SwissResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Connected to tournament database (max {} connections)",
            config.max_connections
        );

        Ok(Self {
            pool,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Build a store over this pool
    pub fn store(&self) -> PgTournamentStore {
        PgTournamentStore::new(self.pool.clone()).with_query_timeout(self.query_timeout)
    }

    /// Apply the bundled schema migrations
    pub async fn run_migrations(&self) -> SwissResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> SwissResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
