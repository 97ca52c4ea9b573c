// loyalty-core/src/db/mod.rs

use std::time::Duration;
use once_cell::sync::OnceCell;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::{debug, info};
use crate::Error;

pub mod unit_of_work;

pub use unit_of_work::{Staged, UnitOfWork};

/// Pool configuration. Fixed once the pool exists.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    /// How long a caller waits for a free pooled connection.
    pub acquire_timeout: Duration,
    /// How long a transaction waits on another transaction's row lock.
    pub lock_timeout: Duration,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://loyalty@localhost:5432/loyalty".to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(3),
        }
    }
}

/// Postgres handle shared by every repository and engine.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Postgres>,
    lock_timeout: Duration,
}

static GLOBAL_DATABASE: OnceCell<Database> = OnceCell::new();

impl Database {
    pub async fn new(settings: &DatabaseSettings) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(&settings.url)
            .await?;

        info!("Connected to Postgres (max_connections={})", settings.max_connections);
        Ok(Self {
            pool,
            lock_timeout: settings.lock_timeout,
        })
    }

    /// Run migrations in the workspace `migrations/` folder.
    pub async fn migrate(&self) -> Result<(), Error> {
        info!("Applying migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations applied successfully.");
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            lock_timeout: DatabaseSettings::default().lock_timeout,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Opens a unit of work; see [`UnitOfWork`] for how it ends.
    pub async fn begin(&self, label: &'static str) -> Result<UnitOfWork, Error> {
        UnitOfWork::begin(&self.pool, label, self.lock_timeout).await
    }
}

/// Creates the process-wide database exactly once. A second call fails.
pub async fn init_global(settings: &DatabaseSettings) -> Result<&'static Database, Error> {
    if GLOBAL_DATABASE.get().is_some() {
        return Err(Error::InvalidInput("database pool is already initialised".into()));
    }
    let db = Database::new(settings).await?;
    GLOBAL_DATABASE
        .set(db)
        .map_err(|_| Error::InvalidInput("database pool is already initialised".into()))?;
    debug!("Global database pool installed");
    GLOBAL_DATABASE
        .get()
        .ok_or_else(|| Error::InvalidInput("database pool is not initialised".into()))
}
