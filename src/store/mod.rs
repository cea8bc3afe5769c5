use core::fmt;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{info, instrument};

pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),
}

/// Durable key/value persistence for platform credentials. Writes are
/// upserts: a second write to the same key replaces the previous value
/// in a single statement, so readers never observe a torn blob.
#[async_trait]
pub trait TokenStore: Send + Sync + fmt::Debug {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> StoreResult<()>;
}

const CREATE_SETTINGS: &str = "CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

const UPSERT_SETTING: &str = "INSERT INTO settings (key, value) VALUES (?1, ?2)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value";

const SELECT_SETTING: &str = "SELECT value FROM settings WHERE key = ?1";

#[derive(Debug)]
pub struct SqliteTokenStore {
    pool: SqlitePool,
}

impl SqliteTokenStore {
    #[instrument]
    pub async fn open(path: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        info!(path, "opened token store");

        Self::init(pool).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);

        // a single connection so every query sees the same in-memory db
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::query(CREATE_SETTINGS).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(SELECT_SETTING)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(UPSERT_SETTING)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
