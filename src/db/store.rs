use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{info, warn};

use crate::db::models::{SignalRecord, SignalRow};
use crate::error::{AppError, Result};
use crate::types::{AssetPair, SignalType, Timeframe};

/// Rows returned by the history endpoint.
pub const HISTORY_LIMIT: i64 = 10;

const SIGNAL_COLUMNS: &str = "id, pair, timeframe, type, entry_time, result";

/// Handle to the signals table. Built once in `main` and handed to the
/// router; clones share the same pool.
#[derive(Clone)]
pub struct SignalStore {
    pool: SqlitePool,
}

impl SignalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file and apply migrations.
    pub async fn connect(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database ready at {db_path}");
        Ok(Self::new(pool))
    }

    /// Private in-memory database. A single connection that never expires,
    /// otherwise each new connection would see an empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Insert one signal and return it with the server-assigned id and entry time.
    pub async fn create_signal(
        &self,
        pair: AssetPair,
        timeframe: Timeframe,
        signal_type: SignalType,
        entry_time: DateTime<Utc>,
    ) -> Result<SignalRecord> {
        let sql = format!(
            "INSERT INTO signals (pair, timeframe, type, entry_time) VALUES (?, ?, ?, ?) RETURNING {SIGNAL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SignalRow>(&sql)
            .bind(pair.as_str())
            .bind(timeframe.as_str())
            .bind(signal_type.as_str())
            .bind(entry_time.timestamp_millis())
            .fetch_optional(&self.pool)
            .await?;

        row.map(SignalRecord::from)
            .ok_or_else(|| AppError::Storage(sqlx::Error::RowNotFound))
    }

    /// Most recent `limit` signals, newest first; equal entry times fall back
    /// to insertion order. A failing read yields an empty list.
    pub async fn recent_signals(&self, limit: i64) -> Vec<SignalRecord> {
        let sql = format!(
            "SELECT {SIGNAL_COLUMNS} FROM signals ORDER BY entry_time DESC, id DESC LIMIT ?"
        );
        match sqlx::query_as::<_, SignalRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows.into_iter().map(SignalRecord::from).collect(),
            Err(e) => {
                warn!("History read failed, returning empty list: {e}");
                Vec::new()
            }
        }
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM signals")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
