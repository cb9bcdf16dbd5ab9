// SQLite audit history (table Auditoria_TamanoBD). Append-only: rows are never updated or deleted.
// FechaRegistro is an ISO date (TEXT), TamanoMB is the decimal rendered as TEXT so no
// precision is lost on the way through SQLite.

use crate::models::SizeSnapshot;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot already recorded for {server}/{label} on {date}")]
    Duplicate {
        server: String,
        label: String,
        date: NaiveDate,
    },
    #[error("history database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt history row: {0}")]
    Corrupt(String),
}

/// What one committed batch did. Rejected keys were already recorded for that day.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub rejected: Vec<String>,
}

pub struct HistoryRepo {
    pool: SqlitePool,
}

impl HistoryRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS Auditoria_TamanoBD (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                FechaRegistro TEXT NOT NULL,
                Servidor TEXT NOT NULL,
                NombreBD TEXT NOT NULL,
                TamanoMB TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Enforces one row per key and serves the baseline lookup.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_auditoria_servidor_bd_fecha ON Auditoria_TamanoBD(Servidor, NombreBD, FechaRegistro)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS auditoria_no_update
            BEFORE UPDATE ON Auditoria_TamanoBD
            BEGIN
                SELECT RAISE(ABORT, 'Auditoria_TamanoBD is append-only');
            END
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS auditoria_no_delete
            BEFORE DELETE ON Auditoria_TamanoBD
            BEGIN
                SELECT RAISE(ABORT, 'Auditoria_TamanoBD is append-only');
            END
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist one snapshot; fails with `StoreError::Duplicate` if its key already exists.
    #[instrument(skip(self, snapshot), fields(repo = "history", operation = "append", server = %snapshot.server_alias, label = %snapshot.label))]
    pub async fn append(&self, snapshot: &SizeSnapshot) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO Auditoria_TamanoBD (FechaRegistro, Servidor, NombreBD, TamanoMB) VALUES ($1, $2, $3, $4)",
        )
        .bind(snapshot.captured_date)
        .bind(&snapshot.server_alias)
        .bind(&snapshot.label)
        .bind(snapshot.size_mb.to_string())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Duplicate {
                    server: snapshot.server_alias.clone(),
                    label: snapshot.label.clone(),
                    date: snapshot.captured_date,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a server's snapshots for one cycle in a single transaction.
    /// Keys already recorded are skipped and reported; any other failure rolls back the whole batch.
    #[instrument(skip(self, snapshots), fields(repo = "history", operation = "append_batch", snapshots_count = snapshots.len()))]
    pub async fn append_batch(&self, snapshots: &[SizeSnapshot]) -> Result<BatchOutcome, StoreError> {
        let mut outcome = BatchOutcome::default();
        if snapshots.is_empty() {
            return Ok(outcome);
        }
        let mut tx = self.pool.begin().await?;
        for s in snapshots {
            let r = sqlx::query(
                "INSERT INTO Auditoria_TamanoBD (FechaRegistro, Servidor, NombreBD, TamanoMB) VALUES ($1, $2, $3, $4)
                 ON CONFLICT(Servidor, NombreBD, FechaRegistro) DO NOTHING",
            )
            .bind(s.captured_date)
            .bind(&s.server_alias)
            .bind(&s.label)
            .bind(s.size_mb.to_string())
            .execute(&mut *tx)
            .await?;
            if r.rows_affected() == 0 {
                outcome.rejected.push(s.label.clone());
            } else {
                outcome.inserted += 1;
            }
        }
        tx.commit().await?;
        Ok(outcome)
    }

    /// Baseline: the snapshot with the greatest date strictly before `date` for this key.
    #[instrument(skip(self), fields(repo = "history", operation = "most_recent_before"))]
    pub async fn most_recent_before(
        &self,
        server_alias: &str,
        label: &str,
        date: NaiveDate,
    ) -> Result<Option<SizeSnapshot>, StoreError> {
        let row = sqlx::query(
            "SELECT FechaRegistro, Servidor, NombreBD, TamanoMB FROM Auditoria_TamanoBD
             WHERE Servidor = $1 AND NombreBD = $2 AND FechaRegistro < $3
             ORDER BY FechaRegistro DESC LIMIT 1",
        )
        .bind(server_alias)
        .bind(label)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_snapshot_row).transpose()
    }

    /// Most recent snapshots, newest first, optionally for one server.
    pub async fn get_recent_snapshots(
        &self,
        server_alias: Option<&str>,
        limit: u32,
    ) -> Result<Vec<SizeSnapshot>, StoreError> {
        let rows = sqlx::query(
            "SELECT FechaRegistro, Servidor, NombreBD, TamanoMB FROM Auditoria_TamanoBD
             WHERE ($1 IS NULL OR Servidor = $1)
             ORDER BY FechaRegistro DESC, Id DESC LIMIT $2",
        )
        .bind(server_alias)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(parse_snapshot_row).collect()
    }

    /// Raw pool access for maintenance and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_snapshot_row(row: &sqlx::sqlite::SqliteRow) -> Result<SizeSnapshot, StoreError> {
    let captured_date: NaiveDate = row.try_get("FechaRegistro")?;
    let server_alias: String = row.try_get("Servidor")?;
    let label: String = row.try_get("NombreBD")?;
    let size_text: String = row.try_get("TamanoMB")?;
    let size_mb = Decimal::from_str(&size_text)
        .map_err(|e| StoreError::Corrupt(format!("TamanoMB {:?}: {}", size_text, e)))?;
    Ok(SizeSnapshot {
        captured_date,
        server_alias,
        label,
        size_mb,
    })
}
