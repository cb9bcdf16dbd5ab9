// SQL Server collector: sums sys.master_files per database (size is in 8 KiB pages).
// Page totals come back as BIGINT and are converted here, so every 1/128 MB step survives.

use super::{CollectError, SizeCollector};
use crate::config::ServerProfile;
use crate::models::Measurement;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use tiberius::{Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;
use tracing::instrument;

const SIZE_QUERY: &str = r#"
SELECT
  DB_NAME(database_id) AS NombreBD,
  SUM(CASE WHEN type_desc = 'ROWS' THEN CAST(size AS BIGINT) ELSE 0 END) AS DataPages,
  SUM(CASE WHEN type_desc = 'LOG'  THEN CAST(size AS BIGINT) ELSE 0 END) AS LogPages
FROM sys.master_files
GROUP BY database_id;
"#;

/// Megabytes occupied by `pages` 8 KiB pages. Exact: one page is 0.0078125 MB.
pub fn pages_to_mb(pages: i64) -> Decimal {
    Decimal::from(pages) * Decimal::from(8) / Decimal::from(1024)
}

pub struct MssqlCollector {
    timeout: Duration,
}

impl MssqlCollector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn query_sizes(&self, server: &ServerProfile) -> Result<Vec<Measurement>, CollectError> {
        let connection_error = |message: String| CollectError::Connection {
            server: server.id.clone(),
            message,
        };
        let query_error = |message: String| CollectError::Query {
            server: server.id.clone(),
            message,
        };

        let config = Config::from_ado_string(&server.connection)
            .map_err(|e| connection_error(format!("connection string: {}", e)))?;
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| connection_error(e.to_string()))?;
        tcp.set_nodelay(true)
            .map_err(|e| connection_error(e.to_string()))?;
        let mut client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| connection_error(e.to_string()))?;

        let rows = client
            .simple_query(SIZE_QUERY)
            .await
            .map_err(|e| query_error(e.to_string()))?
            .into_first_result()
            .await
            .map_err(|e| query_error(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let name: &str = row
                .try_get(0)
                .map_err(|e| query_error(e.to_string()))?
                .ok_or_else(|| query_error("database name is NULL".into()))?;
            let data_pages: i64 = row
                .try_get(1)
                .map_err(|e| query_error(e.to_string()))?
                .unwrap_or_default();
            let log_pages: i64 = row
                .try_get(2)
                .map_err(|e| query_error(e.to_string()))?
                .unwrap_or_default();
            out.push(Measurement {
                database_name: name.to_string(),
                data_mb: pages_to_mb(data_pages),
                log_mb: pages_to_mb(log_pages),
            });
        }

        if let Err(e) = client.close().await {
            tracing::debug!(server = %server.id, error = %e, "closing size connection failed");
        }
        Ok(out)
    }
}

#[async_trait]
impl SizeCollector for MssqlCollector {
    #[instrument(skip(self, server), fields(collector = "mssql", server = %server.id))]
    async fn collect(&self, server: &ServerProfile) -> Result<Vec<Measurement>, CollectError> {
        match tokio::time::timeout(self.timeout, self.query_sizes(server)).await {
            Ok(result) => result,
            Err(_) => Err(CollectError::Timeout {
                server: server.id.clone(),
                secs: self.timeout.as_secs(),
            }),
        }
    }
}
