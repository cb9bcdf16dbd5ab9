// Live per-database size collection. One call covers one server.

mod mssql;

pub use mssql::{MssqlCollector, pages_to_mb};

use crate::config::ServerProfile;
use crate::models::Measurement;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("cannot reach {server}: {message}")]
    Connection { server: String, message: String },
    #[error("size query on {server} returned an unusable result: {message}")]
    Query { server: String, message: String },
    #[error("size collection on {server} timed out after {secs}s")]
    Timeout { server: String, secs: u64 },
}

/// Source of per-database data/log sizes for one server.
#[async_trait]
pub trait SizeCollector: Send + Sync {
    /// Every database visible on the server, with its data-file and log-file megabytes.
    async fn collect(&self, server: &ServerProfile) -> Result<Vec<Measurement>, CollectError>;
}
