// Outcome of one capture cycle, per server

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub captured_date: NaiveDate,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub servers: Vec<ServerReport>,
}

impl CycleReport {
    pub fn failed_servers(&self) -> usize {
        self.servers
            .iter()
            .filter(|s| !matches!(s.status, ServerStatus::Completed))
            .count()
    }

    pub fn alerts_raised(&self) -> usize {
        self.servers.iter().map(|s| s.alerts_raised).sum()
    }

    pub fn persisted(&self) -> usize {
        self.servers.iter().map(|s| s.persisted).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerReport {
    pub server_id: String,
    pub server_alias: String,
    pub status: ServerStatus,
    /// Databases left after whitelist filtering.
    pub tracked_databases: usize,
    pub persisted: usize,
    pub duplicates: usize,
    pub alerts_raised: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

impl ServerReport {
    pub fn new(server_id: &str, server_alias: &str) -> Self {
        Self {
            server_id: server_id.to_string(),
            server_alias: server_alias.to_string(),
            status: ServerStatus::Completed,
            tracked_databases: 0,
            persisted: 0,
            duplicates: 0,
            alerts_raised: 0,
            notifications_sent: 0,
            notifications_failed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "error", rename_all = "snake_case")]
pub enum ServerStatus {
    Completed,
    /// Server unreachable or size query failed; nothing evaluated or written.
    CollectionFailed(String),
    /// Baseline read or batch write failed; nothing written for this server.
    PersistenceFailed(String),
}
