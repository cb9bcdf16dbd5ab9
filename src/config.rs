use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub schedule: ScheduleConfig,
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    pub servers: Vec<ServerProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_max_pool_size() -> u32 {
    4
}

/// Daily capture time, local 24-hour clock.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Growth between two recorded days above this percentage raises an alert.
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: Decimal,
    #[serde(default = "default_alert_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gateway_url() -> String {
    "https://api.callmebot.com/whatsapp.php".into()
}

fn default_threshold_percent() -> Decimal {
    Decimal::from(3)
}

fn default_alert_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Also evaluate and persist the `_Log` segment of every tracked database.
    #[serde(default)]
    pub track_log_segment: bool,
    #[serde(default = "default_collect_timeout_secs")]
    pub collect_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            track_log_segment: false,
            collect_timeout_secs: default_collect_timeout_secs(),
        }
    }
}

fn default_collect_timeout_secs() -> u64 {
    30
}

/// One monitored SQL Server instance.
#[derive(Clone, Deserialize)]
pub struct ServerProfile {
    pub id: String,
    /// ADO-style connection string (`Server=...;User Id=...;Password=...`).
    pub connection: String,
    #[serde(default)]
    pub alias: Option<String>,
    /// Databases to track; `None` tracks everything the server reports.
    #[serde(default)]
    pub whitelist: Option<Vec<String>>,
}

// Hand-written so connection strings (passwords) never reach the logs.
impl std::fmt::Debug for ServerProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerProfile")
            .field("id", &self.id)
            .field("alias", &self.alias)
            .field("whitelist", &self.whitelist)
            .finish_non_exhaustive()
    }
}

impl ServerProfile {
    /// Name recorded in snapshots and alerts: the alias, else the connection's data source.
    pub fn display_name(&self) -> String {
        if let Some(alias) = self.alias.as_deref().map(str::trim)
            && !alias.is_empty()
        {
            return alias.to_string();
        }
        data_source(&self.connection).unwrap_or_else(|| self.id.clone())
    }
}

/// Raw `Data Source` value of an ADO connection string (also accepts `Server`, `Address`, `Addr`).
pub fn data_source(connection: &str) -> Option<String> {
    connection
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| {
            let key = key.trim().to_ascii_lowercase();
            matches!(
                key.as_str(),
                "data source" | "server" | "address" | "addr" | "network address"
            )
        })
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.http.port > 0,
            "http.port must be between 1 and 65535, got {}",
            self.http.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.schedule.hour <= 23,
            "schedule.hour must be between 0 and 23, got {}",
            self.schedule.hour
        );
        anyhow::ensure!(
            self.schedule.minute <= 59,
            "schedule.minute must be between 0 and 59, got {}",
            self.schedule.minute
        );
        anyhow::ensure!(
            self.alerts.threshold_percent > Decimal::ZERO,
            "alerts.threshold_percent must be > 0, got {}",
            self.alerts.threshold_percent
        );
        anyhow::ensure!(
            self.alerts.timeout_secs > 0,
            "alerts.timeout_secs must be > 0, got {}",
            self.alerts.timeout_secs
        );
        if !self.alerts.recipients.is_empty() {
            anyhow::ensure!(
                !self.alerts.gateway_url.is_empty(),
                "alerts.gateway_url must be non-empty when recipients are configured"
            );
            anyhow::ensure!(
                !self.alerts.api_key.is_empty(),
                "alerts.api_key must be non-empty when recipients are configured"
            );
        }
        anyhow::ensure!(
            self.monitor.collect_timeout_secs > 0,
            "monitor.collect_timeout_secs must be > 0, got {}",
            self.monitor.collect_timeout_secs
        );
        anyhow::ensure!(
            !self.servers.is_empty(),
            "servers must list at least one server"
        );
        let mut seen = HashSet::new();
        for server in &self.servers {
            anyhow::ensure!(!server.id.is_empty(), "servers.id must be non-empty");
            anyhow::ensure!(
                seen.insert(server.id.as_str()),
                "servers.id must be unique, got duplicate {}",
                server.id
            );
            anyhow::ensure!(
                !server.connection.is_empty(),
                "servers.connection must be non-empty for {}",
                server.id
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_source_reads_common_keys() {
        assert_eq!(
            data_source("Data Source=10.10.25.100;Initial Catalog=master;User Id=sa"),
            Some("10.10.25.100".into())
        );
        assert_eq!(
            data_source("server=tcp:db01,1433;Password=x"),
            Some("tcp:db01,1433".into())
        );
        assert_eq!(data_source("User Id=sa;Password=x"), None);
        assert_eq!(data_source("Server= ;User Id=sa"), None);
    }
}
