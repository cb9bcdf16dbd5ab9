// Shared test helpers: scripted collector, temp history, config builders
#![allow(dead_code)]

use async_trait::async_trait;
use dbsize_monitor::alerts::AlertDispatcher;
use dbsize_monitor::collector::{CollectError, SizeCollector};
use dbsize_monitor::config::{AlertsConfig, ServerProfile};
use dbsize_monitor::growth::GrowthPolicy;
use dbsize_monitor::history_repo::HistoryRepo;
use dbsize_monitor::models::Measurement;
use dbsize_monitor::monitor::{Monitor, MonitorDeps};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn measurement(name: &str, data_mb: &str, log_mb: &str) -> Measurement {
    Measurement {
        database_name: name.into(),
        data_mb: dec(data_mb),
        log_mb: dec(log_mb),
    }
}

pub fn server(id: &str, alias: Option<&str>, whitelist: Option<&[&str]>) -> ServerProfile {
    ServerProfile {
        id: id.into(),
        connection: format!("Server=10.0.0.{};User Id=monitor;Password=secret", id.len()),
        alias: alias.map(str::to_string),
        whitelist: whitelist.map(|w| w.iter().map(|s| s.to_string()).collect()),
    }
}

/// Collector answering from a per-server script; unknown servers report no databases.
#[derive(Default)]
pub struct ScriptedCollector {
    script: Mutex<HashMap<String, Result<Vec<Measurement>, String>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedCollector {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn set(&self, server_id: &str, measurements: Vec<Measurement>) {
        self.script
            .lock()
            .unwrap()
            .insert(server_id.into(), Ok(measurements));
    }

    pub fn fail(&self, server_id: &str, message: &str) {
        self.script
            .lock()
            .unwrap()
            .insert(server_id.into(), Err(message.into()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SizeCollector for ScriptedCollector {
    async fn collect(&self, server: &ServerProfile) -> Result<Vec<Measurement>, CollectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let entry = self.script.lock().unwrap().get(&server.id).cloned();
        match entry {
            Some(Ok(m)) => Ok(m),
            Some(Err(message)) => Err(CollectError::Connection {
                server: server.id.clone(),
                message,
            }),
            None => Ok(vec![]),
        }
    }
}

pub async fn temp_history() -> (TempDir, Arc<HistoryRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.db");
    let repo = HistoryRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    (dir, Arc::new(repo))
}

pub fn alerts_config(gateway_url: &str, recipients: &[&str]) -> AlertsConfig {
    AlertsConfig {
        gateway_url: gateway_url.into(),
        api_key: "test-key".into(),
        recipients: recipients.iter().map(|s| s.to_string()).collect(),
        threshold_percent: Decimal::from(3),
        timeout_secs: 2,
    }
}

/// Dispatcher with no recipients: alerts are evaluated but nothing is sent.
pub fn silent_dispatcher() -> Arc<AlertDispatcher> {
    Arc::new(AlertDispatcher::new(&alerts_config("http://127.0.0.1:9/", &[])).unwrap())
}

pub fn monitor(
    servers: Vec<ServerProfile>,
    collector: Arc<ScriptedCollector>,
    history_repo: Arc<HistoryRepo>,
    dispatcher: Arc<AlertDispatcher>,
    track_log_segment: bool,
) -> Monitor {
    Monitor::new(
        MonitorDeps {
            servers,
            collector,
            history_repo,
            dispatcher,
        },
        GrowthPolicy::default(),
        track_log_segment,
    )
}
