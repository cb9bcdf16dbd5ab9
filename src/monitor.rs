// Capture cycle: per server collect -> whitelist -> baseline/evaluate -> alert -> batch write.
// Servers run concurrently and fail independently; each server's slice reads its baselines
// before writing its batch.

use crate::alerts::AlertDispatcher;
use crate::collector::SizeCollector;
use crate::config::ServerProfile;
use crate::growth::GrowthPolicy;
use crate::history_repo::HistoryRepo;
use crate::models::{
    CycleReport, GrowthAlert, Measurement, Segment, ServerReport, ServerStatus, SizeSnapshot,
};
use crate::whitelist::filter_measurements;
use chrono::{Local, NaiveDate};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Collaborators shared by every cycle.
pub struct MonitorDeps {
    pub servers: Vec<ServerProfile>,
    pub collector: Arc<dyn SizeCollector>,
    pub history_repo: Arc<HistoryRepo>,
    pub dispatcher: Arc<AlertDispatcher>,
}

pub struct Monitor {
    servers: Vec<ServerProfile>,
    collector: Arc<dyn SizeCollector>,
    history_repo: Arc<HistoryRepo>,
    dispatcher: Arc<AlertDispatcher>,
    policy: GrowthPolicy,
    segments: Vec<Segment>,
}

impl Monitor {
    pub fn new(deps: MonitorDeps, policy: GrowthPolicy, track_log_segment: bool) -> Self {
        let segments = if track_log_segment {
            vec![Segment::Data, Segment::Log]
        } else {
            vec![Segment::Data]
        };
        Self {
            servers: deps.servers,
            collector: deps.collector,
            history_repo: deps.history_repo,
            dispatcher: deps.dispatcher,
            policy,
            segments,
        }
    }

    /// One full pass over every configured server, recording snapshots dated `today`.
    #[instrument(skip(self), fields(servers = self.servers.len()))]
    pub async fn run_cycle(&self, today: NaiveDate) -> CycleReport {
        let started_at = Local::now();
        let servers = join_all(self.servers.iter().map(|s| self.run_server(s, today))).await;
        let report = CycleReport {
            captured_date: today,
            started_at,
            finished_at: Local::now(),
            servers,
        };
        if report.failed_servers() > 0 {
            warn!(
                failed_servers = report.failed_servers(),
                persisted = report.persisted(),
                alerts = report.alerts_raised(),
                "capture cycle finished with failures"
            );
        } else {
            info!(
                persisted = report.persisted(),
                alerts = report.alerts_raised(),
                "capture cycle finished"
            );
        }
        report
    }

    #[instrument(skip(self, server), fields(server = %server.id))]
    async fn run_server(&self, server: &ServerProfile, today: NaiveDate) -> ServerReport {
        let alias = server.display_name();
        let mut report = ServerReport::new(&server.id, &alias);

        let measurements = match self.collector.collect(server).await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, operation = "collect", "server skipped for this cycle");
                report.status = ServerStatus::CollectionFailed(e.to_string());
                return report;
            }
        };
        let measurements = filter_measurements(server, measurements);
        report.tracked_databases = measurements.len();
        debug!(tracked = measurements.len(), "sizes collected");

        let (snapshots, alerts) = match self.evaluate(&alias, &measurements, today).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, operation = "most_recent_before", "baseline lookup failed");
                report.status = ServerStatus::PersistenceFailed(e.to_string());
                return report;
            }
        };

        report.alerts_raised = alerts.len();
        for alert in &alerts {
            info!(
                label = %alert.label,
                baseline_mb = %alert.baseline_mb,
                new_mb = %alert.new_mb,
                "growth above threshold"
            );
            let summary = self.dispatcher.dispatch(alert).await;
            report.notifications_sent += summary.sent;
            report.notifications_failed += summary.failed;
        }

        match self.history_repo.append_batch(&snapshots).await {
            Ok(outcome) => {
                report.persisted = outcome.inserted;
                report.duplicates = outcome.rejected.len();
                for label in &outcome.rejected {
                    warn!(label = %label, date = %today, "snapshot already recorded today; write rejected");
                }
            }
            Err(e) => {
                warn!(error = %e, operation = "append_batch", "history batch rolled back");
                report.status = ServerStatus::PersistenceFailed(e.to_string());
            }
        }
        report
    }

    /// Baseline comparison for every tracked segment of every measurement.
    async fn evaluate(
        &self,
        alias: &str,
        measurements: &[Measurement],
        today: NaiveDate,
    ) -> Result<(Vec<SizeSnapshot>, Vec<GrowthAlert>), crate::history_repo::StoreError> {
        let mut snapshots = Vec::with_capacity(measurements.len() * self.segments.len());
        let mut alerts = Vec::new();
        for m in measurements {
            for &segment in &self.segments {
                let current = SizeSnapshot {
                    captured_date: today,
                    server_alias: alias.to_string(),
                    label: segment.label(&m.database_name),
                    size_mb: m.size(segment),
                };
                let baseline = self
                    .history_repo
                    .most_recent_before(alias, &current.label, today)
                    .await?;
                if baseline.is_none() {
                    debug!(label = %current.label, "no baseline yet");
                }
                if let Some(alert) = self.policy.evaluate(baseline.as_ref(), &current) {
                    alerts.push(alert);
                }
                snapshots.push(current);
            }
        }
        Ok((snapshots, alerts))
    }
}
