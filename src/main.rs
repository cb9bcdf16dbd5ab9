use anyhow::Result;
use dbsize_monitor::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let history_repo = Arc::new(
        history_repo::HistoryRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    history_repo.init().await?;

    let dispatcher = Arc::new(alerts::AlertDispatcher::new(&app_config.alerts)?);
    let collector = Arc::new(collector::MssqlCollector::new(Duration::from_secs(
        app_config.monitor.collect_timeout_secs,
    )));
    let monitor = Arc::new(monitor::Monitor::new(
        monitor::MonitorDeps {
            servers: app_config.servers.clone(),
            collector,
            history_repo: history_repo.clone(),
            dispatcher,
        },
        growth::GrowthPolicy::new(app_config.alerts.threshold_percent),
        app_config.monitor.track_log_segment,
    ));
    tracing::info!(
        servers = app_config.servers.len(),
        track_log_segment = app_config.monitor.track_log_segment,
        threshold_percent = %app_config.alerts.threshold_percent,
        "monitor configured"
    );

    let schedule =
        scheduler::DailySchedule::new(app_config.schedule.hour, app_config.schedule.minute)?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let (trigger, mut scheduler_handle) = scheduler::spawn(monitor, schedule, shutdown_rx);

    let app = routes::app(history_repo, trigger);
    let addr = format!("{}:{}", app_config.http.host, app_config.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    // One signal stops both: the server drains in-flight requests (a `?wait=true` caller gets
    // its report) while the scheduler finishes any running cycle.
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Received shutdown signal; waiting for any running capture cycle");
        let _ = stop_tx.send(true);
    });
    let mut scheduler_stop = stop_rx.clone();
    tokio::spawn(async move {
        let _ = scheduler_stop.wait_for(|stop| *stop).await;
        let _ = shutdown_tx.send(());
    });
    let mut server_stop = stop_rx;
    let server = routes::serve(listener, app, async move {
        let _ = server_stop.wait_for(|stop| *stop).await;
    });
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result?;
            scheduler_handle.await??;
        }
        result = &mut scheduler_handle => {
            // Ends on its own only when the schedule is broken; otherwise shutdown is under way.
            result??;
            server.await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
