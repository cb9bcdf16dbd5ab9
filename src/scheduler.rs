// Daily capture scheduler. One task owns the schedule; manual triggers reach it over a channel.
// A single cycle-in-flight flag is shared by both paths: a trigger that finds it set is
// rejected, never queued.

use crate::models::CycleReport;
use crate::monitor::Monitor;
use chrono::{DateTime, Local, TimeZone};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid capture time {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },
    #[error("next capture time {next} is not after {now}")]
    NonFutureTick { now: String, next: String },
    #[error("schedule has no upcoming capture time")]
    NoUpcomingTick,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("a capture cycle is already running")]
    AlreadyRunning,
    #[error("scheduler is not running")]
    Unavailable,
}

/// Immediate answer to a manual trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
    Unavailable,
}

/// Fires once a day at hour:minute, local time.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    hour: u32,
    minute: u32,
    schedule: Schedule,
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32) -> Result<Self, SchedulerError> {
        if hour > 23 || minute > 59 {
            return Err(SchedulerError::InvalidTime { hour, minute });
        }
        let expr = format!("0 {} {} * * *", minute, hour);
        let schedule =
            Schedule::from_str(&expr).map_err(|_| SchedulerError::InvalidTime { hour, minute })?;
        Ok(Self {
            hour,
            minute,
            schedule,
        })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// First capture time strictly after `now`: today if it has not passed yet, else tomorrow.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<DateTime<Tz>, SchedulerError>
    where
        Tz::Offset: std::fmt::Display,
    {
        let next = self
            .schedule
            .after(now)
            .next()
            .ok_or(SchedulerError::NoUpcomingTick)?;
        if next <= *now {
            return Err(SchedulerError::NonFutureTick {
                now: now.to_string(),
                next: next.to_string(),
            });
        }
        Ok(next)
    }
}

/// Cycle-in-flight flag. At most one `CyclePermit` exists at a time.
#[derive(Clone, Default)]
pub struct CycleGuard(Arc<AtomicBool>);

impl CycleGuard {
    pub fn try_acquire(&self) -> Option<CyclePermit> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CyclePermit(self.0.clone()))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Clears the in-flight flag on drop.
pub struct CyclePermit(Arc<AtomicBool>);

impl Drop for CyclePermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ManualRun {
    permit: CyclePermit,
    reply: Option<oneshot::Sender<CycleReport>>,
}

/// Manual trigger, cloneable into HTTP handlers.
#[derive(Clone)]
pub struct TriggerHandle {
    guard: CycleGuard,
    tx: mpsc::Sender<ManualRun>,
}

impl TriggerHandle {
    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Start a cycle now without waiting for it.
    pub fn trigger(&self) -> TriggerOutcome {
        match self.submit(None) {
            Ok(()) => TriggerOutcome::Started,
            Err(TriggerError::AlreadyRunning) => TriggerOutcome::AlreadyRunning,
            Err(TriggerError::Unavailable) => TriggerOutcome::Unavailable,
        }
    }

    /// Start a cycle now and wait for its report.
    pub async fn run_now(&self) -> Result<CycleReport, TriggerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(Some(reply_tx))?;
        reply_rx.await.map_err(|_| TriggerError::Unavailable)
    }

    fn submit(&self, reply: Option<oneshot::Sender<CycleReport>>) -> Result<(), TriggerError> {
        let permit = self
            .guard
            .try_acquire()
            .ok_or(TriggerError::AlreadyRunning)?;
        // On failure the message (and its permit) is dropped, which clears the flag.
        self.tx
            .try_send(ManualRun { permit, reply })
            .map_err(|_| TriggerError::Unavailable)
    }
}

/// Spawns the scheduler loop. Ends with `Ok` on shutdown, `Err` if the schedule breaks.
pub fn spawn(
    monitor: Arc<Monitor>,
    schedule: DailySchedule,
    shutdown_rx: oneshot::Receiver<()>,
) -> (
    TriggerHandle,
    tokio::task::JoinHandle<Result<(), SchedulerError>>,
) {
    let guard = CycleGuard::default();
    let (tx, rx) = mpsc::channel(1);
    let handle = TriggerHandle {
        guard: guard.clone(),
        tx,
    };
    let task = tokio::spawn(run(monitor, schedule, guard, rx, shutdown_rx));
    (handle, task)
}

#[instrument(skip_all, fields(hour = schedule.hour(), minute = schedule.minute()))]
async fn run(
    monitor: Arc<Monitor>,
    schedule: DailySchedule,
    guard: CycleGuard,
    mut manual_rx: mpsc::Receiver<ManualRun>,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), SchedulerError> {
    // Last fired tick: a wake-up a hair early on the wall clock must not fire the same tick twice.
    let mut last_tick: Option<DateTime<Local>> = None;

    loop {
        let now = Local::now();
        let reference = match last_tick {
            Some(t) if t > now => t,
            _ => now,
        };
        let next = schedule.next_after(&reference)?;
        let delay = (next - now)
            .to_std()
            .map_err(|_| SchedulerError::NonFutureTick {
                now: now.to_string(),
                next: next.to_string(),
            })?;
        info!(next_run = %next, "next capture cycle scheduled");

        // Manual runs first: a trigger that already answered `Started` must run before shutdown.
        tokio::select! {
            biased;
            Some(run) = manual_rx.recv() => {
                let report = execute(&monitor, run.permit, "manual").await;
                if let Some(reply) = run.reply {
                    let _ = reply.send(report);
                }
            }
            _ = &mut shutdown_rx => {
                info!("scheduler shutting down");
                return Ok(());
            }
            _ = tokio::time::sleep(delay) => {
                last_tick = Some(next);
                match guard.try_acquire() {
                    Some(permit) => {
                        execute(&monitor, permit, "schedule").await;
                    }
                    None => warn!("scheduled capture skipped: a cycle is already running"),
                }
            }
        }
    }
}

async fn execute(monitor: &Monitor, permit: CyclePermit, trigger: &'static str) -> CycleReport {
    let today = Local::now().date_naive();
    info!(trigger, date = %today, "capture cycle started");
    let report = monitor.run_cycle(today).await;
    drop(permit);
    report
}
