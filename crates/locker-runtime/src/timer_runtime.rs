//! Periodic tick that expires locks and rolls daily counters over.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use locker_catch::CounterStore;
use locker_core::{utc_today, ChannelId};
use locker_lock::LockStateMachine;
use tokio::{sync::oneshot, task::JoinHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerTickReport {
    pub unlocked: Vec<ChannelId>,
    pub daily_reset: bool,
}

/// One tick: sweep expired locks, then reset daily counters on a new UTC
/// date. The two steps are independent.
pub fn run_timer_tick(
    locks: &LockStateMachine,
    store: &CounterStore,
    now: DateTime<Utc>,
) -> TimerTickReport {
    let unlocked = locks.sweep(now);
    let daily_reset = store.reset_daily(utc_today(now));
    TimerTickReport {
        unlocked,
        daily_reset,
    }
}

#[derive(Debug)]
pub struct TimerServiceHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl TimerServiceHandle {
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub async fn shutdown(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Spawns the tick loop on the current Tokio runtime. The first tick fires
/// immediately.
pub fn start_timer_service(
    interval: Duration,
    locks: Arc<LockStateMachine>,
    store: Arc<CounterStore>,
) -> Result<TimerServiceHandle> {
    if interval.is_zero() {
        anyhow::bail!("timer tick interval must be greater than zero");
    }
    let handle = tokio::runtime::Handle::try_current()
        .context("timer service requires an active Tokio runtime")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let ticks = Arc::new(AtomicU64::new(0));
    let loop_ticks = Arc::clone(&ticks);
    let task = handle.spawn(async move {
        run_timer_loop(interval, locks, store, loop_ticks, shutdown_rx).await;
    });
    tracing::info!(interval_ms = interval.as_millis() as u64, "timer service started");
    Ok(TimerServiceHandle {
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
        ticks,
    })
}

async fn run_timer_loop(
    interval: Duration,
    locks: Arc<LockStateMachine>,
    store: Arc<CounterStore>,
    ticks: Arc<AtomicU64>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = run_timer_tick(&locks, &store, Utc::now());
                let tick = ticks.fetch_add(1, Ordering::Relaxed) + 1;
                if !report.unlocked.is_empty() || report.daily_reset {
                    tracing::info!(
                        tick,
                        unlocked = report.unlocked.len(),
                        daily_reset = report.daily_reset,
                        "timer tick applied changes"
                    );
                }
            }
            _ = &mut shutdown_rx => {
                tracing::info!(ticks = ticks.load(Ordering::Relaxed), "timer service stopped");
                break;
            }
        }
    }
}
