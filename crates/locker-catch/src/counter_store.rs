//! Durable daily/all-time catch counters with write-through persistence.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use locker_core::{write_text_atomic, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct CounterSnapshot {
    #[serde(default)]
    all_time: BTreeMap<UserId, u64>,
    #[serde(default)]
    daily: BTreeMap<UserId, u64>,
    #[serde(default)]
    last_reset: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How the snapshot looked when it was loaded.
pub enum SnapshotLoadOutcome {
    Loaded,
    Empty,
    Missing,
    Corrupt,
}

impl SnapshotLoadOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Empty => "empty",
            Self::Missing => "missing",
            Self::Corrupt => "corrupt",
        }
    }

    pub fn needs_backfill(self) -> bool {
        !matches!(self, Self::Loaded)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatchCounts {
    pub daily: u64,
    pub all_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardScope {
    Daily,
    AllTime,
}

impl LeaderboardScope {
    pub fn title(self) -> &'static str {
        match self {
            Self::Daily => "📅 Daily Catch Leaderboard",
            Self::AllTime => "🏆 All-Time Catch Leaderboard",
        }
    }
}

#[derive(Debug)]
struct CounterState {
    snapshot: CounterSnapshot,
    needs_backfill: bool,
}

/// Owns the counter set and its on-disk snapshot. Every mutation and the save
/// that follows it run under one mutex, so concurrent catches never lose an
/// update.
#[derive(Debug)]
pub struct CounterStore {
    path: PathBuf,
    state: Mutex<CounterState>,
}

impl CounterStore {
    /// Creates an empty store bound to `path`; call [`CounterStore::load`]
    /// before use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(CounterState {
                snapshot: CounterSnapshot::default(),
                needs_backfill: true,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn state(&self) -> MutexGuard<'_, CounterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces in-memory counters with the durable snapshot. Missing, empty
    /// or unreadable snapshots reset to empty counters and raise the backfill
    /// flag; nothing here is fatal.
    pub fn load(&self) -> SnapshotLoadOutcome {
        let (snapshot, outcome) = match std::fs::read_to_string(&self.path) {
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                (CounterSnapshot::default(), SnapshotLoadOutcome::Missing)
            }
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %error,
                    "catch snapshot unreadable; starting empty"
                );
                (CounterSnapshot::default(), SnapshotLoadOutcome::Corrupt)
            }
            Ok(raw) if raw.trim().is_empty() => {
                (CounterSnapshot::default(), SnapshotLoadOutcome::Empty)
            }
            Ok(raw) => match serde_json::from_str::<CounterSnapshot>(raw.trim()) {
                Ok(snapshot) => (snapshot, SnapshotLoadOutcome::Loaded),
                Err(error) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        %error,
                        "catch snapshot is not valid JSON; starting empty"
                    );
                    (CounterSnapshot::default(), SnapshotLoadOutcome::Corrupt)
                }
            },
        };

        let mut state = self.state();
        state.snapshot = snapshot;
        state.needs_backfill = outcome.needs_backfill();
        tracing::info!(
            path = %self.path.display(),
            outcome = outcome.as_str(),
            members = state.snapshot.all_time.len(),
            "catch snapshot loaded"
        );
        outcome
    }

    pub fn needs_backfill(&self) -> bool {
        self.state().needs_backfill
    }

    pub fn last_reset_date(&self) -> Option<NaiveDate> {
        self.state().snapshot.last_reset
    }

    /// Seeds the reset date when the snapshot had none. Returns true when it
    /// was seeded. The seed is persisted with the next save.
    pub fn ensure_reset_date(&self, today: NaiveDate) -> bool {
        let mut state = self.state();
        if state.snapshot.last_reset.is_some() {
            return false;
        }
        state.snapshot.last_reset = Some(today);
        true
    }

    /// Adds one catch to both counters of `identity` and persists the full
    /// snapshot before returning the new totals.
    pub fn increment(&self, identity: UserId) -> CatchCounts {
        let mut state = self.state();
        let daily = {
            let entry = state.snapshot.daily.entry(identity).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };
        let all_time = {
            let entry = state.snapshot.all_time.entry(identity).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };
        if let Err(error) = persist_snapshot(&self.path, &state.snapshot) {
            tracing::error!(
                identity = %identity,
                error = %format!("{error:#}"),
                "catch snapshot save failed after increment"
            );
        }
        CatchCounts { daily, all_time }
    }

    pub fn counts(&self, identity: UserId) -> CatchCounts {
        let state = self.state();
        CatchCounts {
            daily: state.snapshot.daily.get(&identity).copied().unwrap_or(0),
            all_time: state.snapshot.all_time.get(&identity).copied().unwrap_or(0),
        }
    }

    pub fn save(&self) -> Result<()> {
        let state = self.state();
        persist_snapshot(&self.path, &state.snapshot)
    }

    /// Zeroes every daily counter when `today` differs from the stored reset
    /// date. Returns true when a reset happened. A `today` earlier than the
    /// stored date is ignored so the reset date never moves backward.
    pub fn reset_daily(&self, today: NaiveDate) -> bool {
        let mut state = self.state();
        match state.snapshot.last_reset {
            Some(last) if last == today => return false,
            Some(last) if last > today => {
                tracing::warn!(%last, %today, "ignoring daily reset for an earlier date");
                return false;
            }
            _ => {}
        }
        for count in state.snapshot.daily.values_mut() {
            *count = 0;
        }
        state.snapshot.last_reset = Some(today);
        if let Err(error) = persist_snapshot(&self.path, &state.snapshot) {
            tracing::error!(
                error = %format!("{error:#}"),
                "catch snapshot save failed after daily reset"
            );
        }
        tracing::info!(%today, "daily catch counters reset");
        true
    }

    /// Top `limit` members with a non-zero count, highest first. Ties keep
    /// ascending member id order.
    pub fn leaderboard(&self, scope: LeaderboardScope, limit: usize) -> Vec<(UserId, u64)> {
        let state = self.state();
        let counts = match scope {
            LeaderboardScope::Daily => &state.snapshot.daily,
            LeaderboardScope::AllTime => &state.snapshot.all_time,
        };
        let mut ranked = counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(identity, count)| (*identity, *count))
            .collect::<Vec<_>>();
        ranked.sort_by(|left, right| right.1.cmp(&left.1));
        ranked.truncate(limit);
        ranked
    }
}

fn persist_snapshot(path: &Path, snapshot: &CounterSnapshot) -> Result<()> {
    let mut payload =
        serde_json::to_string_pretty(snapshot).context("failed to serialize catch snapshot")?;
    payload.push('\n');
    write_text_atomic(path, &payload)
        .with_context(|| format!("failed to write catch snapshot {}", path.display()))
}
