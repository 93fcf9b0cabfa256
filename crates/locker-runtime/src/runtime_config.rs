use std::{collections::BTreeSet, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use chrono::TimeDelta;
use locker_core::{ChannelId, UserId};
use locker_lock::{LockPolicy, DEFAULT_RELEASE_GLYPH};

/// P2 Assistant, whose member pings lock a channel.
pub const DEFAULT_MONITORED_BOT_ID: u64 = 854_233_015_475_109_888;
/// Pokétwo, whose notifications are mined for catches.
pub const DEFAULT_GAME_BOT_ID: u64 = 716_390_085_896_962_058;
pub const DEFAULT_CATCH_DATA_FILE: &str = "catch_data.json";
pub const DEFAULT_LOCK_HOURS: u64 = 24;
pub const DEFAULT_TICK_SECONDS: u64 = 60;
pub const DEFAULT_COMMAND_PREFIX: &str = "!";
pub const DEFAULT_BACKFILL_LIMIT: usize = 1_000;
/// Longest accepted lock, one year.
pub const MAX_LOCK_HOURS: u64 = 24 * 366;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Runtime configuration for the locker core.
pub struct LockerConfig {
    pub monitored_bot_ids: BTreeSet<UserId>,
    pub game_bot_id: UserId,
    pub log_channel_id: Option<ChannelId>,
    pub catch_log_channel_id: Option<ChannelId>,
    pub catch_data_path: PathBuf,
    pub lock_duration: Duration,
    pub tick_interval: Duration,
    pub command_prefix: String,
    pub backfill_limit: usize,
    pub release_glyph: String,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            monitored_bot_ids: BTreeSet::from([UserId::new(DEFAULT_MONITORED_BOT_ID)]),
            game_bot_id: UserId::new(DEFAULT_GAME_BOT_ID),
            log_channel_id: None,
            catch_log_channel_id: None,
            catch_data_path: PathBuf::from(DEFAULT_CATCH_DATA_FILE),
            lock_duration: Duration::from_secs(DEFAULT_LOCK_HOURS * 3_600),
            tick_interval: Duration::from_secs(DEFAULT_TICK_SECONDS),
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            backfill_limit: DEFAULT_BACKFILL_LIMIT,
            release_glyph: DEFAULT_RELEASE_GLYPH.to_string(),
        }
    }
}

impl LockerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lock_duration.is_zero() {
            bail!("lock duration must be greater than zero");
        }
        if self.lock_duration > Duration::from_secs(MAX_LOCK_HOURS * 3_600) {
            bail!("lock duration cannot exceed {MAX_LOCK_HOURS} hours");
        }
        if self.tick_interval.is_zero() {
            bail!("timer tick interval must be greater than zero");
        }
        if self.command_prefix.trim().is_empty() {
            bail!("command prefix cannot be empty");
        }
        if self.backfill_limit == 0 {
            bail!("backfill limit must be greater than zero");
        }
        if self.release_glyph.trim().is_empty() {
            bail!("release glyph cannot be empty");
        }
        Ok(())
    }

    pub fn lock_policy(&self) -> Result<LockPolicy> {
        let duration = TimeDelta::from_std(self.lock_duration)
            .context("lock duration is out of range")?;
        Ok(LockPolicy {
            duration,
            release_glyph: self.release_glyph.clone(),
            log_channel_id: self.log_channel_id,
        })
    }

    pub fn is_monitored(&self, user_id: UserId) -> bool {
        self.monitored_bot_ids.contains(&user_id)
    }
}
