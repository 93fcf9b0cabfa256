//! Per-channel lock/unlock state machine.
//!
//! A channel is `Locked` while it has a [`LockRecord`] and `Unlocked`
//! otherwise. Every transition that removes a record does so under the map
//! mutex before any side effect is emitted, so a sweep and a release reaction
//! racing on the same channel unlock it once.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use chrono::{DateTime, TimeDelta, Utc};
use locker_core::{
    format_remaining, ChannelId, EffectSink, GatewayEffect, MessageId, ReactionEvent,
    SendPermission,
};

pub const DEFAULT_RELEASE_GLYPH: &str = "🔓";
pub const AUTO_TIMEOUT_REASON: &str = "auto-timeout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockPolicy {
    pub duration: TimeDelta,
    pub release_glyph: String,
    /// Audit channel for lock/unlock entries; `None` skips auditing.
    pub log_channel_id: Option<ChannelId>,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            duration: TimeDelta::hours(24),
            release_glyph: DEFAULT_RELEASE_GLYPH.to_string(),
            log_channel_id: None,
        }
    }
}

impl LockPolicy {
    fn duration_label(&self) -> String {
        let hours = self.duration.num_hours();
        if hours == 1 {
            "1 hour".to_string()
        } else if hours > 0 {
            format!("{hours} hours")
        } else {
            format!("{} minutes", self.duration.num_minutes())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub channel_id: ChannelId,
    pub locked_at: DateTime<Utc>,
    pub unlock_deadline: DateTime<Utc>,
    /// Set once the gateway reports the posted notice for this episode.
    pub release_message_id: Option<MessageId>,
    pub episode: u64,
    pub reason: String,
}

impl LockRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.unlock_deadline <= now
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockStatus {
    pub channel_id: ChannelId,
    pub remaining: TimeDelta,
}

impl LockStatus {
    pub fn render(&self) -> String {
        format!(
            "🔒 {} → unlocks in **{}**",
            self.channel_id.mention(),
            format_remaining(self.remaining)
        )
    }
}

pub struct LockStateMachine {
    policy: LockPolicy,
    effects: EffectSink,
    records: Mutex<BTreeMap<ChannelId, LockRecord>>,
    next_episode: AtomicU64,
}

impl LockStateMachine {
    pub fn new(policy: LockPolicy, effects: EffectSink) -> Self {
        Self {
            policy,
            effects,
            records: Mutex::new(BTreeMap::new()),
            next_episode: AtomicU64::new(1),
        }
    }

    pub fn policy(&self) -> &LockPolicy {
        &self.policy
    }

    fn records(&self) -> MutexGuard<'_, BTreeMap<ChannelId, LockRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn audit(&self, content: String) {
        match self.policy.log_channel_id {
            Some(log_channel_id) => self.effects.send_text(log_channel_id, content),
            None => tracing::debug!(%content, "no log channel configured; audit entry skipped"),
        }
    }

    /// Locks `channel_id` for the policy duration. Locking an already locked
    /// channel starts a new episode: the record is overwritten, a second notice
    /// is posted and the old notice stops releasing the lock.
    pub fn lock(&self, channel_id: ChannelId, reason: &str, now: DateTime<Utc>) -> LockRecord {
        let episode = self.next_episode.fetch_add(1, Ordering::Relaxed);
        let unlock_deadline = match now.checked_add_signed(self.policy.duration) {
            Some(deadline) => deadline,
            None => {
                tracing::warn!(
                    %channel_id,
                    duration_secs = self.policy.duration.num_seconds(),
                    "lock deadline out of range; clamping to the latest representable time"
                );
                DateTime::<Utc>::MAX_UTC
            }
        };
        let record = LockRecord {
            channel_id,
            locked_at: now,
            unlock_deadline,
            release_message_id: None,
            episode,
            reason: reason.to_string(),
        };
        let previous = self.records().insert(channel_id, record.clone());
        if previous.is_some() {
            tracing::info!(%channel_id, episode, "relocking an already locked channel");
        }

        self.effects.emit(GatewayEffect::SetSendPermission {
            channel_id,
            permission: SendPermission::Deny,
        });
        self.effects.emit(GatewayEffect::PostReleaseNotice {
            channel_id,
            episode,
            content: format!(
                "🔒 {} locked! React with {} to unlock.",
                channel_id.mention(),
                self.policy.release_glyph
            ),
            glyph: self.policy.release_glyph.clone(),
        });
        self.audit(format!("🔒 {} locked ({reason}).", channel_id.mention()));
        tracing::info!(
            %channel_id,
            episode,
            reason,
            unlock_deadline = %record.unlock_deadline,
            "channel locked"
        );
        record
    }

    /// Records the posted notice for `episode`. Reports for a superseded
    /// episode, or for a channel that is no longer locked, are ignored.
    pub fn bind_release_message(
        &self,
        channel_id: ChannelId,
        episode: u64,
        message_id: MessageId,
    ) -> bool {
        let mut records = self.records();
        match records.get_mut(&channel_id) {
            Some(record) if record.episode == episode => {
                record.release_message_id = Some(message_id);
                true
            }
            _ => {
                tracing::debug!(
                    %channel_id,
                    episode,
                    %message_id,
                    "stale release notice ignored"
                );
                false
            }
        }
    }

    /// Restores the default send permission and announces the unlock. Runs
    /// its side effects even when the channel was not locked.
    pub fn unlock(&self, channel_id: ChannelId, reason: &str) -> Option<LockRecord> {
        let removed = self.records().remove(&channel_id);
        self.emit_unlock(channel_id, reason);
        removed
    }

    fn emit_unlock(&self, channel_id: ChannelId, reason: &str) {
        self.effects.emit(GatewayEffect::SetSendPermission {
            channel_id,
            permission: SendPermission::Inherit,
        });
        self.effects
            .send_text(channel_id, format!("🔓 Channel unlocked! ({reason})"));
        self.audit(format!("🔓 {} unlocked ({reason}).", channel_id.mention()));
        tracing::info!(%channel_id, reason, "channel unlocked");
    }

    /// Unlocks every channel whose deadline is at or before `now` and returns
    /// them in channel id order.
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<ChannelId> {
        let expired = {
            let mut records = self.records();
            let expired = records
                .values()
                .filter(|record| record.is_expired(now))
                .map(|record| record.channel_id)
                .collect::<Vec<_>>();
            for channel_id in &expired {
                records.remove(channel_id);
            }
            expired
        };
        for channel_id in &expired {
            self.emit_unlock(*channel_id, AUTO_TIMEOUT_REASON);
            self.effects.send_text(
                *channel_id,
                format!("⏰ Auto-unlocked after {}.", self.policy.duration_label()),
            );
        }
        expired
    }

    /// Unlocks early when a human reacts with the release glyph on the current
    /// episode's notice. Returns true when the channel was unlocked.
    pub fn on_release_reaction(&self, reaction: &ReactionEvent) -> bool {
        if reaction.user_is_bot || reaction.emoji != self.policy.release_glyph {
            return false;
        }
        {
            let mut records = self.records();
            let matches_notice = records.get(&reaction.channel_id).is_some_and(|record| {
                record.release_message_id == Some(reaction.message_id)
            });
            if !matches_notice {
                return false;
            }
            records.remove(&reaction.channel_id);
        }
        self.emit_unlock(
            reaction.channel_id,
            &format!("reaction by {}", reaction.user_id.mention()),
        );
        true
    }

    pub fn is_locked(&self, channel_id: ChannelId) -> bool {
        self.records().contains_key(&channel_id)
    }

    pub fn record(&self, channel_id: ChannelId) -> Option<LockRecord> {
        self.records().get(&channel_id).cloned()
    }

    /// Locked channels with their remaining time, in channel id order.
    pub fn status(&self, now: DateTime<Utc>) -> Vec<LockStatus> {
        self.records()
            .values()
            .map(|record| LockStatus {
                channel_id: record.channel_id,
                remaining: record.unlock_deadline - now,
            })
            .collect()
    }
}
