//! Bounded history replay that rebuilds catch counters.
//!
//! Replay is not deduplicated: running it over history that was already
//! counted counts those catches again.

use async_trait::async_trait;
use locker_core::{ChannelId, GatewayError, GuildId, InboundMessage};

use crate::catch_pipeline::CatchPipeline;

#[async_trait]
/// History access served by the message gateway.
pub trait ChannelHistory: Send + Sync {
    async fn guilds(&self) -> Result<Vec<GuildId>, GatewayError>;

    async fn text_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelId>, GatewayError>;

    /// The most recent `limit` messages of `channel_id`, oldest first.
    async fn recent_messages(
        &self,
        channel_id: ChannelId,
        limit: usize,
    ) -> Result<Vec<InboundMessage>, GatewayError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub channels_scanned: usize,
    pub channels_skipped: usize,
    pub messages_scanned: usize,
    /// Catch notifications seen, including ones whose catcher did not resolve.
    pub catches_processed: usize,
    pub catches_recorded: usize,
}

impl BackfillReport {
    fn absorb(&mut self, other: BackfillReport) {
        self.channels_scanned += other.channels_scanned;
        self.channels_skipped += other.channels_skipped;
        self.messages_scanned += other.messages_scanned;
        self.catches_processed += other.catches_processed;
        self.catches_recorded += other.catches_recorded;
    }
}

/// Replays the last `limit` messages of every text channel in `guild_id`.
/// Channels the gateway refuses to read are skipped.
pub async fn backfill_guild(
    history: &dyn ChannelHistory,
    pipeline: &CatchPipeline,
    guild_id: GuildId,
    limit: usize,
) -> BackfillReport {
    let mut report = BackfillReport::default();
    let channels = match history.text_channels(guild_id).await {
        Ok(channels) => channels,
        Err(error) => {
            tracing::warn!(%guild_id, %error, "backfill could not list guild channels");
            return report;
        }
    };

    for channel_id in channels {
        let messages = match history.recent_messages(channel_id, limit).await {
            Ok(messages) => messages,
            Err(error) => {
                report.channels_skipped += 1;
                if error.is_permission_denied() {
                    tracing::debug!(%channel_id, "backfill skipped unreadable channel");
                } else {
                    tracing::warn!(
                        %channel_id,
                        %error,
                        "backfill skipped channel after read failure"
                    );
                }
                continue;
            }
        };
        report.channels_scanned += 1;
        report.messages_scanned += messages.len();
        for message in messages.iter().filter(|message| pipeline.accepts(message)) {
            report.catches_processed += 1;
            if pipeline.handle(message).await.is_some() {
                report.catches_recorded += 1;
            }
        }
    }

    tracing::info!(
        %guild_id,
        channels_scanned = report.channels_scanned,
        channels_skipped = report.channels_skipped,
        catches_processed = report.catches_processed,
        catches_recorded = report.catches_recorded,
        "guild backfill complete"
    );
    report
}

/// Startup replay across every guild the gateway is connected to.
pub async fn backfill_all_guilds(
    history: &dyn ChannelHistory,
    pipeline: &CatchPipeline,
    limit: usize,
) -> BackfillReport {
    let mut report = BackfillReport::default();
    let guilds = match history.guilds().await {
        Ok(guilds) => guilds,
        Err(error) => {
            tracing::warn!(%error, "backfill could not list guilds");
            return report;
        }
    };
    tracing::info!(guilds = guilds.len(), limit, "backfilling catches from history");
    for guild_id in guilds {
        report.absorb(backfill_guild(history, pipeline, guild_id, limit).await);
    }
    report
}
