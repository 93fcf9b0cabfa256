use locker_catch::{is_catch_notification, CatchAggregator, CatchRecord};
use locker_core::{ChannelId, EffectSink, GatewayEffect, InboundMessage, UserId};

/// Filters game-bot notifications, runs them through the aggregator and posts
/// each recorded catch to the catch-log channel.
#[derive(Clone)]
pub struct CatchPipeline {
    aggregator: CatchAggregator,
    effects: EffectSink,
    game_bot_id: UserId,
    catch_log_channel_id: Option<ChannelId>,
}

impl CatchPipeline {
    pub fn new(
        aggregator: CatchAggregator,
        effects: EffectSink,
        game_bot_id: UserId,
        catch_log_channel_id: Option<ChannelId>,
    ) -> Self {
        Self {
            aggregator,
            effects,
            game_bot_id,
            catch_log_channel_id,
        }
    }

    pub fn aggregator(&self) -> &CatchAggregator {
        &self.aggregator
    }

    pub fn accepts(&self, message: &InboundMessage) -> bool {
        is_catch_notification(message, self.game_bot_id)
    }

    /// Processes `message` when it is a catch notification.
    pub async fn handle(&self, message: &InboundMessage) -> Option<CatchRecord> {
        if !self.accepts(message) {
            return None;
        }
        let record = self.aggregator.process(message).await?;
        match self.catch_log_channel_id {
            Some(channel_id) => self.effects.emit(GatewayEffect::SendEmbed {
                channel_id,
                embed: record.to_embed(),
            }),
            None => tracing::debug!(
                identity = %record.identity,
                "no catch log channel configured; catch update not posted"
            ),
        }
        Some(record)
    }
}
