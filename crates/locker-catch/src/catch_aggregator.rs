use std::sync::Arc;

use locker_core::{InboundMessage, OutboundEmbed, UserId};

use crate::catch_text::{combined_text, extract_subject_name, is_catch_text};
use crate::counter_store::CounterStore;
use crate::identity_resolver::{
    resolve_catcher, CatcherResolution, MemberDirectory, ResolutionSource,
};

const CATCH_LOG_COLOUR: u32 = 0xE7_4C_3C;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of one processed catch; only the counters outlive it.
pub struct CatchRecord {
    pub identity: UserId,
    pub display_name: String,
    pub subject: String,
    pub daily_after: u64,
    pub all_time_after: u64,
    pub source: ResolutionSource,
}

impl CatchRecord {
    pub fn to_embed(&self) -> OutboundEmbed {
        OutboundEmbed {
            title: "🐾 Catch Update".to_string(),
            description: format!("{} caught **{}**!", self.display_name, self.subject),
            colour: CATCH_LOG_COLOUR,
            fields: vec![(
                "Totals".to_string(),
                format!(
                    "Today: {}\nAll-Time: {}",
                    self.daily_after, self.all_time_after
                ),
            )],
        }
    }
}

/// True when `message` comes from the game-bot and reads like a catch.
pub fn is_catch_notification(message: &InboundMessage, game_bot_id: UserId) -> bool {
    message.author.id == game_bot_id
        && is_catch_text(&combined_text(&message.content, &message.embeds))
}

#[derive(Clone)]
pub struct CatchAggregator {
    store: Arc<CounterStore>,
    directory: Arc<dyn MemberDirectory>,
}

impl CatchAggregator {
    pub fn new(store: Arc<CounterStore>, directory: Arc<dyn MemberDirectory>) -> Self {
        Self { store, directory }
    }

    pub fn store(&self) -> &Arc<CounterStore> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<dyn MemberDirectory> {
        &self.directory
    }

    /// Attributes one catch notification and bumps the catcher's counters.
    /// Returns `None` when no member can be resolved; nothing is counted then.
    /// Replaying the same notification counts it again.
    pub async fn process(&self, message: &InboundMessage) -> Option<CatchRecord> {
        let text = combined_text(&message.content, &message.embeds);
        let resolution = resolve_catcher(
            self.directory.as_ref(),
            message.guild_id,
            message.mentions.first(),
            &text,
        )
        .await;
        let CatcherResolution::Resolved { member, source } = resolution else {
            tracing::info!(
                message_id = %message.id,
                channel_id = %message.channel_id,
                "could not resolve catcher; catch dropped"
            );
            return None;
        };

        let subject = extract_subject_name(&text);
        let counts = self.store.increment(member.id);
        let record = CatchRecord {
            identity: member.id,
            display_name: member.display_name().to_string(),
            subject,
            daily_after: counts.daily,
            all_time_after: counts.all_time,
            source,
        };
        tracing::info!(
            message_id = %message.id,
            identity = %record.identity,
            subject = %record.subject,
            daily = record.daily_after,
            all_time = record.all_time_after,
            source = record.source.as_str(),
            "catch recorded"
        );
        Some(record)
    }
}
