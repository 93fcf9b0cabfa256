use std::sync::Arc;

use async_trait::async_trait;
use locker_core::{ChannelId, GuildId, MessageId, ReactionEvent, UserId};
use locker_runtime::LockerRuntime;
use serenity::all as discord;

use crate::discord_convert::{inbound_message, reaction_emoji};
use crate::discord_gateway::DiscordGateway;

const PRESENCE_TEXT: &str = "a game! 🌹";

pub fn gateway_intents() -> discord::GatewayIntents {
    discord::GatewayIntents::GUILDS
        | discord::GatewayIntents::GUILD_MESSAGES
        | discord::GatewayIntents::MESSAGE_CONTENT
        | discord::GatewayIntents::GUILD_MESSAGE_REACTIONS
        | discord::GatewayIntents::GUILD_MEMBERS
}

/// Forwards gateway events to the locker runtime.
pub struct LockerHandler {
    runtime: Arc<LockerRuntime>,
    gateway: Arc<DiscordGateway>,
}

impl LockerHandler {
    pub fn new(runtime: Arc<LockerRuntime>, gateway: Arc<DiscordGateway>) -> Self {
        Self { runtime, gateway }
    }

    async fn reaction_event(
        &self,
        ctx: &discord::Context,
        reaction: &discord::Reaction,
    ) -> Option<ReactionEvent> {
        let user_id = reaction.user_id?;
        let user_is_bot = match reaction.member.as_ref() {
            Some(member) => member.user.bot,
            None => match reaction.user(ctx).await {
                Ok(user) => user.bot,
                Err(error) => {
                    tracing::warn!(
                        message_id = reaction.message_id.get(),
                        %error,
                        "could not resolve reacting user"
                    );
                    return None;
                }
            },
        };
        Some(ReactionEvent {
            guild_id: reaction.guild_id.map(|guild_id| GuildId::new(guild_id.get())),
            channel_id: ChannelId::new(reaction.channel_id.get()),
            message_id: MessageId::new(reaction.message_id.get()),
            user_id: UserId::new(user_id.get()),
            user_is_bot,
            emoji: reaction_emoji(&reaction.emoji),
        })
    }
}

#[async_trait]
impl discord::EventHandler for LockerHandler {
    async fn ready(&self, ctx: discord::Context, ready: discord::Ready) {
        tracing::info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "connected to discord gateway"
        );
        self.gateway.remember_guilds(
            ready
                .guilds
                .iter()
                .map(|guild| GuildId::new(guild.id.get())),
        );
        ctx.set_presence(
            Some(discord::ActivityData::playing(PRESENCE_TEXT)),
            discord::OnlineStatus::Online,
        );
        if let Err(error) = self
            .runtime
            .on_ready(UserId::new(ready.user.id.get()))
            .await
        {
            tracing::error!(error = %format!("{error:#}"), "locker runtime failed to start");
        }
    }

    async fn message(&self, _ctx: discord::Context, message: discord::Message) {
        let inbound = inbound_message(&message);
        if let Some(guild_id) = inbound.guild_id {
            self.gateway.remember_member(guild_id, inbound.author.clone());
        }
        self.runtime.on_message(&inbound).await;
    }

    async fn reaction_add(&self, ctx: discord::Context, reaction: discord::Reaction) {
        if let Some(event) = self.reaction_event(&ctx, &reaction).await {
            self.runtime.on_reaction_add(&event);
        }
    }
}
