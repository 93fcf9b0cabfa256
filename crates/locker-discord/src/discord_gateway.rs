//! REST-backed member directory and channel history.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use locker_catch::MemberDirectory;
use locker_core::{
    ChannelId, GatewayError, GuildId, InboundMessage, MemberPermissions, MemberProfile, UserId,
};
use locker_runtime::ChannelHistory;
use serenity::all as discord;

use crate::discord_convert::{gateway_error, inbound_message, member_profile};

const MEMBER_PAGE_SIZE: u64 = 1_000;
const HISTORY_PAGE_SIZE: usize = 100;

#[derive(Default)]
struct GatewayCache {
    members: HashMap<(GuildId, UserId), MemberProfile>,
    guilds: BTreeSet<GuildId>,
    channel_guilds: HashMap<ChannelId, GuildId>,
}

pub struct DiscordGateway {
    http: Arc<discord::Http>,
    cache: Mutex<GatewayCache>,
}

impl DiscordGateway {
    pub fn new(http: Arc<discord::Http>) -> Self {
        Self {
            http,
            cache: Mutex::new(GatewayCache::default()),
        }
    }

    fn http(&self) -> &discord::Http {
        &self.http
    }

    fn cache(&self) -> MutexGuard<'_, GatewayCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn remember_member(&self, guild_id: GuildId, member: MemberProfile) {
        self.cache().members.insert((guild_id, member.id), member);
    }

    /// Replaces the known guild set, as delivered by the ready event.
    pub fn remember_guilds(&self, guilds: impl IntoIterator<Item = GuildId>) {
        self.cache().guilds = guilds.into_iter().collect();
    }
}

#[async_trait]
impl MemberDirectory for DiscordGateway {
    fn cached_member(&self, guild_id: GuildId, user_id: UserId) -> Option<MemberProfile> {
        self.cache().members.get(&(guild_id, user_id)).cloned()
    }

    async fn fetch_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<MemberProfile, GatewayError> {
        let member = discord::GuildId::new(guild_id.get())
            .member(self.http(), discord::UserId::new(user_id.get()))
            .await
            .map_err(|error| gateway_error(&error))?;
        let profile = member_profile(&member);
        self.remember_member(guild_id, profile.clone());
        Ok(profile)
    }

    async fn list_members(&self, guild_id: GuildId) -> Result<Vec<MemberProfile>, GatewayError> {
        let guild = discord::GuildId::new(guild_id.get());
        let mut profiles = Vec::new();
        let mut after: Option<discord::UserId> = None;
        loop {
            let page = guild
                .members(self.http(), Some(MEMBER_PAGE_SIZE), after)
                .await
                .map_err(|error| gateway_error(&error))?;
            let exhausted = (page.len() as u64) < MEMBER_PAGE_SIZE;
            after = page.last().map(|member| member.user.id);
            profiles.extend(page.iter().map(member_profile));
            if exhausted || after.is_none() {
                break;
            }
        }
        {
            let mut cache = self.cache();
            for profile in &profiles {
                cache
                    .members
                    .insert((guild_id, profile.id), profile.clone());
            }
        }
        tracing::debug!(%guild_id, members = profiles.len(), "guild member list fetched");
        Ok(profiles)
    }

    async fn member_permissions(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<MemberPermissions, GatewayError> {
        let guild = discord::GuildId::new(guild_id.get());
        let user = discord::UserId::new(user_id.get());
        let partial = guild
            .to_partial_guild(self.http())
            .await
            .map_err(|error| gateway_error(&error))?;
        if partial.owner_id == user {
            return Ok(MemberPermissions {
                manage_channels: true,
                administrator: true,
            });
        }
        let member = guild
            .member(self.http(), user)
            .await
            .map_err(|error| gateway_error(&error))?;

        // The @everyone role shares the guild's id.
        let everyone = discord::RoleId::new(guild.get());
        let granted = partial
            .roles
            .iter()
            .filter(|(role_id, _)| **role_id == everyone || member.roles.contains(role_id))
            .fold(discord::Permissions::empty(), |granted, (_, role)| {
                granted | role.permissions
            });
        Ok(MemberPermissions {
            manage_channels: granted.contains(discord::Permissions::MANAGE_CHANNELS),
            administrator: granted.contains(discord::Permissions::ADMINISTRATOR),
        })
    }
}

#[async_trait]
impl ChannelHistory for DiscordGateway {
    async fn guilds(&self) -> Result<Vec<GuildId>, GatewayError> {
        Ok(self.cache().guilds.iter().copied().collect())
    }

    async fn text_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelId>, GatewayError> {
        let channels = discord::GuildId::new(guild_id.get())
            .channels(self.http())
            .await
            .map_err(|error| gateway_error(&error))?;
        let mut text_channels = channels
            .values()
            .filter(|channel| channel.kind == discord::ChannelType::Text)
            .map(|channel| (channel.position, ChannelId::new(channel.id.get())))
            .collect::<Vec<_>>();
        text_channels.sort();

        let mut cache = self.cache();
        Ok(text_channels
            .into_iter()
            .map(|(_, channel_id)| {
                cache.channel_guilds.insert(channel_id, guild_id);
                channel_id
            })
            .collect())
    }

    async fn recent_messages(
        &self,
        channel_id: ChannelId,
        limit: usize,
    ) -> Result<Vec<InboundMessage>, GatewayError> {
        let channel = discord::ChannelId::new(channel_id.get());
        let mut collected: Vec<discord::Message> = Vec::new();
        let mut before: Option<discord::MessageId> = None;
        while collected.len() < limit {
            let page_size = (limit - collected.len()).min(HISTORY_PAGE_SIZE);
            // Bounded by HISTORY_PAGE_SIZE.
            let mut request = discord::GetMessages::new().limit(page_size as u8);
            if let Some(before) = before {
                request = request.before(before);
            }
            let page = channel
                .messages(self.http(), request)
                .await
                .map_err(|error| gateway_error(&error))?;
            let exhausted = page.len() < page_size;
            before = page.last().map(|message| message.id);
            collected.extend(page);
            if exhausted || before.is_none() {
                break;
            }
        }

        // History pages arrive newest first and without a guild id.
        let guild_id = self.cache().channel_guilds.get(&channel_id).copied();
        Ok(collected
            .iter()
            .rev()
            .map(|message| {
                let mut inbound = inbound_message(message);
                inbound.guild_id = inbound.guild_id.or(guild_id);
                inbound
            })
            .collect())
    }
}
