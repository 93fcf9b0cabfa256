//! Inbound event model delivered by the message gateway.

use crate::ids::{ChannelId, GuildId, MessageId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Member as seen through the gateway's member directory.
pub struct MemberProfile {
    pub id: UserId,
    pub account_name: String,
    pub display_name: Option<String>,
    pub bot: bool,
}

impl MemberProfile {
    pub fn new(id: UserId, account_name: impl Into<String>) -> Self {
        Self {
            id,
            account_name: account_name.into(),
            display_name: None,
            bot: false,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(self.account_name.as_str())
    }

    /// Case-insensitive exact match against the account or display name.
    pub fn matches_name(&self, candidate: &str) -> bool {
        let candidate = candidate.to_lowercase();
        if self.account_name.to_lowercase() == candidate {
            return true;
        }
        self.display_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase() == candidate)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Text-bearing parts of one rich-content block.
pub struct EmbedText {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: MessageId,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub author: MemberProfile,
    pub mentions: Vec<MemberProfile>,
    pub content: String,
    pub embeds: Vec<EmbedText>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub user_is_bot: bool,
    pub emoji: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Guild-level permissions relevant to the operator command surface.
pub struct MemberPermissions {
    pub manage_channels: bool,
    pub administrator: bool,
}

impl MemberPermissions {
    pub fn can_manage_channels(self) -> bool {
        self.manage_channels || self.administrator
    }
}
