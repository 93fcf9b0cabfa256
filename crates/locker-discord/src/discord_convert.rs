//! Conversions between serenity models and the gateway-neutral locker types.

use locker_core::{
    ChannelId, EmbedText, GatewayError, GuildId, InboundMessage, MemberProfile, MessageId,
    OutboundEmbed, SendPermission, UserId,
};
use serenity::all as discord;

pub fn user_profile(user: &discord::User) -> MemberProfile {
    let profile = MemberProfile {
        bot: user.bot,
        ..MemberProfile::new(UserId::new(user.id.get()), user.name.clone())
    };
    match user.global_name.as_deref() {
        Some(global_name) if !global_name.trim().is_empty() => {
            profile.with_display_name(global_name)
        }
        _ => profile,
    }
}

/// Guild nickname first, then the global display name, then the account name.
pub fn member_profile(member: &discord::Member) -> MemberProfile {
    with_nick(user_profile(&member.user), member.nick.as_deref())
}

/// Mentions in gateway messages carry a partial guild member; its nickname
/// wins over the global name.
pub fn mention_profile(user: &discord::User) -> MemberProfile {
    with_nick(
        user_profile(user),
        user.member.as_ref().and_then(|member| member.nick.as_deref()),
    )
}

fn with_nick(profile: MemberProfile, nick: Option<&str>) -> MemberProfile {
    match nick {
        Some(nick) if !nick.trim().is_empty() => profile.with_display_name(nick),
        _ => profile,
    }
}

pub fn embed_text(embed: &discord::Embed) -> EmbedText {
    EmbedText {
        title: embed.title.clone(),
        description: embed.description.clone(),
        fields: embed
            .fields
            .iter()
            .map(|field| (field.name.clone(), field.value.clone()))
            .collect(),
    }
}

pub fn inbound_message(message: &discord::Message) -> InboundMessage {
    let author = with_nick(
        user_profile(&message.author),
        message
            .member
            .as_ref()
            .and_then(|member| member.nick.as_deref()),
    );
    InboundMessage {
        id: MessageId::new(message.id.get()),
        guild_id: message.guild_id.map(|guild_id| GuildId::new(guild_id.get())),
        channel_id: ChannelId::new(message.channel_id.get()),
        author,
        mentions: message.mentions.iter().map(mention_profile).collect(),
        content: message.content.clone(),
        embeds: message.embeds.iter().map(embed_text).collect(),
    }
}

pub fn reaction_emoji(reaction: &discord::ReactionType) -> String {
    match reaction {
        discord::ReactionType::Unicode(glyph) => glyph.clone(),
        other => other.to_string(),
    }
}

pub fn outbound_embed(embed: &OutboundEmbed) -> discord::CreateEmbed {
    embed.fields.iter().fold(
        discord::CreateEmbed::new()
            .title(&embed.title)
            .description(&embed.description)
            .colour(embed.colour),
        |builder, (name, value)| builder.field(name, value, false),
    )
}

/// 403 and 404 responses map to their typed variants; everything else is a
/// transport failure.
pub fn gateway_error(error: &serenity::Error) -> GatewayError {
    if let serenity::Error::Http(http_error) = error {
        match http_error.status_code().map(|status| status.as_u16()) {
            Some(403) => return GatewayError::PermissionDenied(error.to_string()),
            Some(404) => return GatewayError::NotFound(error.to_string()),
            _ => {}
        }
    }
    GatewayError::Transport(error.to_string())
}

/// Applies `permission` to the default role's existing overwrite, keeping
/// every other bit. Returns `None` when nothing is left to overwrite.
pub fn send_overwrite(
    existing: Option<&discord::PermissionOverwrite>,
    role_id: discord::RoleId,
    permission: SendPermission,
) -> Option<discord::PermissionOverwrite> {
    let (mut allow, mut deny) = existing
        .map(|overwrite| (overwrite.allow, overwrite.deny))
        .unwrap_or((discord::Permissions::empty(), discord::Permissions::empty()));
    allow.remove(discord::Permissions::SEND_MESSAGES);
    match permission {
        SendPermission::Deny => deny.insert(discord::Permissions::SEND_MESSAGES),
        SendPermission::Inherit => deny.remove(discord::Permissions::SEND_MESSAGES),
    }
    if allow.is_empty() && deny.is_empty() {
        return None;
    }
    Some(discord::PermissionOverwrite {
        allow,
        deny,
        kind: discord::PermissionOverwriteType::Role(role_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: discord::RoleId = discord::RoleId::new(77);

    #[test]
    fn unit_send_overwrite_deny_keeps_unrelated_bits() {
        let existing = discord::PermissionOverwrite {
            allow: discord::Permissions::SEND_MESSAGES | discord::Permissions::ADD_REACTIONS,
            deny: discord::Permissions::ATTACH_FILES,
            kind: discord::PermissionOverwriteType::Role(ROLE),
        };
        let overwrite =
            send_overwrite(Some(&existing), ROLE, SendPermission::Deny).expect("overwrite");
        assert_eq!(overwrite.allow, discord::Permissions::ADD_REACTIONS);
        assert_eq!(
            overwrite.deny,
            discord::Permissions::ATTACH_FILES | discord::Permissions::SEND_MESSAGES
        );
    }

    #[test]
    fn functional_send_overwrite_inherit_clears_only_send_messages() {
        let existing = discord::PermissionOverwrite {
            allow: discord::Permissions::empty(),
            deny: discord::Permissions::SEND_MESSAGES | discord::Permissions::ATTACH_FILES,
            kind: discord::PermissionOverwriteType::Role(ROLE),
        };
        let overwrite =
            send_overwrite(Some(&existing), ROLE, SendPermission::Inherit).expect("overwrite");
        assert_eq!(overwrite.deny, discord::Permissions::ATTACH_FILES);
        assert!(overwrite.allow.is_empty());
    }

    #[test]
    fn regression_send_overwrite_inherit_without_other_bits_is_removed() {
        let existing = discord::PermissionOverwrite {
            allow: discord::Permissions::empty(),
            deny: discord::Permissions::SEND_MESSAGES,
            kind: discord::PermissionOverwriteType::Role(ROLE),
        };
        assert!(send_overwrite(Some(&existing), ROLE, SendPermission::Inherit).is_none());
        assert!(send_overwrite(None, ROLE, SendPermission::Inherit).is_none());
        assert!(send_overwrite(None, ROLE, SendPermission::Deny).is_some());
    }

    #[test]
    fn unit_embed_text_keeps_title_description_and_fields() {
        let embed: discord::Embed = serde_json::from_value(serde_json::json!({
            "title": "Congratulations Ash!",
            "description": "You caught a Level 4 Pikachu!",
            "fields": [{ "name": "Shiny", "value": "no", "inline": false }]
        }))
        .expect("embed");
        assert_eq!(
            embed_text(&embed),
            EmbedText {
                title: Some("Congratulations Ash!".to_string()),
                description: Some("You caught a Level 4 Pikachu!".to_string()),
                fields: vec![("Shiny".to_string(), "no".to_string())],
            }
        );
    }

    fn mentioned_user(member: serde_json::Value) -> discord::User {
        serde_json::from_value(serde_json::json!({
            "id": "31",
            "username": "ash",
            "discriminator": "0",
            "global_name": "Ash Ketchum",
            "avatar": null,
            "bot": false,
            "member": member
        }))
        .expect("user")
    }

    #[test]
    fn functional_mention_profile_prefers_guild_nickname() {
        let user = mentioned_user(serde_json::json!({
            "nick": "Champion Ash",
            "roles": [],
            "joined_at": "2024-01-01T00:00:00+00:00",
            "deaf": false,
            "mute": false,
            "pending": false,
            "flags": 0
        }));
        let profile = mention_profile(&user);
        assert_eq!(profile.id, UserId::new(31));
        assert_eq!(profile.display_name(), "Champion Ash");
        assert!(profile.matches_name("ash"));
    }

    #[test]
    fn regression_mention_profile_without_member_uses_global_name() {
        let user = mentioned_user(serde_json::Value::Null);
        assert_eq!(mention_profile(&user).display_name(), "Ash Ketchum");
    }

    #[test]
    fn unit_gateway_error_defaults_to_transport() {
        let error = gateway_error(&serenity::Error::Other("socket closed"));
        assert!(matches!(error, GatewayError::Transport(_)));
        assert!(!error.is_permission_denied());
    }

    #[test]
    fn unit_reaction_emoji_reads_unicode_glyph() {
        assert_eq!(
            reaction_emoji(&discord::ReactionType::Unicode("🔓".to_string())),
            "🔓"
        );
    }
}
