//! Drains the runtime's effect queue against the REST API.

use std::sync::Arc;

use anyhow::{Context, Result};
use locker_core::{
    ChannelId, EffectReceiver, GatewayEffect, MessageId, OutboundEmbed, SendPermission,
};
use locker_runtime::LockerRuntime;
use serenity::all as discord;
use tokio::task::JoinHandle;

use crate::discord_convert::{outbound_embed, send_overwrite};

/// Effects are applied one at a time in queue order. A failed effect is
/// logged and the worker moves on.
pub fn spawn_effect_worker(
    mut effects: EffectReceiver,
    http: Arc<discord::Http>,
    runtime: Arc<LockerRuntime>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(effect) = effects.recv().await {
            let channel_id = effect.channel_id();
            if let Err(error) = apply_effect(&http, &runtime, effect).await {
                tracing::warn!(
                    %channel_id,
                    error = %format!("{error:#}"),
                    "gateway effect failed"
                );
            }
        }
        tracing::debug!("effect queue closed");
    })
}

async fn apply_effect(
    http: &discord::Http,
    runtime: &LockerRuntime,
    effect: GatewayEffect,
) -> Result<()> {
    match effect {
        GatewayEffect::SetSendPermission {
            channel_id,
            permission,
        } => set_send_permission(http, channel_id, permission).await,
        GatewayEffect::SendText {
            channel_id,
            content,
        } => {
            discord::ChannelId::new(channel_id.get())
                .say(http, content)
                .await
                .with_context(|| format!("failed to send message to channel {channel_id}"))?;
            Ok(())
        }
        GatewayEffect::SendEmbed { channel_id, embed } => {
            send_embed(http, channel_id, &embed).await
        }
        GatewayEffect::PostReleaseNotice {
            channel_id,
            episode,
            content,
            glyph,
        } => {
            let notice = discord::ChannelId::new(channel_id.get())
                .say(http, content)
                .await
                .with_context(|| format!("failed to post lock notice in channel {channel_id}"))?;
            runtime.on_release_notice_posted(channel_id, episode, MessageId::new(notice.id.get()));
            notice
                .react(http, discord::ReactionType::Unicode(glyph))
                .await
                .with_context(|| {
                    format!("failed to add release reaction in channel {channel_id}")
                })?;
            Ok(())
        }
    }
}

async fn send_embed(
    http: &discord::Http,
    channel_id: ChannelId,
    embed: &OutboundEmbed,
) -> Result<()> {
    discord::ChannelId::new(channel_id.get())
        .send_message(http, discord::CreateMessage::new().embed(outbound_embed(embed)))
        .await
        .with_context(|| format!("failed to send embed to channel {channel_id}"))?;
    Ok(())
}

async fn set_send_permission(
    http: &discord::Http,
    channel_id: ChannelId,
    permission: SendPermission,
) -> Result<()> {
    let channel = discord::ChannelId::new(channel_id.get());
    let guild_channel = channel
        .to_channel(http)
        .await
        .with_context(|| format!("failed to read channel {channel_id}"))?
        .guild()
        .with_context(|| format!("channel {channel_id} is not a guild channel"))?;
    let role_id = discord::RoleId::new(guild_channel.guild_id.get());
    let kind = discord::PermissionOverwriteType::Role(role_id);
    let existing = guild_channel
        .permission_overwrites
        .iter()
        .find(|overwrite| overwrite.kind == kind);

    match (send_overwrite(existing, role_id, permission), existing) {
        (Some(overwrite), _) => channel
            .create_permission(http, overwrite)
            .await
            .with_context(|| format!("failed to update permissions of channel {channel_id}"))?,
        (None, Some(_)) => channel
            .delete_permission(http, kind)
            .await
            .with_context(|| format!("failed to clear permissions of channel {channel_id}"))?,
        (None, None) => {}
    }
    tracing::debug!(%channel_id, ?permission, "send permission applied");
    Ok(())
}
