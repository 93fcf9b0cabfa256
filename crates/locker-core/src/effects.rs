//! Outbound side effects requested by the core and executed by the gateway.
//!
//! The core never awaits these; it pushes them onto an unbounded queue and
//! moves on. The gateway's effect worker drains the queue in order, so effects
//! emitted by one operation are carried out in emission order.

use tokio::sync::mpsc;

use crate::ids::ChannelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Send-messages overwrite applied to a channel's default role.
pub enum SendPermission {
    Deny,
    Inherit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmbed {
    pub title: String,
    pub description: String,
    pub colour: u32,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEffect {
    SetSendPermission {
        channel_id: ChannelId,
        permission: SendPermission,
    },
    SendText {
        channel_id: ChannelId,
        content: String,
    },
    SendEmbed {
        channel_id: ChannelId,
        embed: OutboundEmbed,
    },
    /// Posts the lock notice, reports its id back for `episode`, then attaches
    /// `glyph` as the release reaction.
    PostReleaseNotice {
        channel_id: ChannelId,
        episode: u64,
        content: String,
        glyph: String,
    },
}

impl GatewayEffect {
    pub fn channel_id(&self) -> ChannelId {
        match self {
            Self::SetSendPermission { channel_id, .. }
            | Self::SendText { channel_id, .. }
            | Self::SendEmbed { channel_id, .. }
            | Self::PostReleaseNotice { channel_id, .. } => *channel_id,
        }
    }
}

pub type EffectReceiver = mpsc::UnboundedReceiver<GatewayEffect>;

#[derive(Debug, Clone)]
pub struct EffectSink {
    tx: mpsc::UnboundedSender<GatewayEffect>,
}

impl EffectSink {
    pub fn channel() -> (Self, EffectReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, effect: GatewayEffect) {
        if let Err(error) = self.tx.send(effect) {
            tracing::warn!(
                channel_id = %error.0.channel_id(),
                "gateway effect dropped: effect worker is gone"
            );
        }
    }

    pub fn send_text(&self, channel_id: ChannelId, content: impl Into<String>) {
        self.emit(GatewayEffect::SendText {
            channel_id,
            content: content.into(),
        });
    }
}
