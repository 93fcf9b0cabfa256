//! Foundational types and utilities shared across locker crates.
//!
//! Provides platform id newtypes, the inbound event model delivered by the
//! message gateway, the outbound effect queue, atomic snapshot writes, and
//! UTC time helpers used by lock deadlines and daily counter resets.

pub mod atomic_io;
pub mod effects;
pub mod events;
pub mod gateway_error;
pub mod ids;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use effects::{EffectReceiver, EffectSink, GatewayEffect, OutboundEmbed, SendPermission};
pub use events::{EmbedText, InboundMessage, MemberPermissions, MemberProfile, ReactionEvent};
pub use gateway_error::GatewayError;
pub use ids::{ChannelId, GuildId, MessageId, UserId};
pub use time_utils::{format_remaining, utc_today};
