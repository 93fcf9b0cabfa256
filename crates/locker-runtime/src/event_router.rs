//! Classifies inbound messages into the work they trigger.

use locker_core::{InboundMessage, UserId};

use crate::operator_commands::{parse_operator_command, OperatorCommand};
use crate::runtime_config::LockerConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Work triggered by one message. A single message may trigger several.
pub struct MessageRoute {
    pub lock_reason: Option<String>,
    pub catch_candidate: bool,
    pub command: Option<OperatorCommand>,
}

impl MessageRoute {
    pub fn is_empty(&self) -> bool {
        self.lock_reason.is_none() && !self.catch_candidate && self.command.is_none()
    }
}

/// Routes `message`. Messages authored by the bot itself are ignored, and
/// operator commands are only honoured from human authors.
pub fn route_message(
    message: &InboundMessage,
    config: &LockerConfig,
    self_user_id: Option<UserId>,
) -> MessageRoute {
    if self_user_id == Some(message.author.id) {
        return MessageRoute::default();
    }

    let lock_reason = (config.is_monitored(message.author.id) && !message.mentions.is_empty())
        .then(|| format!("ping from {}", message.author.account_name));
    let catch_candidate = message.author.id == config.game_bot_id;
    let command = if message.author.bot {
        None
    } else {
        parse_operator_command(
            &message.content,
            &config.command_prefix,
            config.backfill_limit,
        )
    };

    MessageRoute {
        lock_reason,
        catch_candidate,
        command,
    }
}
