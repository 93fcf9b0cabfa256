//! Operator command parsing and response rendering.

use locker_catch::{CatchCounts, LeaderboardScope};
use locker_core::{OutboundEmbed, UserId};

const LEADERBOARD_COLOUR: u32 = 0xF1_C4_0F;
pub const LEADERBOARD_SIZE: usize = 10;

/// Member named by a command argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberArgument {
    Id(UserId),
    /// Account name or display name, matched case-insensitively.
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Ping,
    Lock,
    Unlock,
    Status,
    Catches { member: Option<MemberArgument> },
    CatchLog { scope: LeaderboardScope },
    Backfill { limit: usize },
    Invalid { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPermission {
    Everyone,
    ManageChannels,
    Administrator,
}

impl CommandPermission {
    pub fn denial_message(self) -> &'static str {
        match self {
            Self::Everyone => "",
            Self::ManageChannels => {
                "⛔ You need the Manage Channels permission to use this command."
            }
            Self::Administrator => "⛔ You need the Administrator permission to use this command.",
        }
    }
}

impl OperatorCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Status => "status",
            Self::Catches { .. } => "catches",
            Self::CatchLog { .. } => "catchlog",
            Self::Backfill { .. } => "backfill",
            Self::Invalid { .. } => "invalid",
        }
    }

    pub fn required_permission(&self) -> CommandPermission {
        match self {
            Self::Lock | Self::Unlock | Self::Status => CommandPermission::ManageChannels,
            Self::Backfill { .. } => CommandPermission::Administrator,
            Self::Ping | Self::Catches { .. } | Self::CatchLog { .. } | Self::Invalid { .. } => {
                CommandPermission::Everyone
            }
        }
    }
}

pub fn operator_command_usage(prefix: &str) -> String {
    [
        "Supported commands:".to_string(),
        format!("- `{prefix}ping`"),
        format!("- `{prefix}lock`"),
        format!("- `{prefix}unlock`"),
        format!("- `{prefix}status`"),
        format!("- `{prefix}catches [member]`"),
        format!("- `{prefix}catchlog [daily|all]`"),
        format!("- `{prefix}backfill [limit]`"),
    ]
    .join("\n")
}

fn parse_member_argument(raw: &str) -> Option<MemberArgument> {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        return inner
            .trim_start_matches('!')
            .parse::<u64>()
            .ok()
            .map(|id| MemberArgument::Id(UserId::new(id)));
    }
    if let Ok(id) = trimmed.parse::<u64>() {
        return Some(MemberArgument::Id(UserId::new(id)));
    }
    let name = trimmed.trim_start_matches('@').trim();
    (!name.is_empty()).then(|| MemberArgument::Name(name.to_string()))
}

/// Parses `content` as an operator command. Returns `None` when the message
/// does not start with `prefix` followed by a known command name.
pub fn parse_operator_command(
    content: &str,
    prefix: &str,
    default_backfill_limit: usize,
) -> Option<OperatorCommand> {
    let body = content.trim().strip_prefix(prefix)?;
    let mut parts = body.split_whitespace();
    let command = parts.next()?;
    let argument = parts.next();
    let remainder = body.trim_start().get(command.len()..).unwrap_or("").trim();
    let parsed = match command {
        "ping" => OperatorCommand::Ping,
        "lock" => OperatorCommand::Lock,
        "unlock" => OperatorCommand::Unlock,
        "status" => OperatorCommand::Status,
        "catches" => match argument {
            None => OperatorCommand::Catches { member: None },
            Some(_) => match parse_member_argument(remainder) {
                Some(member) => OperatorCommand::Catches {
                    member: Some(member),
                },
                None => OperatorCommand::Invalid {
                    message: format!("Usage: {prefix}catches [member]"),
                },
            },
        },
        "catchlog" => {
            let scope = match argument {
                Some(raw) if raw.eq_ignore_ascii_case("all") => LeaderboardScope::AllTime,
                _ => LeaderboardScope::Daily,
            };
            OperatorCommand::CatchLog { scope }
        }
        "backfill" => match argument {
            None => OperatorCommand::Backfill {
                limit: default_backfill_limit,
            },
            Some(raw) => match raw.parse::<usize>() {
                Ok(limit) if limit > 0 => OperatorCommand::Backfill { limit },
                _ => OperatorCommand::Invalid {
                    message: format!(
                        "Usage: {prefix}backfill [limit] (limit must be a positive integer)"
                    ),
                },
            },
        },
        "help" => OperatorCommand::Invalid {
            message: operator_command_usage(prefix),
        },
        _ => return None,
    };
    Some(parsed)
}

pub fn render_member_not_found(name: &str) -> String {
    format!("Member \"{name}\" not found.")
}

pub fn render_catches_response(member: UserId, counts: CatchCounts) -> String {
    format!(
        "📊 {} → Today: **{}**, All-Time: **{}**",
        member.mention(),
        counts.daily,
        counts.all_time
    )
}

/// Renders ranked `(display name, count)` rows as the leaderboard embed.
pub fn render_leaderboard(scope: LeaderboardScope, rows: &[(String, u64)]) -> OutboundEmbed {
    let description = rows
        .iter()
        .enumerate()
        .map(|(index, (name, total))| format!("**{}. {name}** → {total}\n", index + 1))
        .collect::<String>();
    OutboundEmbed {
        title: scope.title().to_string(),
        description,
        colour: LEADERBOARD_COLOUR,
        fields: Vec::new(),
    }
}
