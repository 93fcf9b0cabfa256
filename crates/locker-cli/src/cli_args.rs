use std::{collections::BTreeSet, path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use locker_core::{ChannelId, UserId};
use locker_runtime::{
    LockerConfig, DEFAULT_BACKFILL_LIMIT, DEFAULT_CATCH_DATA_FILE, DEFAULT_COMMAND_PREFIX,
    DEFAULT_GAME_BOT_ID, DEFAULT_LOCK_HOURS, DEFAULT_MONITORED_BOT_ID, DEFAULT_TICK_SECONDS,
};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "locker",
    about = "Locks channels on bot pings and tracks catch leaderboards",
    version
)]
pub struct LockerCli {
    #[arg(
        long,
        env = "BOT_TOKEN",
        hide_env_values = true,
        help = "Discord bot token"
    )]
    pub token: String,

    #[arg(
        long = "log-channel-id",
        env = "LOG_CHANNEL_ID",
        value_parser = parse_positive_u64,
        help = "Channel receiving lock and unlock audit lines"
    )]
    pub log_channel_id: Option<u64>,

    #[arg(
        long = "catch-log-channel-id",
        env = "CATCH_LOG_CHANNEL_ID",
        value_parser = parse_positive_u64,
        help = "Channel receiving per-catch updates"
    )]
    pub catch_log_channel_id: Option<u64>,

    #[arg(
        long = "monitored-bot-id",
        env = "LOCKER_MONITORED_BOT_IDS",
        value_delimiter = ',',
        value_parser = parse_positive_u64,
        default_values_t = [DEFAULT_MONITORED_BOT_ID],
        help = "Bot accounts whose member pings lock the channel (comma-separated)"
    )]
    pub monitored_bot_ids: Vec<u64>,

    #[arg(
        long = "game-bot-id",
        env = "LOCKER_GAME_BOT_ID",
        value_parser = parse_positive_u64,
        default_value_t = DEFAULT_GAME_BOT_ID,
        help = "Bot account whose notifications are scanned for catches"
    )]
    pub game_bot_id: u64,

    #[arg(
        long = "catch-data-file",
        env = "LOCKER_CATCH_DATA_FILE",
        default_value = DEFAULT_CATCH_DATA_FILE,
        help = "Path of the durable catch counter snapshot"
    )]
    pub catch_data_file: PathBuf,

    #[arg(
        long = "lock-hours",
        env = "LOCKER_LOCK_HOURS",
        value_parser = parse_positive_u64,
        default_value_t = DEFAULT_LOCK_HOURS,
        help = "Hours a locked channel stays locked before auto-unlock"
    )]
    pub lock_hours: u64,

    #[arg(
        long = "tick-seconds",
        env = "LOCKER_TICK_SECONDS",
        value_parser = parse_positive_u64,
        default_value_t = DEFAULT_TICK_SECONDS,
        help = "Interval of the expiry and daily-reset timer"
    )]
    pub tick_seconds: u64,

    #[arg(
        long = "command-prefix",
        env = "LOCKER_COMMAND_PREFIX",
        default_value = DEFAULT_COMMAND_PREFIX,
        help = "Prefix of operator commands"
    )]
    pub command_prefix: String,

    #[arg(
        long = "backfill-limit",
        env = "LOCKER_BACKFILL_LIMIT",
        value_parser = parse_positive_usize,
        default_value_t = DEFAULT_BACKFILL_LIMIT,
        help = "Messages replayed per channel by history backfill"
    )]
    pub backfill_limit: usize,
}

impl LockerCli {
    pub fn to_locker_config(&self) -> Result<LockerConfig> {
        let config = LockerConfig {
            monitored_bot_ids: self
                .monitored_bot_ids
                .iter()
                .copied()
                .map(UserId::new)
                .collect::<BTreeSet<_>>(),
            game_bot_id: UserId::new(self.game_bot_id),
            log_channel_id: self.log_channel_id.map(ChannelId::new),
            catch_log_channel_id: self.catch_log_channel_id.map(ChannelId::new),
            catch_data_path: self.catch_data_file.clone(),
            lock_duration: Duration::from_secs(self.lock_hours.saturating_mul(3_600)),
            tick_interval: Duration::from_secs(self.tick_seconds),
            command_prefix: self.command_prefix.clone(),
            backfill_limit: self.backfill_limit,
            ..LockerConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<LockerCli, clap::Error> {
        LockerCli::try_parse_from(std::iter::once("locker").chain(args.iter().copied()))
    }

    #[test]
    fn unit_defaults_match_runtime_defaults() {
        let cli = parse(&["--token", "abc"]).expect("parse");
        let config = cli.to_locker_config().expect("config");
        assert_eq!(config.game_bot_id, UserId::new(DEFAULT_GAME_BOT_ID));
        assert!(config.is_monitored(UserId::new(DEFAULT_MONITORED_BOT_ID)));
        assert_eq!(config.lock_duration, Duration::from_secs(24 * 3_600));
        assert_eq!(config.tick_interval, Duration::from_secs(60));
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.backfill_limit, 1_000);
    }

    #[test]
    fn functional_explicit_flags_flow_into_config() {
        let cli = parse(&[
            "--token",
            "abc",
            "--log-channel-id",
            "11",
            "--catch-log-channel-id",
            "12",
            "--monitored-bot-id",
            "21,22",
            "--lock-hours",
            "2",
            "--catch-data-file",
            "/tmp/catches.json",
        ])
        .expect("parse");
        let config = cli.to_locker_config().expect("config");
        assert_eq!(config.log_channel_id, Some(ChannelId::new(11)));
        assert_eq!(config.catch_log_channel_id, Some(ChannelId::new(12)));
        assert_eq!(
            config.monitored_bot_ids,
            BTreeSet::from([UserId::new(21), UserId::new(22)])
        );
        assert_eq!(config.lock_duration, Duration::from_secs(7_200));
        assert_eq!(config.catch_data_path, PathBuf::from("/tmp/catches.json"));
    }

    #[test]
    fn regression_zero_values_are_rejected() {
        assert!(parse(&["--token", "abc", "--tick-seconds", "0"]).is_err());
        assert!(parse(&["--token", "abc", "--backfill-limit", "0"]).is_err());
        assert!(parse(&["--token", "abc", "--log-channel-id", "0"]).is_err());
    }

    #[test]
    fn regression_blank_prefix_fails_config_validation() {
        let cli = parse(&["--token", "abc", "--command-prefix", " "]).expect("parse");
        let error = cli.to_locker_config().expect_err("blank prefix");
        assert!(error.to_string().contains("command prefix"));
    }

    #[test]
    fn regression_absurd_lock_hours_fail_config_validation() {
        let cli = parse(&["--token", "abc", "--lock-hours", "10000000000"]).expect("parse");
        let error = cli.to_locker_config().expect_err("oversized lock");
        assert!(error.to_string().contains("lock duration"));
    }
}
