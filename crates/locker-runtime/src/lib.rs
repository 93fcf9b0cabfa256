//! Event-driven runtime for the channel locker and catch tracker.
//!
//! Consumes gateway events (ready, message, reaction), routes them to the
//! lock state machine or the catch pipeline, serves operator commands and
//! drives the periodic timer.

pub mod backfill_runtime;
pub mod catch_pipeline;
pub mod event_router;
pub mod locker_runtime;
pub mod operator_commands;
pub mod runtime_config;
pub mod timer_runtime;

pub use backfill_runtime::{backfill_all_guilds, backfill_guild, BackfillReport, ChannelHistory};
pub use catch_pipeline::CatchPipeline;
pub use event_router::{route_message, MessageRoute};
pub use locker_runtime::{LockerRuntime, ReadyReport};
pub use operator_commands::{
    parse_operator_command, CommandPermission, MemberArgument, OperatorCommand,
};
pub use runtime_config::{
    LockerConfig, DEFAULT_BACKFILL_LIMIT, DEFAULT_CATCH_DATA_FILE, DEFAULT_COMMAND_PREFIX,
    DEFAULT_GAME_BOT_ID, DEFAULT_LOCK_HOURS, DEFAULT_MONITORED_BOT_ID, DEFAULT_TICK_SECONDS,
    MAX_LOCK_HOURS,
};
pub use timer_runtime::{run_timer_tick, start_timer_service, TimerServiceHandle, TimerTickReport};
