//! Composition root wiring gateway events into the lock and catch components.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use locker_catch::{
    lookup_member, CatchAggregator, CatchRecord, CounterStore, MemberDirectory, SnapshotLoadOutcome,
};
use locker_core::{
    utc_today, ChannelId, EffectSink, GatewayEffect, InboundMessage, MessageId, ReactionEvent,
    UserId,
};
use locker_lock::LockStateMachine;

use crate::backfill_runtime::{backfill_all_guilds, backfill_guild, BackfillReport, ChannelHistory};
use crate::catch_pipeline::CatchPipeline;
use crate::event_router::route_message;
use crate::operator_commands::{
    render_catches_response, render_leaderboard, render_member_not_found, CommandPermission,
    MemberArgument, OperatorCommand, LEADERBOARD_SIZE,
};
use crate::runtime_config::LockerConfig;
use crate::timer_runtime::{start_timer_service, TimerServiceHandle};

const BACKFILL_START_NOTICE: &str =
    "Starting backfill for this server (this may double-count if data already exists)...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyReport {
    /// `None` when the runtime was already initialised by an earlier ready.
    pub load_outcome: Option<SnapshotLoadOutcome>,
    pub backfill: Option<BackfillReport>,
}

pub struct LockerRuntime {
    config: LockerConfig,
    effects: EffectSink,
    locks: Arc<LockStateMachine>,
    store: Arc<CounterStore>,
    catches: CatchPipeline,
    directory: Arc<dyn MemberDirectory>,
    history: Arc<dyn ChannelHistory>,
    self_user_id: Mutex<Option<UserId>>,
    initialised: AtomicBool,
    timer: tokio::sync::Mutex<Option<TimerServiceHandle>>,
}

impl LockerRuntime {
    pub fn new(
        config: LockerConfig,
        effects: EffectSink,
        directory: Arc<dyn MemberDirectory>,
        history: Arc<dyn ChannelHistory>,
    ) -> Result<Self> {
        config.validate()?;
        let locks = Arc::new(LockStateMachine::new(config.lock_policy()?, effects.clone()));
        let store = Arc::new(CounterStore::new(config.catch_data_path.clone()));
        let catches = CatchPipeline::new(
            CatchAggregator::new(Arc::clone(&store), Arc::clone(&directory)),
            effects.clone(),
            config.game_bot_id,
            config.catch_log_channel_id,
        );
        Ok(Self {
            config,
            effects,
            locks,
            store,
            catches,
            directory,
            history,
            self_user_id: Mutex::new(None),
            initialised: AtomicBool::new(false),
            timer: tokio::sync::Mutex::new(None),
        })
    }

    pub fn config(&self) -> &LockerConfig {
        &self.config
    }

    pub fn locks(&self) -> &Arc<LockStateMachine> {
        &self.locks
    }

    pub fn store(&self) -> &Arc<CounterStore> {
        &self.store
    }

    fn self_user_id(&self) -> Option<UserId> {
        *self.self_user_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads counters, seeds the reset date, starts the timer and, when the
    /// snapshot was missing or empty, replays recent history. Later ready
    /// events (gateway reconnects) only refresh the bot's own id.
    pub async fn on_ready(&self, self_user_id: UserId) -> Result<ReadyReport> {
        *self.self_user_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(self_user_id);
        if self.initialised.swap(true, Ordering::SeqCst) {
            tracing::info!(%self_user_id, "gateway ready again; runtime already initialised");
            return Ok(ReadyReport {
                load_outcome: None,
                backfill: None,
            });
        }

        let outcome = self.store.load();
        self.store.ensure_reset_date(utc_today(Utc::now()));

        {
            let mut timer = self.timer.lock().await;
            if timer.is_none() {
                match start_timer_service(
                    self.config.tick_interval,
                    Arc::clone(&self.locks),
                    Arc::clone(&self.store),
                ) {
                    Ok(handle) => *timer = Some(handle),
                    Err(error) => {
                        // Let the next ready retry the whole startup.
                        self.initialised.store(false, Ordering::SeqCst);
                        return Err(error);
                    }
                }
            }
        }

        let backfill = if self.store.needs_backfill() {
            Some(
                backfill_all_guilds(
                    self.history.as_ref(),
                    &self.catches,
                    self.config.backfill_limit,
                )
                .await,
            )
        } else {
            None
        };
        tracing::info!(
            %self_user_id,
            snapshot = outcome.as_str(),
            backfilled = backfill.is_some(),
            "locker runtime ready"
        );
        Ok(ReadyReport {
            load_outcome: Some(outcome),
            backfill,
        })
    }

    pub async fn on_message(&self, message: &InboundMessage) {
        self.on_message_at(message, Utc::now()).await;
    }

    pub async fn on_message_at(&self, message: &InboundMessage, now: DateTime<Utc>) {
        let route = route_message(message, &self.config, self.self_user_id());
        if let Some(reason) = route.lock_reason.as_deref() {
            self.locks.lock(message.channel_id, reason, now);
        }
        if route.catch_candidate {
            self.catches.handle(message).await;
        }
        if let Some(command) = route.command {
            self.execute_command(message, command, now).await;
        }
    }

    pub fn on_reaction_add(&self, reaction: &ReactionEvent) -> bool {
        self.locks.on_release_reaction(reaction)
    }

    /// Gateway callback once the lock notice for `episode` has been posted.
    pub fn on_release_notice_posted(
        &self,
        channel_id: ChannelId,
        episode: u64,
        message_id: MessageId,
    ) -> bool {
        self.locks
            .bind_release_message(channel_id, episode, message_id)
    }

    /// Processes a single message as a catch notification, as the live path
    /// does. Used by replays driven from outside the runtime.
    pub async fn process_catch(&self, message: &InboundMessage) -> Option<CatchRecord> {
        self.catches.handle(message).await
    }

    pub async fn shutdown(&self) {
        if let Some(mut timer) = self.timer.lock().await.take() {
            timer.shutdown().await;
        }
        if let Err(error) = self.store.save() {
            tracing::error!(error = %format!("{error:#}"), "final catch snapshot save failed");
        }
    }

    fn reply(&self, message: &InboundMessage, content: impl Into<String>) {
        self.effects.send_text(message.channel_id, content);
    }

    async fn permitted(&self, message: &InboundMessage, required: CommandPermission) -> bool {
        if required == CommandPermission::Everyone {
            return true;
        }
        let Some(guild_id) = message.guild_id else {
            self.reply(message, "This command only works in a server.");
            return false;
        };
        let permissions = match self
            .directory
            .member_permissions(guild_id, message.author.id)
            .await
        {
            Ok(permissions) => permissions,
            Err(error) => {
                tracing::warn!(
                    %guild_id,
                    user_id = %message.author.id,
                    %error,
                    "permission lookup failed; command refused"
                );
                self.reply(message, required.denial_message());
                return false;
            }
        };
        let allowed = match required {
            CommandPermission::Everyone => true,
            CommandPermission::ManageChannels => permissions.can_manage_channels(),
            CommandPermission::Administrator => permissions.administrator,
        };
        if !allowed {
            self.reply(message, required.denial_message());
        }
        allowed
    }

    async fn execute_command(
        &self,
        message: &InboundMessage,
        command: OperatorCommand,
        now: DateTime<Utc>,
    ) {
        if !self.permitted(message, command.required_permission()).await {
            tracing::info!(
                command = command.name(),
                user_id = %message.author.id,
                "operator command refused"
            );
            return;
        }
        tracing::debug!(
            command = command.name(),
            user_id = %message.author.id,
            channel_id = %message.channel_id,
            "operator command"
        );

        match command {
            OperatorCommand::Ping => self.reply(message, "Pong!"),
            OperatorCommand::Lock => {
                self.locks.lock(message.channel_id, "manual", now);
                self.reply(message, "🔒 Channel manually locked.");
            }
            OperatorCommand::Unlock => {
                self.locks.unlock(message.channel_id, "manual");
            }
            OperatorCommand::Status => {
                let status = self.locks.status(now);
                if status.is_empty() {
                    self.reply(message, "✅ No channels are currently locked.");
                } else {
                    let lines = status
                        .iter()
                        .map(|entry| entry.render())
                        .collect::<Vec<_>>();
                    self.reply(message, lines.join("\n"));
                }
            }
            OperatorCommand::Catches { member } => {
                let member = match member {
                    None => message.author.id,
                    Some(MemberArgument::Id(member)) => member,
                    Some(MemberArgument::Name(name)) => {
                        match self.member_by_name(message, &name).await {
                            Some(member) => member,
                            None => {
                                self.reply(message, render_member_not_found(&name));
                                return;
                            }
                        }
                    }
                };
                self.reply(
                    message,
                    render_catches_response(member, self.store.counts(member)),
                );
            }
            OperatorCommand::CatchLog { scope } => {
                let ranked = self.store.leaderboard(scope, LEADERBOARD_SIZE);
                if ranked.is_empty() {
                    self.reply(message, "No catches recorded yet.");
                    return;
                }
                let mut rows = Vec::with_capacity(ranked.len());
                for (identity, total) in ranked {
                    rows.push((self.leaderboard_name(message, identity).await, total));
                }
                self.effects.emit(GatewayEffect::SendEmbed {
                    channel_id: message.channel_id,
                    embed: render_leaderboard(scope, &rows),
                });
            }
            OperatorCommand::Backfill { limit } => {
                let Some(guild_id) = message.guild_id else {
                    self.reply(message, "This command only works in a server.");
                    return;
                };
                self.reply(message, BACKFILL_START_NOTICE);
                let report =
                    backfill_guild(self.history.as_ref(), &self.catches, guild_id, limit).await;
                self.reply(
                    message,
                    format!(
                        "Backfill complete. Processed ~{} catches (approx).",
                        report.catches_processed
                    ),
                );
            }
            OperatorCommand::Invalid { message: usage } => self.reply(message, usage),
        }
    }

    /// First guild member whose account or display name matches `name`.
    async fn member_by_name(&self, message: &InboundMessage, name: &str) -> Option<UserId> {
        let guild_id = message.guild_id?;
        match self.directory.list_members(guild_id).await {
            Ok(members) => members
                .iter()
                .find(|member| member.matches_name(name))
                .map(|member| member.id),
            Err(error) => {
                tracing::warn!(%guild_id, %error, "member listing failed during name lookup");
                None
            }
        }
    }

    async fn leaderboard_name(&self, message: &InboundMessage, identity: UserId) -> String {
        let fallback = format!("User {identity}");
        let Some(guild_id) = message.guild_id else {
            return fallback;
        };
        match lookup_member(self.directory.as_ref(), guild_id, identity).await {
            Ok(member) => member.display_name().to_string(),
            Err(_) => fallback,
        }
    }
}
