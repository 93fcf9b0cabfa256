use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use locker_catch::MemberDirectory;
use locker_core::{
    ChannelId, EffectReceiver, EffectSink, GatewayEffect, GatewayError, GuildId, InboundMessage,
    MemberPermissions, MemberProfile, MessageId, ReactionEvent, SendPermission, UserId,
};
use locker_runtime::{
    run_timer_tick, ChannelHistory, LockerConfig, LockerRuntime, DEFAULT_GAME_BOT_ID,
    DEFAULT_MONITORED_BOT_ID,
};
use serde_json::Value;

static WORKSPACE_COUNTER: AtomicU64 = AtomicU64::new(1);
static NOTICE_IDS: AtomicU64 = AtomicU64::new(10_000);

const GUILD: GuildId = GuildId::new(1_000);
const SPAWN_CHANNEL: ChannelId = ChannelId::new(2_000);
const LOG_CHANNEL: ChannelId = ChannelId::new(2_001);
const CATCH_LOG_CHANNEL: ChannelId = ChannelId::new(2_002);

struct IsolatedWorkspace {
    root: PathBuf,
}

impl IsolatedWorkspace {
    fn new(label: &str) -> Self {
        let tick = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let count = WORKSPACE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "locker-{label}-{}-{tick}-{count}",
            std::process::id()
        ));
        fs::create_dir_all(&root).expect("must create isolated workspace root");
        Self { root }
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for IsolatedWorkspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

/// In-memory guild: a member list and no readable history.
struct ScriptedGuild {
    members: Vec<MemberProfile>,
}

#[async_trait]
impl MemberDirectory for ScriptedGuild {
    fn cached_member(&self, _guild_id: GuildId, user_id: UserId) -> Option<MemberProfile> {
        self.members
            .iter()
            .find(|member| member.id == user_id)
            .cloned()
    }

    async fn fetch_member(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
    ) -> Result<MemberProfile, GatewayError> {
        Err(GatewayError::NotFound(format!("member {user_id}")))
    }

    async fn list_members(&self, _guild_id: GuildId) -> Result<Vec<MemberProfile>, GatewayError> {
        Ok(self.members.clone())
    }

    async fn member_permissions(
        &self,
        _guild_id: GuildId,
        _user_id: UserId,
    ) -> Result<MemberPermissions, GatewayError> {
        Ok(MemberPermissions {
            manage_channels: true,
            administrator: false,
        })
    }
}

#[async_trait]
impl ChannelHistory for ScriptedGuild {
    async fn guilds(&self) -> Result<Vec<GuildId>, GatewayError> {
        Ok(vec![GUILD])
    }

    async fn text_channels(&self, _guild_id: GuildId) -> Result<Vec<ChannelId>, GatewayError> {
        Ok(vec![SPAWN_CHANNEL])
    }

    async fn recent_messages(
        &self,
        channel_id: ChannelId,
        _limit: usize,
    ) -> Result<Vec<InboundMessage>, GatewayError> {
        Err(GatewayError::PermissionDenied(format!("channel {channel_id}")))
    }
}

/// Plays the gateway's part for queued effects: notices get fresh message ids
/// that are reported back to the runtime.
#[derive(Default)]
struct EffectLog {
    applied: Mutex<Vec<GatewayEffect>>,
    notices: Mutex<Vec<MessageId>>,
}

impl EffectLog {
    fn pump(&self, rx: &mut EffectReceiver, runtime: &LockerRuntime) {
        while let Ok(effect) = rx.try_recv() {
            if let GatewayEffect::PostReleaseNotice {
                channel_id,
                episode,
                ..
            } = &effect
            {
                let notice_id = MessageId::new(NOTICE_IDS.fetch_add(1, Ordering::Relaxed));
                runtime.on_release_notice_posted(*channel_id, *episode, notice_id);
                self.notices.lock().expect("notices lock").push(notice_id);
            }
            self.applied.lock().expect("applied lock").push(effect);
        }
    }

    fn take(&self) -> Vec<GatewayEffect> {
        std::mem::take(&mut *self.applied.lock().expect("applied lock"))
    }

    fn last_notice(&self) -> MessageId {
        *self
            .notices
            .lock()
            .expect("notices lock")
            .last()
            .expect("a notice was posted")
    }
}

fn start_runtime(root: &Path, members: Vec<MemberProfile>) -> (LockerRuntime, EffectReceiver) {
    let guild = Arc::new(ScriptedGuild { members });
    let (effects, rx) = EffectSink::channel();
    let config = LockerConfig {
        log_channel_id: Some(LOG_CHANNEL),
        catch_log_channel_id: Some(CATCH_LOG_CHANNEL),
        catch_data_path: root.join("catch_data.json"),
        ..LockerConfig::default()
    };
    let runtime = LockerRuntime::new(
        config,
        effects,
        Arc::clone(&guild) as Arc<dyn MemberDirectory>,
        guild as Arc<dyn ChannelHistory>,
    )
    .expect("runtime should build");
    (runtime, rx)
}

fn monitored_ping(id: u64, target: &MemberProfile) -> InboundMessage {
    InboundMessage {
        id: MessageId::new(id),
        guild_id: Some(GUILD),
        channel_id: SPAWN_CHANNEL,
        author: MemberProfile {
            bot: true,
            ..MemberProfile::new(UserId::new(DEFAULT_MONITORED_BOT_ID), "P2 Assistant")
        },
        mentions: vec![target.clone()],
        content: format!("{} a wild pokémon appeared", target.id.mention()),
        embeds: Vec::new(),
    }
}

fn catch_notice(id: u64, content: &str) -> InboundMessage {
    InboundMessage {
        id: MessageId::new(id),
        guild_id: Some(GUILD),
        channel_id: SPAWN_CHANNEL,
        author: MemberProfile {
            bot: true,
            ..MemberProfile::new(UserId::new(DEFAULT_GAME_BOT_ID), "Pokétwo")
        },
        mentions: Vec::new(),
        content: content.to_string(),
        embeds: Vec::new(),
    }
}

fn release_reaction(message_id: MessageId, user_id: UserId) -> ReactionEvent {
    ReactionEvent {
        guild_id: Some(GUILD),
        channel_id: SPAWN_CHANNEL,
        message_id,
        user_id,
        user_is_bot: false,
        emoji: "🔓".to_string(),
    }
}

fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap()
}

#[tokio::test]
async fn integration_relock_invalidates_old_notice_until_latest_is_reacted() {
    let workspace = IsolatedWorkspace::new("relock");
    let ash = MemberProfile::new(UserId::new(7), "ash");
    let (runtime, mut rx) = start_runtime(workspace.root(), vec![ash.clone()]);
    let effects = EffectLog::default();

    runtime
        .on_message_at(&monitored_ping(1, &ash), morning())
        .await;
    effects.pump(&mut rx, &runtime);
    let first_notice = effects.last_notice();

    runtime
        .on_message_at(&monitored_ping(2, &ash), morning() + TimeDelta::minutes(5))
        .await;
    effects.pump(&mut rx, &runtime);
    let second_notice = effects.last_notice();
    assert_ne!(first_notice, second_notice);
    effects.take();

    assert!(!runtime.on_reaction_add(&release_reaction(first_notice, ash.id)));
    assert!(runtime.locks().is_locked(SPAWN_CHANNEL));

    assert!(runtime.on_reaction_add(&release_reaction(second_notice, ash.id)));
    effects.pump(&mut rx, &runtime);
    assert_eq!(
        effects.take(),
        vec![
            GatewayEffect::SetSendPermission {
                channel_id: SPAWN_CHANNEL,
                permission: SendPermission::Inherit,
            },
            GatewayEffect::SendText {
                channel_id: SPAWN_CHANNEL,
                content: "🔓 Channel unlocked! (reaction by <@7>)".to_string(),
            },
            GatewayEffect::SendText {
                channel_id: LOG_CHANNEL,
                content: format!("🔓 {} unlocked (reaction by <@7>).", SPAWN_CHANNEL.mention()),
            },
        ]
    );

    // A second reaction on the same notice is a no-op.
    assert!(!runtime.on_reaction_add(&release_reaction(second_notice, ash.id)));
}

#[tokio::test]
async fn integration_timer_tick_expires_lock_after_full_duration() {
    let workspace = IsolatedWorkspace::new("expiry");
    let ash = MemberProfile::new(UserId::new(7), "ash");
    let (runtime, mut rx) = start_runtime(workspace.root(), vec![ash.clone()]);
    let effects = EffectLog::default();

    runtime
        .on_message_at(&monitored_ping(1, &ash), morning())
        .await;
    effects.pump(&mut rx, &runtime);
    effects.take();

    let early = run_timer_tick(
        runtime.locks(),
        runtime.store(),
        morning() + TimeDelta::hours(23),
    );
    assert!(early.unlocked.is_empty());

    let expired = run_timer_tick(
        runtime.locks(),
        runtime.store(),
        morning() + TimeDelta::hours(24),
    );
    assert_eq!(expired.unlocked, vec![SPAWN_CHANNEL]);
    effects.pump(&mut rx, &runtime);
    let applied = effects.take();
    assert!(applied.contains(&GatewayEffect::SendText {
        channel_id: SPAWN_CHANNEL,
        content: "⏰ Auto-unlocked after 24 hours.".to_string(),
    }));
    assert!(applied.contains(&GatewayEffect::SendText {
        channel_id: LOG_CHANNEL,
        content: format!("🔓 {} unlocked (auto-timeout).", SPAWN_CHANNEL.mention()),
    }));
    assert!(!runtime.locks().is_locked(SPAWN_CHANNEL));
}

#[tokio::test]
async fn integration_catch_counts_survive_restart_and_roll_over_daily() {
    let workspace = IsolatedWorkspace::new("restart");
    let members = vec![
        MemberProfile::new(UserId::new(7), "ash").with_display_name("Ash"),
        MemberProfile::new(UserId::new(8), "misty"),
    ];

    {
        let (runtime, mut rx) = start_runtime(workspace.root(), members.clone());
        let effects = EffectLog::default();
        runtime
            .on_message_at(
                &catch_notice(1, "Congratulations <@7>! You caught a Level 5 Pidgey!"),
                morning(),
            )
            .await;
        runtime
            .on_message_at(
                &catch_notice(2, "Congratulations Misty! You caught a Level 9 Psyduck!"),
                morning(),
            )
            .await;
        runtime
            .on_message_at(
                &catch_notice(3, "Congratulations <@7>! You caught a Level 2 Rattata!"),
                morning(),
            )
            .await;
        // No catcher: not counted.
        runtime
            .on_message_at(
                &catch_notice(4, "Congratulations stranger! You caught a Level 1 Caterpie!"),
                morning(),
            )
            .await;
        effects.pump(&mut rx, &runtime);
        let catch_logs = effects
            .take()
            .into_iter()
            .filter(|effect| effect.channel_id() == CATCH_LOG_CHANNEL)
            .count();
        assert_eq!(catch_logs, 3);
    }

    let raw = fs::read_to_string(workspace.root().join("catch_data.json"))
        .expect("snapshot should be written through");
    let snapshot: Value = serde_json::from_str(&raw).expect("snapshot json");
    assert_eq!(snapshot["all_time"]["7"], 2);
    assert_eq!(snapshot["daily"]["8"], 1);

    let (runtime, _rx) = start_runtime(workspace.root(), members);
    let report = runtime
        .on_ready(UserId::new(424_242))
        .await
        .expect("ready");
    assert!(report.backfill.is_none());
    assert_eq!(runtime.store().counts(UserId::new(7)).all_time, 2);

    let rollover = run_timer_tick(
        runtime.locks(),
        runtime.store(),
        Utc::now() + TimeDelta::days(1),
    );
    assert!(rollover.daily_reset);
    let ash = runtime.store().counts(UserId::new(7));
    assert_eq!((ash.daily, ash.all_time), (0, 2));
    runtime.shutdown().await;
}
