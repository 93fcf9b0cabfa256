//! Maps a catch notification onto the member who made the catch.

use async_trait::async_trait;
use locker_core::{GatewayError, GuildId, MemberPermissions, MemberProfile, UserId};

use crate::catch_text::{extract_fallback_name, extract_identity_hint};

#[async_trait]
/// Member lookups served by the message gateway.
pub trait MemberDirectory: Send + Sync {
    /// Local cache lookup; never touches the network.
    fn cached_member(&self, guild_id: GuildId, user_id: UserId) -> Option<MemberProfile>;

    async fn fetch_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<MemberProfile, GatewayError>;

    /// Every member of the guild in the directory's native order.
    async fn list_members(&self, guild_id: GuildId) -> Result<Vec<MemberProfile>, GatewayError>;

    async fn member_permissions(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<MemberPermissions, GatewayError>;
}

/// Cache first, remote fetch on miss.
pub async fn lookup_member(
    directory: &dyn MemberDirectory,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<MemberProfile, GatewayError> {
    if let Some(member) = directory.cached_member(guild_id, user_id) {
        return Ok(member);
    }
    directory.fetch_member(guild_id, user_id).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    DirectMention,
    Reference,
    FallbackName,
}

impl ResolutionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectMention => "direct_mention",
            Self::Reference => "reference",
            Self::FallbackName => "fallback_name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatcherResolution {
    Resolved {
        member: MemberProfile,
        source: ResolutionSource,
    },
    Unresolved,
}

impl CatcherResolution {
    pub fn member(&self) -> Option<&MemberProfile> {
        match self {
            Self::Resolved { member, .. } => Some(member),
            Self::Unresolved => None,
        }
    }
}

/// Resolves the catcher in priority order: a member mentioned by the event
/// itself, a `<@id>` reference inside `text`, then a "Congratulations <name>"
/// match against the guild's member list (first match in directory order).
/// A reference that fails to resolve does not fall through to name matching.
pub async fn resolve_catcher(
    directory: &dyn MemberDirectory,
    guild_id: Option<GuildId>,
    direct_mention: Option<&MemberProfile>,
    text: &str,
) -> CatcherResolution {
    if let Some(member) = direct_mention {
        return CatcherResolution::Resolved {
            member: member.clone(),
            source: ResolutionSource::DirectMention,
        };
    }
    let Some(guild_id) = guild_id else {
        return CatcherResolution::Unresolved;
    };

    if let Some(user_id) = extract_identity_hint(text) {
        return match lookup_member(directory, guild_id, user_id).await {
            Ok(member) => CatcherResolution::Resolved {
                member,
                source: ResolutionSource::Reference,
            },
            Err(error) => {
                tracing::debug!(
                    guild_id = %guild_id,
                    user_id = %user_id,
                    %error,
                    "catch reference did not resolve to a member"
                );
                CatcherResolution::Unresolved
            }
        };
    }

    let Some(name) = extract_fallback_name(text) else {
        return CatcherResolution::Unresolved;
    };
    match directory.list_members(guild_id).await {
        Ok(members) => members
            .into_iter()
            .find(|member| member.matches_name(&name))
            .map(|member| CatcherResolution::Resolved {
                member,
                source: ResolutionSource::FallbackName,
            })
            .unwrap_or(CatcherResolution::Unresolved),
        Err(error) => {
            tracing::debug!(
                guild_id = %guild_id,
                name = %name,
                %error,
                "member list unavailable for catch name lookup"
            );
            CatcherResolution::Unresolved
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use super::*;

    #[derive(Default)]
    pub(crate) struct ScriptedDirectory {
        pub(crate) cached: Mutex<HashMap<UserId, MemberProfile>>,
        pub(crate) remote: Mutex<HashMap<UserId, MemberProfile>>,
        pub(crate) members: Vec<MemberProfile>,
        pub(crate) fetch_calls: AtomicUsize,
    }

    #[async_trait]
    impl MemberDirectory for ScriptedDirectory {
        fn cached_member(&self, _guild_id: GuildId, user_id: UserId) -> Option<MemberProfile> {
            self.cached.lock().expect("cache lock").get(&user_id).cloned()
        }

        async fn fetch_member(
            &self,
            _guild_id: GuildId,
            user_id: UserId,
        ) -> Result<MemberProfile, GatewayError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.remote
                .lock()
                .expect("remote lock")
                .get(&user_id)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound(format!("member {user_id}")))
        }

        async fn list_members(
            &self,
            _guild_id: GuildId,
        ) -> Result<Vec<MemberProfile>, GatewayError> {
            Ok(self.members.clone())
        }

        async fn member_permissions(
            &self,
            _guild_id: GuildId,
            _user_id: UserId,
        ) -> Result<MemberPermissions, GatewayError> {
            Ok(MemberPermissions::default())
        }
    }

    const GUILD: GuildId = GuildId::new(1);

    #[tokio::test]
    async fn unit_direct_mention_wins_over_text_hints() {
        let directory = ScriptedDirectory::default();
        let mentioned = MemberProfile::new(UserId::new(5), "ash");
        let resolution = resolve_catcher(
            &directory,
            Some(GUILD),
            Some(&mentioned),
            "Congratulations <@6>! You caught a Pidgey",
        )
        .await;
        assert_eq!(
            resolution,
            CatcherResolution::Resolved {
                member: mentioned,
                source: ResolutionSource::DirectMention,
            }
        );
        assert_eq!(directory.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn functional_reference_uses_cache_before_remote_fetch() {
        let directory = ScriptedDirectory::default();
        directory
            .cached
            .lock()
            .expect("cache lock")
            .insert(UserId::new(6), MemberProfile::new(UserId::new(6), "brock"));
        directory
            .remote
            .lock()
            .expect("remote lock")
            .insert(UserId::new(7), MemberProfile::new(UserId::new(7), "misty"));

        let cached = resolve_catcher(&directory, Some(GUILD), None, "well done <@6>").await;
        assert_eq!(cached.member().map(|member| member.id), Some(UserId::new(6)));
        assert_eq!(directory.fetch_calls.load(Ordering::SeqCst), 0);

        let fetched = resolve_catcher(&directory, Some(GUILD), None, "well done <@!7>").await;
        assert_eq!(fetched.member().map(|member| member.id), Some(UserId::new(7)));
        assert_eq!(directory.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn regression_failed_reference_does_not_fall_back_to_name() {
        let directory = ScriptedDirectory {
            members: vec![MemberProfile::new(UserId::new(8), "gary")],
            ..ScriptedDirectory::default()
        };
        let resolution = resolve_catcher(
            &directory,
            Some(GUILD),
            None,
            "Congratulations gary <@404>!",
        )
        .await;
        assert_eq!(resolution, CatcherResolution::Unresolved);
    }

    #[tokio::test]
    async fn functional_fallback_name_matches_first_member_case_insensitively() {
        let directory = ScriptedDirectory {
            members: vec![
                MemberProfile::new(UserId::new(10), "trainer").with_display_name("Red"),
                MemberProfile::new(UserId::new(11), "red"),
            ],
            ..ScriptedDirectory::default()
        };
        let resolution = resolve_catcher(
            &directory,
            Some(GUILD),
            None,
            "Congratulations RED! You caught a Level 9 Magikarp",
        )
        .await;
        assert_eq!(
            resolution,
            CatcherResolution::Resolved {
                member: directory.members[0].clone(),
                source: ResolutionSource::FallbackName,
            }
        );
    }

    #[tokio::test]
    async fn unit_unresolved_without_guild_or_hints() {
        let directory = ScriptedDirectory::default();
        assert_eq!(
            resolve_catcher(&directory, None, None, "Congratulations red <@1>").await,
            CatcherResolution::Unresolved
        );
        assert_eq!(
            resolve_catcher(&directory, Some(GUILD), None, "You caught a Level 5 Pikachu!").await,
            CatcherResolution::Unresolved
        );
    }
}
