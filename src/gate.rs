//! Access checks run before any command or relay call.
//!
//! All checks are local and infallible: a `false` is the denial, and the
//! caller is responsible for telling the user and stopping.

use crate::cache::RoleCache;
use crate::config::Config;
use std::collections::HashSet;
use tracing::debug;

pub struct AccessGate {
    authorized_roles: HashSet<String>,
    allowed_channels: HashSet<u64>,
    forbidden_topics: Vec<String>,
    role_cache: RoleCache,
    /// Drop cached answers on member and role gateway events.
    follows_role_events: bool,
}

impl AccessGate {
    pub fn new(
        authorized_roles: impl IntoIterator<Item = String>,
        allowed_channels: impl IntoIterator<Item = u64>,
        forbidden_topics: impl IntoIterator<Item = String>,
        role_cache: RoleCache,
    ) -> Self {
        Self {
            authorized_roles: authorized_roles.into_iter().collect(),
            allowed_channels: allowed_channels.into_iter().collect(),
            forbidden_topics: forbidden_topics
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
            role_cache,
            follows_role_events: false,
        }
    }

    pub fn follow_role_events(mut self, enabled: bool) -> Self {
        self.follows_role_events = enabled;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.authorized_roles.iter().cloned(),
            config.allowed_channel_ids.iter().copied(),
            config.forbidden_topics.iter().cloned(),
            RoleCache::new(config.role_cache_capacity, config.role_cache_ttl),
        )
        .follow_role_events(config.role_cache_invalidate_on_events)
    }

    /// Whether the member holds at least one authorized role.
    ///
    /// The first answer per (member, guild) is cached; later calls return it
    /// even if `roles` has changed since, until the entry expires or is invalidated.
    pub fn is_authorized<I, R>(&self, member_id: u64, guild_id: u64, roles: I) -> bool
    where
        I: IntoIterator<Item = R>,
        R: ToString,
    {
        let key = (member_id, guild_id);
        if let Some(hit) = self.role_cache.get(key) {
            return hit;
        }

        let authorized = roles
            .into_iter()
            .any(|role| self.authorized_roles.contains(&role.to_string()));
        debug!(
            "Role check for member {} in guild {}: {}",
            member_id, guild_id, authorized
        );
        self.role_cache.insert(key, authorized);
        authorized
    }

    /// Command-level channel gate. An empty allow-list allows nothing.
    pub fn is_channel_allowed(&self, channel_id: u64) -> bool {
        self.allowed_channels.contains(&channel_id)
    }

    pub fn contains_forbidden_topic(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.forbidden_topics
            .iter()
            .any(|topic| text.contains(topic.as_str()))
    }

    pub fn invalidate(&self, member_id: u64, guild_id: u64) {
        if self.role_cache.invalidate((member_id, guild_id)) {
            debug!(
                "Invalidated role cache for member {} in guild {}",
                member_id, guild_id
            );
        }
    }

    pub fn invalidate_guild(&self, guild_id: u64) {
        let removed = self.role_cache.invalidate_guild(guild_id);
        if removed > 0 {
            debug!("Invalidated {} role cache entries in guild {}", removed, guild_id);
        }
    }

    /// A member's roles changed or they left the guild.
    /// Ignored unless role events are followed; the cached answer then stays.
    pub fn on_member_changed(&self, member_id: u64, guild_id: u64) {
        if self.follows_role_events {
            self.invalidate(member_id, guild_id);
        }
    }

    pub fn on_role_deleted(&self, guild_id: u64) {
        if self.follows_role_events {
            self.invalidate_guild(guild_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FORBIDDEN_TOPICS;

    fn gate(roles: &[&str], channels: &[u64]) -> AccessGate {
        AccessGate::new(
            roles.iter().map(|r| r.to_string()),
            channels.iter().copied(),
            FORBIDDEN_TOPICS.iter().map(|t| t.to_string()),
            RoleCache::new(100, None),
        )
    }

    #[test]
    fn test_authorization_is_cached_and_stale() {
        let gate = gate(&["42"], &[]);
        let mut roles = vec![7u64, 42];

        assert!(gate.is_authorized(1, 9, &roles));

        // Roles revoked after the first check: cached answer still wins.
        roles.clear();
        assert!(gate.is_authorized(1, 9, &roles));
        assert!(gate.is_authorized(1, 9, &roles));

        // Same member in another guild is computed separately.
        assert!(!gate.is_authorized(1, 10, &roles));

        // Until explicitly invalidated.
        gate.invalidate(1, 9);
        assert!(!gate.is_authorized(1, 9, &roles));
    }

    #[test]
    fn test_unauthorized_is_cached_too() {
        let gate = gate(&["42"], &[]);
        assert!(!gate.is_authorized(5, 9, [1u64, 2]));
        assert!(!gate.is_authorized(5, 9, [42u64]));

        gate.invalidate_guild(9);
        assert!(gate.is_authorized(5, 9, [42u64]));
    }

    #[test]
    fn test_no_authorized_roles_denies_everyone() {
        let gate = gate(&[], &[]);
        assert!(!gate.is_authorized(1, 1, [1u64, 2, 3]));
    }

    #[test]
    fn test_channel_gate_with_empty_allow_list() {
        let gate = gate(&[], &[]);
        for channel in [0, 1, 123_456_789, u64::MAX] {
            assert!(!gate.is_channel_allowed(channel));
        }
    }

    #[test]
    fn test_channel_gate_with_allow_list() {
        let gate = gate(&[], &[100, 200]);
        assert!(gate.is_channel_allowed(100));
        assert!(gate.is_channel_allowed(200));
        assert!(!gate.is_channel_allowed(300));
    }

    #[test]
    fn test_role_events_ignored_by_default() {
        let gate = gate(&["42"], &[]);
        assert!(gate.is_authorized(1, 9, [42u64]));

        gate.on_member_changed(1, 9);
        gate.on_role_deleted(9);
        // Roles were revoked, but the first answer is kept.
        assert!(gate.is_authorized(1, 9, Vec::<u64>::new()));
    }

    #[test]
    fn test_followed_role_events_invalidate() {
        let gate = gate(&["42"], &[]).follow_role_events(true);
        assert!(gate.is_authorized(1, 9, [42u64]));
        assert!(gate.is_authorized(2, 9, [42u64]));

        gate.on_member_changed(1, 9);
        assert!(!gate.is_authorized(1, 9, Vec::<u64>::new()));
        assert!(gate.is_authorized(2, 9, Vec::<u64>::new()));

        gate.on_role_deleted(9);
        assert!(!gate.is_authorized(2, 9, Vec::<u64>::new()));
    }

    #[test]
    fn test_forbidden_topics() {
        let gate = gate(&[], &[]);
        assert!(gate.contains_forbidden_topic("!q tell me about DRUGS"));
        assert!(gate.contains_forbidden_topic("Nonviolence works"));
        assert!(gate.contains_forbidden_topic("what is HATE SPEECH?"));
        // Embedded inside a longer word still matches.
        assert!(gate.contains_forbidden_topic("Essex is a county"));
        assert!(!gate.contains_forbidden_topic("!q What is 2+2?"));
        assert!(!gate.contains_forbidden_topic(""));
    }
}
