use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Topics the `!q` relay refuses to forward. Matched as case-insensitive substrings.
pub const FORBIDDEN_TOPICS: &[&str] = &[
    "politics",
    "violence",
    "drugs",
    "hate speech",
    "sex",
    "racism",
];

pub const DEFAULT_RELAY_MODEL: &str = "llama-3.1-405b-instruct";

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub relay_url: Option<String>,
    pub relay_api_key: Option<String>,
    pub relay_model: String,
    /// 0 means "no log channel"
    pub log_channel_id: u64,
    pub allowed_channel_ids: Vec<u64>,
    pub authorized_roles: Vec<String>,
    pub forbidden_topics: Vec<String>,
    pub meme_dir: PathBuf,
    // Role authorization cache
    pub role_cache_ttl: Option<Duration>,
    pub role_cache_capacity: usize,
    /// Drop cached role answers on member and role gateway events
    pub role_cache_invalidate_on_events: bool,
    pub status_message: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            relay_url: non_empty_var("ZUKI_API_URL"),
            relay_api_key: non_empty_var("ZUKI_API_KEY"),
            relay_model: env::var("RELAY_MODEL")
                .unwrap_or_else(|_| DEFAULT_RELAY_MODEL.to_string()),
            log_channel_id: env::var("LOG_CHANNEL_ID")
                .unwrap_or_else(|_| "0".to_string())
                .trim()
                .parse()
                .unwrap_or(0),
            allowed_channel_ids: parse_channel_ids(
                &env::var("ALLOWED_CHANNEL_IDS").unwrap_or_default(),
            ),
            authorized_roles: parse_role_ids(&env::var("AUTHORIZED_ROLES").unwrap_or_default()),
            forbidden_topics: FORBIDDEN_TOPICS.iter().map(|t| t.to_string()).collect(),
            meme_dir: env::var("MEME_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            role_cache_ttl: match non_empty_var("ROLE_CACHE_TTL") {
                Some(raw) => Some(
                    humantime::parse_duration(raw.trim())
                        .map_err(|e| anyhow::anyhow!("ROLE_CACHE_TTL is not a duration: {}", e))?,
                ),
                None => None,
            },
            role_cache_capacity: env::var("ROLE_CACHE_CAPACITY")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .unwrap_or(10_000),
            role_cache_invalidate_on_events: env::var("ROLE_CACHE_INVALIDATE_ON_EVENTS")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "Your commands".to_string()),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a comma-separated list of channel ids, skipping blanks and garbage.
pub fn parse_channel_ids(raw: &str) -> Vec<u64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Ignoring invalid channel id in ALLOWED_CHANNEL_IDS: {:?}", s);
                None
            }
        })
        .collect()
}

pub fn parse_role_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("relay_url", &self.relay_url)
            .field(
                "relay_api_key",
                &self.relay_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("relay_model", &self.relay_model)
            .field("log_channel_id", &self.log_channel_id)
            .field("allowed_channel_ids", &self.allowed_channel_ids)
            .field("authorized_roles", &self.authorized_roles)
            .field("forbidden_topics", &self.forbidden_topics)
            .field("meme_dir", &self.meme_dir)
            .field("role_cache_ttl", &self.role_cache_ttl)
            .field("role_cache_capacity", &self.role_cache_capacity)
            .field(
                "role_cache_invalidate_on_events",
                &self.role_cache_invalidate_on_events,
            )
            .field("status_message", &self.status_message)
            .finish()
    }
}

/// Discord message limit is 2000 characters
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_list_parsing() {
        assert_eq!(parse_channel_ids(""), Vec::<u64>::new());
        assert_eq!(parse_channel_ids("1, 2,,x,3"), vec![1, 2, 3]);
        assert_eq!(parse_role_ids(""), Vec::<String>::new());
        assert_eq!(parse_role_ids("10, 20 ,"), vec!["10", "20"]);
    }

    #[test]
    fn test_config_logic() {
        // 1. Missing token
        env::remove_var("DISCORD_TOKEN");
        assert!(Config::build().is_err(), "Should fail without a token");

        // 2. Defaults
        env::set_var("DISCORD_TOKEN", "test_token");
        env::remove_var("ZUKI_API_URL");
        env::remove_var("RELAY_MODEL");
        env::remove_var("LOG_CHANNEL_ID");
        env::remove_var("ALLOWED_CHANNEL_IDS");
        env::remove_var("AUTHORIZED_ROLES");
        env::remove_var("ROLE_CACHE_TTL");
        env::remove_var("ROLE_CACHE_INVALIDATE_ON_EVENTS");
        let config = Config::build().unwrap();
        assert_eq!(config.discord_token, "test_token");
        assert_eq!(config.relay_url, None);
        assert_eq!(config.relay_model, DEFAULT_RELAY_MODEL);
        assert_eq!(config.log_channel_id, 0);
        assert!(config.allowed_channel_ids.is_empty());
        assert!(config.authorized_roles.is_empty());
        assert_eq!(config.forbidden_topics.len(), FORBIDDEN_TOPICS.len());
        assert_eq!(config.role_cache_ttl, None);
        assert!(!config.role_cache_invalidate_on_events);

        // 3. Overrides, including a garbage log channel
        env::set_var("LOG_CHANNEL_ID", "not-a-number");
        env::set_var("ALLOWED_CHANNEL_IDS", "111,222");
        env::set_var("AUTHORIZED_ROLES", "333");
        env::set_var("ROLE_CACHE_TTL", "10m");
        env::set_var("ROLE_CACHE_INVALIDATE_ON_EVENTS", "True");
        let config = Config::build().unwrap();
        assert_eq!(config.log_channel_id, 0);
        assert_eq!(config.allowed_channel_ids, vec![111, 222]);
        assert_eq!(config.authorized_roles, vec!["333"]);
        assert_eq!(config.role_cache_ttl, Some(Duration::from_secs(600)));
        assert!(config.role_cache_invalidate_on_events);

        // 4. Debug redaction
        env::set_var("ZUKI_API_KEY", "secret_api_key");
        let debug_output = format!("{:?}", Config::build().unwrap());
        assert!(!debug_output.contains("test_token"));
        assert!(!debug_output.contains("secret_api_key"));
        assert!(debug_output.contains("[REDACTED]"));

        // Cleanup
        for key in [
            "DISCORD_TOKEN",
            "ZUKI_API_KEY",
            "LOG_CHANNEL_ID",
            "ALLOWED_CHANNEL_IDS",
            "AUTHORIZED_ROLES",
            "ROLE_CACHE_TTL",
            "ROLE_CACHE_INVALIDATE_ON_EVENTS",
        ] {
            env::remove_var(key);
        }
    }
}
