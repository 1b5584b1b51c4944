//! site configuration, loaded from a JSON file

use crate::gateway::ReadinessPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// who receives whitelist requests, `npub1...` or hex
    pub admin: String,
    pub default_relays: Vec<String>,
    pub preset_relays: Vec<String>,
    pub site: SiteInfo,
    pub discussion: DiscussionPolicy,
    pub feed: FeedSettings,
    pub readiness: ReadinessSettings,
    /// per relay, for connecting, querying and publishing alike
    pub relay_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    pub domain: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionPolicy {
    /// only whitelisted users may post, and only their notes are shown
    pub require_whitelist: bool,
    pub allow_anonymous_viewing: bool,
    pub max_post_length: usize,
    pub enable_threads: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// `#t` values the feed is scoped to, also attached to every new post
    pub topics: Vec<String>,
    pub comment_topics: Vec<String>,
    pub post_lookback_days: u32,
    pub post_limit: usize,
    pub comment_limit: usize,
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessSettings {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin: "npub160t5zfxalddaccdc7xx30sentwa5lrr3rq4rtm38x99ynf8t0vwsvzyjc9".to_string(),
            default_relays: vec![
                "wss://relay.damus.io".to_string(),
                "wss://relay.primal.net".to_string(),
            ],
            preset_relays: Vec::new(),
            site: SiteInfo::default(),
            discussion: DiscussionPolicy::default(),
            feed: FeedSettings::default(),
            readiness: ReadinessSettings::default(),
            relay_timeout_ms: 5000,
        }
    }
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            domain: "shenandoahdatacenterfestival.com".to_string(),
            name: "Shenandoah Datacenter Festival".to_string(),
            description: "Where Silicon Meets Silo".to_string(),
        }
    }
}

impl Default for DiscussionPolicy {
    fn default() -> Self {
        Self {
            require_whitelist: true,
            allow_anonymous_viewing: true,
            max_post_length: 280,
            enable_threads: true,
        }
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            topics: vec![
                "frederick-county".to_string(),
                "agriculture".to_string(),
                "shenandoah-datacenter-festival".to_string(),
            ],
            comment_topics: vec!["frederick-county".to_string(), "agriculture".to_string()],
            post_lookback_days: 90,
            post_limit: 50,
            comment_limit: 50,
            refresh_interval_secs: 30,
        }
    }
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        let policy = ReadinessPolicy::default();
        Self {
            poll_interval_ms: policy.poll_interval.as_millis() as u64,
            max_attempts: policy.max_attempts,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// where the verified-users document lives
    pub fn whitelist_url(&self) -> String {
        format!("https://{}/.well-known/nostr.json", self.site.domain)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }

    pub fn readiness_policy(&self) -> ReadinessPolicy {
        ReadinessPolicy {
            poll_interval: Duration::from_millis(self.readiness.poll_interval_ms),
            max_attempts: self.readiness.max_attempts,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.feed.refresh_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.default_relays.len(), 2);
        assert!(cfg.discussion.require_whitelist);
        assert_eq!(cfg.discussion.max_post_length, 280);
        assert_eq!(cfg.feed.post_lookback_days, 90);
        assert_eq!(
            cfg.whitelist_url(),
            "https://shenandoahdatacenterfestival.com/.well-known/nostr.json"
        );
        assert_eq!(cfg.readiness_policy().max_attempts, 20);
        assert!(crate::nip19::parse_pubkey(&cfg.admin).is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = Config::from_json(
            r#"{
                "site": { "domain": "example.com" },
                "discussion": { "require_whitelist": false },
                "preset_relays": ["wss://nos.lol"]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.site.domain, "example.com");
        assert_eq!(cfg.site.name, "Shenandoah Datacenter Festival");
        assert!(!cfg.discussion.require_whitelist);
        assert!(cfg.discussion.enable_threads);
        assert_eq!(cfg.preset_relays, vec!["wss://nos.lol"]);
        assert_eq!(cfg.relay_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(Config::from_json("{"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            Config::from_file("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("festival-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"relay_timeout_ms": 1500}"#).unwrap();
        let cfg = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.relay_timeout(), Duration::from_millis(1500));
    }
}
