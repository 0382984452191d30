use crate::delivery::{EnvelopeTemplate, DEFAULT_MAX_BLOCKS};
use crate::error::{Result, WatchError};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Complete watcher configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

/// Data source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub url: String,
}

fn default_source_url() -> String {
    "http://localhost:8080/api/cases".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
        }
    }
}

/// Slack webhook configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    /// Incoming webhook URL (required)
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_icon_emoji")]
    pub icon_emoji: String,
    /// Maximum blocks per delivered message
    #[serde(default = "default_max_blocks")]
    pub max_blocks: usize,
}

fn default_channel() -> String {
    "#covid-19".to_string()
}

fn default_username() -> String {
    "COVID-19".to_string()
}

fn default_icon_emoji() -> String {
    ":biohazard_sign:".to_string()
}

fn default_max_blocks() -> usize {
    DEFAULT_MAX_BLOCKS
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            channel: default_channel(),
            username: default_username(),
            icon_emoji: default_icon_emoji(),
            max_blocks: default_max_blocks(),
        }
    }
}

impl SlackConfig {
    pub fn envelope_template(&self) -> EnvelopeTemplate {
        EnvelopeTemplate {
            username: self.username.clone(),
            icon_emoji: self.icon_emoji.clone(),
            channel: self.channel.clone(),
        }
    }
}

/// State file configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("state.json.gz")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

/// Poll loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Sleep between cycles (seconds)
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

fn default_interval_seconds() -> u64 {
    60
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl WatchConfig {
    /// Build from env vars, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env()?;
        Ok(cfg)
    }

    /// Override fields with any environment variables that are set.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("SLACK_WEBHOOK_URL") {
            self.slack.webhook_url = v;
        }
        if let Ok(v) = std::env::var("SLACK_CHANNEL") {
            self.slack.channel = v;
        }
        if let Ok(v) = std::env::var("SLACK_USERNAME") {
            self.slack.username = v;
        }
        if let Ok(v) = std::env::var("SLACK_ICON_EMOJI") {
            self.slack.icon_emoji = v;
        }
        if let Ok(v) = std::env::var("CASEWATCH_SOURCE_URL") {
            self.source.url = v;
        }
        if let Ok(v) = std::env::var("CASEWATCH_STATE_FILE") {
            self.state.path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("CASEWATCH_POLL_INTERVAL_SECS") {
            self.poll.interval_seconds = v.parse().map_err(|_| {
                WatchError::Config(format!(
                    "CASEWATCH_POLL_INTERVAL_SECS must be a number of seconds, got '{}'",
                    v
                ))
            })?;
        }
        Ok(())
    }

    /// Reject configurations the watcher cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.slack.webhook_url.trim().is_empty() {
            return Err(WatchError::Config(
                "Slack webhook URL is required (set SLACK_WEBHOOK_URL)".to_string(),
            ));
        }
        if self.source.url.trim().is_empty() {
            return Err(WatchError::Config("source URL must not be empty".to_string()));
        }
        if self.poll.interval_seconds == 0 {
            return Err(WatchError::Config(
                "poll interval must be at least one second".to_string(),
            ));
        }
        if self.slack.max_blocks == 0 {
            return Err(WatchError::Config(
                "max_blocks must be at least one".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<WatchConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| WatchError::Config(format!("Failed to read {}: {}", path, e)))?;
    toml::from_str(&contents)
        .map_err(|e| WatchError::Config(format!("Failed to parse {}: {}", path, e)))
}
