//! tsbeacon configuration
//!
//! One TOML file with four sections. Every field has a default except the
//! credentials and target channel, which are checked by `validate` before
//! anything connects. Secrets may come from the environment instead.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tsbeacon_bridge::{BridgeConfig, DisplayOptions, MIN_UPDATE_INTERVAL};
use tsbeacon_discord::{DiscordConfig, DEFAULT_API_BASE};
use tsbeacon_query::TeamSpeakConfig;

pub const ENV_TS_PASSWORD: &str = "TSBEACON_TS_PASSWORD";
pub const ENV_DISCORD_TOKEN: &str = "TSBEACON_DISCORD_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub teamspeak: TeamSpeakSection,
    pub discord: DiscordSection,
    pub display: DisplaySection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TeamSpeakSection {
    pub host: String,
    pub query_port: u16,
    pub username: String,
    pub password: String,
    pub server_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscordSection {
    pub token: String,
    pub channel_id: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplaySection {
    pub show_empty_channels: bool,
    pub update_interval_secs: u64,
    pub custom_footer: String,
    /// e.g. `ts-{online}-of-{max}`; empty disables renames.
    pub channel_name_format: String,
    pub thumbnail_url: String,
    pub server_info: ServerInfo,
}

/// Connect details shown to readers, not used to connect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerInfo {
    pub address: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
    /// Directory for a daily-rotated log file; empty logs to stdout only.
    pub file: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// ============================================================
// Defaults
// ============================================================

impl Default for TeamSpeakSection {
    fn default() -> Self {
        Self {
            host: String::new(),
            query_port: 10011,
            username: "serveradmin".into(),
            password: String::new(),
            server_id: 1,
        }
    }
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel_id: String::new(),
            api_base: DEFAULT_API_BASE.into(),
        }
    }
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            show_empty_channels: false,
            update_interval_secs: 30,
            custom_footer: String::new(),
            channel_name_format: String::new(),
            thumbnail_url: String::new(),
            server_info: ServerInfo::default(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
            file: String::new(),
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl Config {
    /// Read, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Non-empty values from `lookup` replace the file's secrets.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(password) = lookup(ENV_TS_PASSWORD).filter(|v| !v.is_empty()) {
            self.teamspeak.password = password;
        }
        if let Some(token) = lookup(ENV_DISCORD_TOKEN).filter(|v| !v.is_empty()) {
            self.discord.token = token;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("teamspeak.host", &self.teamspeak.host),
            ("teamspeak.password", &self.teamspeak.password),
            ("discord.token", &self.discord.token),
            ("discord.channel_id", &self.discord.channel_id),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} is required", key)));
            }
        }

        if self.update_interval() < MIN_UPDATE_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "display.update_interval_secs must be at least {}",
                MIN_UPDATE_INTERVAL.as_secs()
            )));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "logging.level {:?} is not a valid level",
                self.logging.level
            )));
        }

        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.display.update_interval_secs)
    }

    // ============================================================
    // Component configs
    // ============================================================

    pub fn teamspeak_config(&self) -> TeamSpeakConfig {
        TeamSpeakConfig {
            query_port: self.teamspeak.query_port,
            username: self.teamspeak.username.clone(),
            server_id: self.teamspeak.server_id,
            ..TeamSpeakConfig::new(&self.teamspeak.host, &self.teamspeak.password)
        }
    }

    pub fn discord_config(&self) -> DiscordConfig {
        DiscordConfig::new(&self.discord.token).with_api_base(&self.discord.api_base)
    }

    pub fn display_options(&self) -> DisplayOptions {
        let d = &self.display;
        DisplayOptions {
            show_empty_channels: d.show_empty_channels,
            server_address: non_empty(&d.server_info.address),
            server_password: non_empty(&d.server_info.password),
            custom_footer: non_empty(&d.custom_footer),
            channel_name_format: non_empty(&d.channel_name_format),
            thumbnail_url: non_empty(&d.thumbnail_url),
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            update_interval: self.update_interval(),
            channel_id: self.discord.channel_id.clone(),
            display: self.display_options(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
