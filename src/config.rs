//! Service configuration from the environment

use crate::runtime::RuntimeSettings;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const GRAPH_HOST: &str = "https://graph.facebook.com";
const DEFAULT_GRAPH_VERSION: &str = "v22.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 900;
const DEFAULT_ABANDON_TIMEOUT_SECS: u64 = 24 * 60 * 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Shared secret for the webhook subscription handshake
    pub verify_token: String,
    /// Bearer token for the Graph API
    pub whatsapp_token: String,
    pub phone_number_id: String,
    pub graph_api_version: String,
    pub db_path: PathBuf,
    pub port: u16,
    pub send_timeout: Duration,
    pub idle_timeout: Duration,
    pub abandon_timeout: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values and the literal `None` count
    /// as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && v != "None")
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let db_path = get("BOT_DB_PATH").map_or_else(
            || {
                let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".enquiry-bot").join("bot.db")
            },
            PathBuf::from,
        );

        Ok(Self {
            verify_token: required("VERIFY_TOKEN")?,
            whatsapp_token: required("WHATSAPP_TOKEN")?,
            phone_number_id: required("PHONE_NUMBER_ID")?,
            graph_api_version: get("GRAPH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_GRAPH_VERSION.to_string()),
            db_path,
            port: parse_or(get("BOT_PORT"), "BOT_PORT", DEFAULT_PORT)?,
            send_timeout: Duration::from_secs(parse_or(
                get("BOT_SEND_TIMEOUT_SECS"),
                "BOT_SEND_TIMEOUT_SECS",
                DEFAULT_SEND_TIMEOUT_SECS,
            )?),
            idle_timeout: Duration::from_secs(parse_or(
                get("BOT_IDLE_TIMEOUT_SECS"),
                "BOT_IDLE_TIMEOUT_SECS",
                DEFAULT_IDLE_TIMEOUT_SECS,
            )?),
            abandon_timeout: Duration::from_secs(parse_or(
                get("BOT_ABANDON_TIMEOUT_SECS"),
                "BOT_ABANDON_TIMEOUT_SECS",
                DEFAULT_ABANDON_TIMEOUT_SECS,
            )?),
        })
    }

    /// Messages endpoint of the configured phone number
    pub fn graph_url(&self) -> String {
        format!(
            "{GRAPH_HOST}/{}/{}/messages",
            self.graph_api_version, self.phone_number_id
        )
    }

    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            send_timeout: self.send_timeout,
            idle_timeout: self.idle_timeout,
            abandon_timeout: self.abandon_timeout,
            ..RuntimeSettings::default()
        }
    }
}

fn parse_or<V: std::str::FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: V,
) -> Result<V, ConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
