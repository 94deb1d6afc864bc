use clap::{parser::ValueSource, ArgMatches, CommandFactory, FromArgMatches, Parser};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment, Provider,
};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::CookieSettings;
use crate::ws::RelayPolicy;

/// Chat server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "chat-server", version, about = "Chat server with WebSocket relay")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "CHAT_PORT", default_value = "5000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "CHAT_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./chat.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "CHAT_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for the SQLite database
    #[arg(long, env = "CHAT_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Browser origin allowed to call the API with credentials
    #[arg(long, env = "CHAT_ALLOWED_ORIGIN", default_value = "http://127.0.0.1:5500")]
    pub allowed_origin: String,

    /// Relay WebSocket payloads back to the client that sent them
    #[arg(long, env = "CHAT_ECHO_TO_SENDER", default_value_t = true, action = clap::ArgAction::Set)]
    pub echo_to_sender: bool,

    /// Mark session cookies Secure
    #[arg(long, env = "CHAT_COOKIE_SECURE", default_value_t = true, action = clap::ArgAction::Set)]
    pub cookie_secure: bool,

    /// Session cookie lifetime in hours
    #[arg(long, env = "CHAT_SESSION_MAX_AGE_HOURS", default_value = "24")]
    pub session_max_age_hours: i64,

    /// Scheduled message purge (loaded from [purge] section in TOML)
    #[arg(skip)]
    #[serde(default)]
    pub purge: Option<PurgeConfig>,
}

/// Configuration for the daily message purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeConfig {
    /// Whether the purge runs at all (default: true)
    #[serde(default = "default_purge_enabled")]
    pub enabled: bool,

    /// Hour of day, UTC, at which all messages are deleted (default: 0)
    #[serde(default)]
    pub hour_utc: u32,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour_utc: 0,
        }
    }
}

fn default_purge_enabled() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "0.0.0.0".to_string(),
            config: "./chat.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            allowed_origin: "http://127.0.0.1:5500".to_string(),
            echo_to_sender: true,
            cookie_secure: true,
            session_max_age_hours: 24,
            purge: None,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (CHAT_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let matches = Config::command().get_matches();
        let cli = Config::from_arg_matches(&matches)
            .map_err(|e| figment::Error::from(e.to_string()))?;

        let config: Config = Self::layered(Toml::file(&cli.config), &cli, &matches).extract()?;

        config.validate().map_err(figment::Error::from)?;
        Ok(config)
    }

    /// Only flags given on the command line sit above the file layer; clap's
    /// own defaults would otherwise shadow every TOML value.
    fn layered(file: impl Provider, cli: &Config, matches: &ArgMatches) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed("CHAT_"))
            .merge(Serialized::defaults(cli.explicit_args(matches)))
    }

    fn explicit_args(&self, matches: &ArgMatches) -> serde_json::Map<String, serde_json::Value> {
        let serde_json::Value::Object(all) = serde_json::to_value(self).unwrap_or_default() else {
            return serde_json::Map::new();
        };
        matches
            .ids()
            .map(|id| id.as_str())
            .filter(|id| matches.value_source(id) == Some(ValueSource::CommandLine))
            .filter_map(|id| all.get(id).map(|value| (id.to_string(), value.clone())))
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        let purge = self.purge_config();
        if purge.hour_utc > 23 {
            return Err(format!(
                "purge.hour_utc must be between 0 and 23, got {}",
                purge.hour_utc
            ));
        }
        if self.session_max_age_hours <= 0 {
            return Err("session_max_age_hours must be positive".to_string());
        }
        Ok(())
    }

    pub fn purge_config(&self) -> PurgeConfig {
        self.purge.clone().unwrap_or_default()
    }

    pub fn relay_policy(&self) -> RelayPolicy {
        if self.echo_to_sender {
            RelayPolicy::IncludeSender
        } else {
            RelayPolicy::ExcludeSender
        }
    }

    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            secure: self.cookie_secure,
            max_age_hours: self.session_max_age_hours,
        }
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Chat Server Configuration
# Place this file at ./chat.toml or specify with --config <path>
# All settings can be overridden via environment variables (CHAT_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 5000)
# port = 5000

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite database
# data_dir = "./data"

# Browser origin allowed to call the API with cookies (CORS)
# allowed_origin = "http://127.0.0.1:5500"

# Relay WebSocket payloads back to the sending client as well.
# Clients that render their own messages locally should set this to false.
# echo_to_sender = true

# Session cookies: Secure flag and lifetime
# cookie_secure = true
# session_max_age_hours = 24

# ---- Message Purge ----
# [purge]
# enabled = true
# hour_utc = 0  # Delete all messages daily at this UTC hour
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Config {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap()
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config = from_toml(&generate_config_template());
        assert_eq!(config.port, 5000);
        assert!(config.echo_to_sender);
        assert_eq!(config.purge_config(), PurgeConfig::default());
    }

    #[test]
    fn test_toml_overrides() {
        let config = from_toml(
            r#"
port = 6000
echo_to_sender = false

[purge]
hour_utc = 3
"#,
        );
        assert_eq!(config.port, 6000);
        assert_eq!(config.relay_policy(), RelayPolicy::ExcludeSender);
        assert_eq!(
            config.purge_config(),
            PurgeConfig {
                enabled: true,
                hour_utc: 3
            }
        );
        assert!(config.validate().is_ok());
    }

    fn layered_with_args(toml: &str, args: &[&str]) -> Config {
        let matches = Config::command().try_get_matches_from(args).unwrap();
        let cli = Config::from_arg_matches(&matches).unwrap();
        Config::layered(Toml::string(toml), &cli, &matches)
            .extract()
            .unwrap()
    }

    #[test]
    fn test_toml_survives_cli_defaults() {
        let config = layered_with_args(
            "echo_to_sender = false\nport = 6000\ndata_dir = \"/srv/chat\"\n",
            &["chat-server"],
        );
        assert_eq!(config.port, 6000);
        assert_eq!(config.data_dir, "/srv/chat");
        assert!(!config.echo_to_sender);
        assert_eq!(config.relay_policy(), RelayPolicy::ExcludeSender);
    }

    #[test]
    fn test_explicit_cli_flag_beats_toml() {
        let config = layered_with_args(
            "echo_to_sender = false\nport = 6000\n",
            &["chat-server", "--port", "7000", "--echo-to-sender", "true"],
        );
        assert_eq!(config.port, 7000);
        assert!(config.echo_to_sender);
    }

    #[test]
    fn test_invalid_purge_hour_rejected() {
        let config = from_toml("[purge]\nhour_utc = 24\n");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cookie_settings_follow_config() {
        let config = Config {
            cookie_secure: false,
            session_max_age_hours: 2,
            ..Config::default()
        };
        let cookies = config.cookie_settings();
        assert!(!cookies.secure);
        assert_eq!(cookies.max_age_hours, 2);
    }
}
