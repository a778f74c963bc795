//! Process configuration for mentionbot.
//!
//! Everything comes from environment variables, resolved once at startup
//! and immutable afterwards. Missing required variables fail loading with
//! an error naming the variable.

pub mod redact;
pub mod validation;

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    MissingVar { var: &'static str },

    #[error("invalid value for env var {var}: {message}")]
    InvalidVar { var: &'static str, message: String },
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub bind_address: String,
    /// HTTP server port.
    pub port: u16,
    /// Path the Events API webhook is mounted on.
    pub events_path: String,
    /// Bot User OAuth token (xoxb-...), used for the Web API.
    pub slack_oauth_token: String,
    /// Signing secret for inbound webhook verification.
    pub slack_signing_secret: String,
    /// The single channel the bot accepts commands in.
    pub slack_channel_id: String,
    /// Default log level when RUST_LOG is unset.
    pub log_level: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Load configuration from a provided variable map (useful for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| -> Result<String, ConfigError> {
            match vars.get(var) {
                Some(v) if !v.is_empty() => Ok(v.clone()),
                _ => Err(ConfigError::MissingVar { var }),
            }
        };

        let port = match vars.get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                var: "PORT",
                message: format!("not a port number: {raw:?}"),
            })?,
            None => 8080,
        };

        Ok(Self {
            bind_address: vars
                .get("MENTIONBOT_BIND")
                .cloned()
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            events_path: vars
                .get("SLACK_EVENTS_PATH")
                .cloned()
                .unwrap_or_else(|| "/slack/events".to_string()),
            slack_oauth_token: required("SLACK_OAUTH_TOKEN")?,
            slack_signing_secret: required("SLACK_SIGNING_SECRET")?,
            slack_channel_id: required("SLACK_CHANNEL_ID")?,
            log_level: vars
                .get("RUST_LOG")
                .cloned()
                .unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal() -> HashMap<String, String> {
        vars(&[
            ("SLACK_OAUTH_TOKEN", "xoxb-123-abc"),
            ("SLACK_SIGNING_SECRET", "8f742231b10e8888abcd99yyyzzz85a5"),
            ("SLACK_CHANNEL_ID", "C0123456789"),
        ])
    }

    #[test]
    fn loads_with_defaults() {
        let config = Config::from_vars(&minimal()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.events_path, "/slack/events");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.slack_channel_id, "C0123456789");
    }

    #[test]
    fn missing_required_var_names_it() {
        let mut v = minimal();
        v.remove("SLACK_SIGNING_SECRET");
        let err = Config::from_vars(&v).unwrap_err();
        assert!(err.to_string().contains("SLACK_SIGNING_SECRET"));
    }

    #[test]
    fn empty_required_var_is_missing() {
        let mut v = minimal();
        v.insert("SLACK_CHANNEL_ID".into(), String::new());
        assert!(matches!(
            Config::from_vars(&v),
            Err(ConfigError::MissingVar {
                var: "SLACK_CHANNEL_ID"
            })
        ));
    }

    #[test]
    fn overrides_apply() {
        let mut v = minimal();
        v.insert("PORT".into(), "9090".into());
        v.insert("MENTIONBOT_BIND".into(), "127.0.0.1".into());
        let config = Config::from_vars(&v).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.bind_address, "127.0.0.1");
    }

    #[test]
    fn unparseable_port_errors() {
        let mut v = minimal();
        v.insert("PORT".into(), "eighty".into());
        let err = Config::from_vars(&v).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { var: "PORT", .. }));
    }
}
