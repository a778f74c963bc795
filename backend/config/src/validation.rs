//! Config validation: shape checks with actionable messages, run once at
//! startup after loading.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::Config;

/// Channel IDs are `C…` (public) or `G…` (private/legacy group).
static CHANNEL_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[CG][A-Z0-9]{6,}$").unwrap());

/// A validation finding with the config field it concerns.
#[derive(Debug, Error)]
#[error("config field '{field}': {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// All errors and warnings found in one validation pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

/// Validate a loaded config and return every finding at once.
pub fn validate(config: &Config) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.port == 0 {
        report.error("port", "port must be non-zero");
    }

    if !config.events_path.starts_with('/') {
        report.error("events_path", "webhook path must start with '/'");
    }

    if config.slack_signing_secret.len() < 16 {
        report.error(
            "slack_signing_secret",
            "signing secret is implausibly short; check SLACK_SIGNING_SECRET",
        );
    }

    if !config.slack_oauth_token.starts_with("xox") {
        report.warn(
            "slack_oauth_token",
            "token does not look like a Slack OAuth token (expected xoxb-/xoxp- prefix)",
        );
    }

    if !CHANNEL_ID_PATTERN.is_match(&config.slack_channel_id) {
        report.warn(
            "slack_channel_id",
            "value does not look like a channel ID; did you paste a channel name?",
        );
    }

    report
}
