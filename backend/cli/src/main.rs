use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use mentionbot_config::{redact, validation, Config};
use mentionbot_gateway::{server, AppState, EventDispatcher, SignatureVerifier};
use mentionbot_slack::SlackClient;

#[derive(Parser)]
#[command(name = "mentionbot")]
#[command(about = "Slack mention-command bot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show health of a running instance
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("loading configuration from environment")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/healthz", config.port))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("mentionbot is not running on port {}", config.port);
                }
            }
            Ok(())
        }
    }
}

async fn run_server(config: Config) -> Result<()> {
    let report = validation::validate(&config);
    for finding in &report.warnings {
        warn!(field = %finding.field, "{}", finding.message);
    }
    if !report.is_valid() {
        for finding in &report.errors {
            tracing::error!(field = %finding.field, "{}", finding.message);
        }
        bail!("configuration is invalid, refusing to start");
    }

    info!(config = %redact::summary(&config), "starting mentionbot");

    // Resolve our own identity up front; the mention prefix is matched
    // against this user id for the lifetime of the process.
    let slack = Arc::new(SlackClient::new(config.slack_oauth_token.clone()));
    let identity = slack
        .auth_test()
        .await
        .context("resolving bot identity via auth.test")?;
    info!(
        user_id = %identity.user_id,
        user = %identity.user,
        team = %identity.team,
        "authenticated with Slack"
    );

    let state = AppState {
        verifier: Arc::new(SignatureVerifier::new(config.slack_signing_secret.clone())),
        dispatcher: Arc::new(EventDispatcher::new(
            slack,
            identity.user_id,
            config.slack_channel_id.clone(),
        )),
        started_at: Instant::now(),
    };

    server::run(&config.bind_address, config.port, &config.events_path, state).await
}
