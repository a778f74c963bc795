//! Slack Web API client.
//!
//! Two calls only: `auth.test` to resolve the bot's own identity at
//! startup, and `chat.postMessage` to send Block Kit messages. Slack
//! returns HTTP 200 with `"ok": false` on application-level failures, so
//! both the transport status and the response envelope are checked.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use mentionbot_core::{Block, MessageReceipt, MessageSender, SendError};

const AUTH_TEST_URL: &str = "https://slack.com/api/auth.test";
const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("slack api error: {0}")]
    Api(String),
}

/// The bot's own identity, from `auth.test`.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub user_id: String,
    pub user: String,
    pub team: String,
}

#[derive(Deserialize)]
struct AuthTestResponse {
    ok: bool,
    error: Option<String>,
    user_id: Option<String>,
    #[serde(default)]
    user: String,
    #[serde(default)]
    team: String,
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    blocks: &'a [Block],
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    ts: String,
}

pub struct SlackClient {
    http: Client,
    bot_token: String,
}

impl SlackClient {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            bot_token: bot_token.into(),
        }
    }

    /// Resolve the identity behind the configured token.
    ///
    /// The returned `user_id` is what mention prefixes are matched
    /// against, so startup must not proceed if this fails.
    pub async fn auth_test(&self) -> Result<AuthIdentity, SlackError> {
        let resp: AuthTestResponse = self
            .http
            .post(AUTH_TEST_URL)
            .bearer_auth(&self.bot_token)
            .send()
            .await?
            .json()
            .await?;

        if !resp.ok {
            return Err(SlackError::Api(
                resp.error.unwrap_or_else(|| "unknown auth.test failure".into()),
            ));
        }
        let user_id = resp
            .user_id
            .ok_or_else(|| SlackError::Api("auth.test response missing user_id".into()))?;

        Ok(AuthIdentity {
            user_id,
            user: resp.user,
            team: resp.team,
        })
    }

    /// Post a Block Kit message to a channel.
    pub async fn post_message(
        &self,
        channel: &str,
        blocks: &[Block],
    ) -> Result<MessageReceipt, SlackError> {
        let body = PostMessageRequest { channel, blocks };
        let resp: PostMessageResponse = self
            .http
            .post(POST_MESSAGE_URL)
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !resp.ok {
            let reason = resp.error.unwrap_or_else(|| "unknown postMessage failure".into());
            error!(channel, error = %reason, "chat.postMessage rejected");
            return Err(SlackError::Api(reason));
        }

        debug!(channel = %resp.channel, ts = %resp.ts, "message sent");
        Ok(MessageReceipt {
            channel: resp.channel,
            ts: resp.ts,
        })
    }
}

#[async_trait]
impl MessageSender for SlackClient {
    async fn send_blocks(
        &self,
        channel: &str,
        blocks: &[Block],
    ) -> Result<MessageReceipt, SendError> {
        self.post_message(channel, blocks).await.map_err(|e| match e {
            SlackError::Http(err) => SendError::Transport(anyhow::Error::new(err)),
            SlackError::Api(reason) => SendError::Api(reason),
        })
    }
}
