//! Event dispatcher.
//!
//! Classifies verified Events API deliveries and routes the one event
//! kind this bot acts on. Every path ends in exactly one status code.
//! Unrecognized event shapes are acknowledged with 200; a non-2xx would
//! make the platform redeliver them forever.

use std::sync::Arc;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, info, warn};

use mentionbot_core::{AppMentionEvent, Block, EventEnvelope, InnerEvent, MessageSender, SendError};

/// Routes verified deliveries. Holds the bot's identity and the single
/// authorized channel, both immutable after construction, so one
/// instance serves all in-flight requests without locking.
pub struct EventDispatcher {
    sender: Arc<dyn MessageSender>,
    bot_user_id: String,
    channel_id: String,
}

impl EventDispatcher {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        bot_user_id: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            bot_user_id: bot_user_id.into(),
            channel_id: channel_id.into(),
        }
    }

    /// Classify an already-verified body and produce the HTTP response.
    pub async fn dispatch(&self, body: &[u8]) -> Response {
        let envelope: EventEnvelope = match serde_json::from_slice(body) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "undecodable event envelope");
                return (StatusCode::BAD_REQUEST, "bad_json").into_response();
            }
        };

        match envelope {
            EventEnvelope::UrlVerification { challenge } => {
                info!("answering url_verification challenge");
                ([(header::CONTENT_TYPE, "text/plain")], challenge).into_response()
            }
            EventEnvelope::EventCallback { event } => self.handle_callback(event).await,
            EventEnvelope::Unknown => {
                info!("ignoring unrecognized envelope type");
                (StatusCode::OK, "ignored").into_response()
            }
        }
    }

    async fn handle_callback(&self, event: InnerEvent) -> Response {
        match event {
            InnerEvent::AppMention(mention) => match self.handle_app_mention(mention).await {
                Ok(()) => (StatusCode::OK, "ok").into_response(),
                Err(err) => {
                    error!(error = %err, "app_mention handler failed");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            },
            InnerEvent::Unknown => {
                debug!("ignoring unrecognized inner event type");
                (StatusCode::OK, "ignored").into_response()
            }
        }
    }

    /// Act on a mention of the bot.
    ///
    /// The bot is notified of every message in channels it belongs to
    /// that mentions it; only messages addressed to it with a leading
    /// `<@bot> ` token are commands. Everything else is ignored
    /// without error.
    async fn handle_app_mention(&self, event: AppMentionEvent) -> Result<(), SendError> {
        let prefix = format!("<@{}> ", self.bot_user_id);
        let Some(command) = event.text.strip_prefix(prefix.as_str()) else {
            debug!(channel = %event.channel, "mention is not a command, ignoring");
            return Ok(());
        };

        if event.channel != self.channel_id {
            // Warn in the channel where the mention happened, so the
            // user learns why nothing was executed.
            warn!(
                channel = %event.channel,
                user = %event.user,
                "command issued outside the authorized channel"
            );
            let blocks = [Block::section(format!(
                ":warning: Please use this bot in <#{}>.",
                self.channel_id
            ))];
            self.sender.send_blocks(&event.channel, &blocks).await?;
            return Ok(());
        }

        let blocks = [Block::section(format!(
            "<@{}> You said `{command}`",
            event.user
        ))];
        let receipt = self.sender.send_blocks(&event.channel, &blocks).await?;
        info!(channel = %receipt.channel, ts = %receipt.ts, "replied to command");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use mentionbot_core::MessageReceipt;
    use tokio::sync::Mutex;

    /// Records every send; optionally fails them all.
    pub(crate) struct RecordingSender {
        pub calls: Mutex<Vec<(String, String)>>,
        pub fail: bool,
    }

    impl RecordingSender {
        pub fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send_blocks(
            &self,
            channel: &str,
            blocks: &[Block],
        ) -> Result<MessageReceipt, SendError> {
            let rendered = serde_json::to_string(blocks).unwrap();
            self.calls.lock().await.push((channel.to_string(), rendered));
            if self.fail {
                return Err(SendError::Api("channel_not_found".into()));
            }
            Ok(MessageReceipt {
                channel: channel.to_string(),
                ts: "1720000000.000200".to_string(),
            })
        }
    }

    fn dispatcher(sender: Arc<RecordingSender>) -> EventDispatcher {
        EventDispatcher::new(sender, "U1", "C1")
    }

    fn mention_body(channel: &str, text: &str) -> Vec<u8> {
        serde_json::json!({
            "type": "event_callback",
            "event": {
                "type": "app_mention",
                "channel": channel,
                "user": "U42",
                "text": text,
                "ts": "1720000000.000100"
            }
        })
        .to_string()
        .into_bytes()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn challenge_is_echoed_as_plain_text() {
        let sender = Arc::new(RecordingSender::new());
        let d = dispatcher(sender.clone());

        let response = d
            .dispatch(br#"{"type":"url_verification","challenge":"abc123"}"#)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        assert_eq!(body_text(response).await, "abc123");
        assert!(sender.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn authorized_command_gets_an_echo_reply() {
        let sender = Arc::new(RecordingSender::new());
        let d = dispatcher(sender.clone());

        let response = d.dispatch(&mention_body("C1", "<@U1> hello")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let calls = sender.calls.lock().await;
        assert_eq!(calls.len(), 1);
        let (channel, rendered) = &calls[0];
        assert_eq!(channel, "C1");
        assert!(rendered.contains("<@U42> You said `hello`"));
    }

    #[tokio::test]
    async fn unauthorized_channel_gets_warned_in_place() {
        let sender = Arc::new(RecordingSender::new());
        let d = dispatcher(sender.clone());

        let response = d.dispatch(&mention_body("C2", "<@U1> hello")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let calls = sender.calls.lock().await;
        assert_eq!(calls.len(), 1);
        let (channel, rendered) = &calls[0];
        // The warning goes where the mention happened, and names the
        // channel the bot actually listens to.
        assert_eq!(channel, "C2");
        assert!(rendered.contains("<#C1>"));
        assert!(!rendered.contains("You said"));
    }

    #[tokio::test]
    async fn mention_without_command_prefix_is_ignored() {
        let sender = Arc::new(RecordingSender::new());
        let d = dispatcher(sender.clone());

        for text in ["hello <@U1>", "<@U1>hello", "<@U2> hello", "hi there"] {
            let response = d.dispatch(&mention_body("C1", text)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert!(sender.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_inner_event_is_acknowledged_without_action() {
        let sender = Arc::new(RecordingSender::new());
        let d = dispatcher(sender.clone());

        let body = br#"{"type":"event_callback","event":{"type":"reaction_added","user":"U42"}}"#;
        let response = d.dispatch(body).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(sender.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_envelope_is_acknowledged_without_action() {
        let sender = Arc::new(RecordingSender::new());
        let d = dispatcher(sender.clone());

        let response = d
            .dispatch(br#"{"type":"app_rate_limited","minute_rate_limited":1}"#)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(sender.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn undecodable_body_is_a_bad_request() {
        let sender = Arc::new(RecordingSender::new());
        let d = dispatcher(sender.clone());

        let response = d.dispatch(b"{{{{").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(sender.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn send_failure_surfaces_as_internal_error() {
        let sender = Arc::new(RecordingSender::failing());
        let d = dispatcher(sender.clone());

        let response = d.dispatch(&mention_body("C1", "<@U1> hello")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Exactly one attempt; the dispatcher never retries on its own.
        assert_eq!(sender.calls.lock().await.len(), 1);
    }
}
