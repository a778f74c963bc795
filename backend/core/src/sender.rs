use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::Block;

/// Failure delivering an outbound message.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("platform rejected the message: {0}")]
    Api(String),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Receipt for a delivered message.
#[derive(Debug, Clone)]
pub struct MessageReceipt {
    pub channel: String,
    pub ts: String,
}

/// Outbound "send message" capability consumed by the event dispatcher.
///
/// The dispatcher only needs a success/failure signal; the real
/// implementation lives in `mentionbot-slack`, and tests substitute a
/// recording mock.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_blocks(&self, channel: &str, blocks: &[Block]) -> Result<MessageReceipt, SendError>;
}
