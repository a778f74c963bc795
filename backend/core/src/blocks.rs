//! Block Kit message fragments.
//!
//! Only the pieces this bot actually sends: section blocks carrying a
//! single text object.

use serde::Serialize;

/// A layout block in an outbound message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: TextObject },
}

/// A text object inside a block.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Mrkdwn { text: String },
    PlainText { text: String },
}

impl Block {
    /// Section block with markdown-formatted text.
    pub fn section(text: impl Into<String>) -> Self {
        Self::Section {
            text: TextObject::Mrkdwn { text: text.into() },
        }
    }
}
