pub mod blocks;
pub mod event;
pub mod sender;

pub use blocks::{Block, TextObject};
pub use event::{AppMentionEvent, EventEnvelope, InnerEvent};
pub use sender::{MessageReceipt, MessageSender, SendError};
