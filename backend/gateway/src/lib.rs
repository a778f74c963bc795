//! mentionbot HTTP gateway.
//!
//! The inbound side of the bot: signature verification gate, event
//! dispatch, and the axum server that ties them to `/slack/events`.

pub mod events;
pub mod health;
pub mod server;
pub mod signature;

pub use events::EventDispatcher;
pub use server::{build_router, run, AppState};
pub use signature::{SignatureError, SignatureVerifier};
