use serde::Deserialize;

/// Top-level envelope of an Events API delivery, discriminated by its
/// `type` field at decode time.
///
/// Envelope kinds we don't recognize decode to [`EventEnvelope::Unknown`]
/// instead of failing: the platform retries deliveries that don't get a
/// 2xx, so an unknown kind must still be acknowledgeable.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// Endpoint ownership challenge sent when the webhook URL is registered.
    UrlVerification { challenge: String },
    /// A workspace event wrapped in the callback envelope.
    EventCallback { event: InnerEvent },
    #[serde(other)]
    Unknown,
}

/// The event nested inside an `event_callback` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InnerEvent {
    AppMention(AppMentionEvent),
    #[serde(other)]
    Unknown,
}

/// A message that mentioned the bot, in any channel it has been added to.
#[derive(Debug, Clone, Deserialize)]
pub struct AppMentionEvent {
    /// Channel the mention happened in.
    pub channel: String,
    /// User who wrote the message.
    pub user: String,
    /// Full message text, mention token included.
    pub text: String,
    /// Event timestamp, opaque to us.
    #[serde(default)]
    pub ts: String,
}
