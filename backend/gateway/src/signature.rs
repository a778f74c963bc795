//! Webhook signature gate.
//!
//! Every inbound delivery carries `X-Slack-Request-Timestamp` and
//! `X-Slack-Signature: v0=<hex>` headers, where the digest is
//! HMAC-SHA256 over `v0:{timestamp}:{body}` keyed by the signing secret.
//! Nothing downstream sees a body that failed this check.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

const SCHEME_PREFIX: &str = "v0=";

/// Deliveries whose timestamp is further than this from server time are
/// rejected to blunt replay of captured requests. The upstream contract
/// itself puts no bound on timestamp age.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),

    #[error("malformed header {0}")]
    MalformedHeader(&'static str),

    #[error("request timestamp {timestamp} outside the freshness window")]
    StaleTimestamp { timestamp: i64 },

    #[error("signature mismatch")]
    Mismatch,
}

impl SignatureError {
    /// Authentication failures map to 401; header-shape problems to 400.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::StaleTimestamp { .. } | Self::Mismatch)
    }
}

/// Verifies request provenance. Holds only immutable values, so one
/// instance is shared across all in-flight requests.
pub struct SignatureVerifier {
    signing_secret: String,
    max_age: Duration,
}

impl SignatureVerifier {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// Override the freshness window.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Check the headers and raw body of one delivery.
    ///
    /// The body is read, never consumed; callers hand the same bytes to
    /// the dispatcher afterwards.
    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), SignatureError> {
        let provided = header_str(headers, SIGNATURE_HEADER)?;
        let timestamp = header_str(headers, TIMESTAMP_HEADER)?;

        let parsed: i64 = timestamp
            .parse()
            .map_err(|_| SignatureError::MalformedHeader(TIMESTAMP_HEADER))?;
        let skew = (unix_now() - parsed).unsigned_abs();
        if skew > self.max_age.as_secs() {
            return Err(SignatureError::StaleTimestamp { timestamp: parsed });
        }

        let digest = provided
            .strip_prefix(SCHEME_PREFIX)
            .ok_or(SignatureError::Mismatch)?;
        let digest = hex::decode(digest).map_err(|_| SignatureError::Mismatch)?;

        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .map_err(|_| SignatureError::Mismatch)?;
        mac.update(b"v0:");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        // Constant-time comparison of the full digest.
        mac.verify_slice(&digest)
            .map_err(|_| SignatureError::Mismatch)
    }
}

/// Compute the `v0=<hex>` signature for a `(timestamp, body)` pair.
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts keys of any size");
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    format!("{SCHEME_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .ok_or(SignatureError::MissingHeader(name))?
        .to_str()
        .map_err(|_| SignatureError::MalformedHeader(name))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
