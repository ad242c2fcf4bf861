use std::time::Duration;

use hmac::{Hmac, Mac};
use lambda_http::http::HeaderMap;
use sha2::Sha256;

use crate::error::{AuthError, InputError};

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";

/// Checks Slack's `v0` request signature against the configured signing secret.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    signing_secret: Option<String>,
    tolerance: Duration,
}

impl SignatureVerifier {
    pub fn new(signing_secret: Option<String>, tolerance: Duration) -> Self {
        Self {
            signing_secret,
            tolerance,
        }
    }

    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthError> {
        let timestamp = header_str(headers, TIMESTAMP_HEADER);
        let signature = header_str(headers, SIGNATURE_HEADER);
        tracing::debug!(timestamp, signature, "Verifying signature");

        self.verify_at(timestamp, signature, body, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        timestamp: &str,
        signature: &str,
        body: &[u8],
        now: i64,
    ) -> Result<(), AuthError> {
        let secret = self.signing_secret.as_deref().ok_or_else(|| {
            tracing::error!("CRITICAL: SLACK_SIGNING_SECRET is not set");
            AuthError::MissingSecret
        })?;

        let request_time: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| AuthError::InvalidSignature)?;

        // Reject replays outside the tolerance window
        if now.abs_diff(request_time) > self.tolerance.as_secs() {
            return Err(AuthError::ExpiredTimestamp);
        }

        let expected = signature
            .strip_prefix("v0=")
            .and_then(|hex_digest| hex::decode(hex_digest).ok())
            .ok_or(AuthError::InvalidSignature)?;

        signing_mac(secret, timestamp, body)?
            .verify_slice(&expected)
            .map_err(|_| AuthError::InvalidSignature)
    }
}

fn signing_mac(secret: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, AuthError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidSignature)?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(mac)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Computes the `v0=<hex>` signature Slack would send for this body.
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> Result<String, AuthError> {
    let mac = signing_mac(signing_secret, timestamp, body)?;
    Ok(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}

/// Keeps `[A-Za-z0-9_-]` and lower-cases the rest.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Returns the single whitespace-delimited token in `text`.
pub fn parse_parameter<'a>(command: &str, text: &'a str) -> Result<&'a str, InputError> {
    let mut tokens = text.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(token), None) => Ok(token),
        _ => Err(InputError::InvalidParameter {
            command: command.to_string(),
        }),
    }
}
