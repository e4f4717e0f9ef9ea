//! Request authentication -- rotating HMAC ingest tokens and the admin
//! token for the stats endpoint.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Ingest tokens rotate every 60 seconds.
pub const TOKEN_WINDOW_MS: i64 = 60_000;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing security token")]
    MissingToken,
    #[error("invalid security token")]
    InvalidToken,
    #[error("invalid admin token")]
    InvalidAdminToken,
}

/// Mint the ingest token for a session at `now_ms` (unix millis):
/// hex(HMAC-SHA256(session_id + floor(now_ms / 60000), secret)).
pub fn mint_ingest_token(session_id: &str, secret: &str, now_ms: i64) -> String {
    let window = now_ms / TOKEN_WINDOW_MS;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{session_id}{window}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a client-presented ingest token against the current 60-second
/// window. Comparison happens inside the MAC verification, in constant
/// time.
pub fn verify_ingest_token(
    session_id: &str,
    token: &str,
    secret: &str,
    now_ms: i64,
) -> Result<(), AuthError> {
    let presented = hex::decode(token).map_err(|_| AuthError::InvalidToken)?;
    let window = now_ms / TOKEN_WINDOW_MS;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{session_id}{window}").as_bytes());
    mac.verify_slice(&presented)
        .map_err(|_| AuthError::InvalidToken)
}

/// Check the admin token for the stats endpoint.
pub fn verify_admin_token(presented: &str, expected: &str) -> Result<(), AuthError> {
    if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AuthError::InvalidAdminToken)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
