//! Per-session CSRF token issuance and verification.
//!
//! One token per session, created lazily and kept for the session's
//! lifetime. State-changing auth routes must present it in the
//! `X-CSRF-Token` header; verification fails closed.

use anyhow::Result;
use axum::http::HeaderMap;
use tower_sessions::Session;

use super::tokens;

const SESSION_KEY: &str = "csrf_token";

pub const CSRF_HEADER: &str = "x-csrf-token";

/// Returns the session's CSRF token, creating it on first touch.
/// Idempotent: later calls return the same value.
pub async fn ensure_session_token(session: &Session) -> Result<String> {
    if let Some(existing) = session.get::<String>(SESSION_KEY).await? {
        return Ok(existing);
    }

    let token = tokens::generate_raw_token();
    session.insert(SESSION_KEY, &token).await?;
    Ok(token)
}

/// True only when the session holds a token and the header matches it
/// exactly. Missing session token, missing header, and mismatch are all
/// treated identically.
pub async fn verify(session: &Session, headers: &HeaderMap) -> bool {
    let Ok(Some(expected)) = session.get::<String>(SESSION_KEY).await else {
        return false;
    };

    let Some(presented) = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    presented == expected
}
