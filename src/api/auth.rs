use axum::{
    Json,
    extract::{ConnectInfo, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, AppState};
use crate::config::Config;
use crate::security::csrf;
use crate::services::audit::{
    ACTION_LOGIN, ACTION_LOGIN_FAILED, ACTION_LOGOUT, ACTION_PASSWORD_RESET_COMPLETE,
    ACTION_PASSWORD_RESET_REQUEST, ACTION_REGISTER, RequestMeta,
};
use crate::services::auth_service::{AuthError, NewRegistration, Principal};

/// Session key holding the authenticated user's id. The full principal is
/// re-resolved from the store on every request so deleted users drop out.
const SESSION_USER_KEY: &str = "auth.user_id";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub consent_terms: bool,
    #[serde(default)]
    pub consent_privacy: bool,
    #[serde(default)]
    pub consent_marketing: bool,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: String,
}

#[derive(Serialize)]
pub struct PrincipalResponse {
    pub id: i32,
    pub username: String,
    pub role: String,
}

impl From<Principal> for PrincipalResponse {
    fn from(p: Principal) -> Self {
        Self {
            id: p.id,
            username: p.username,
            role: p.role,
        }
    }
}

// ============================================================================
// Pipeline helpers
// ============================================================================

/// Rate-limit client key: first `X-Forwarded-For` entry when the proxy is
/// trusted, otherwise the peer address of the direct connection. Every
/// client must land in its own bucket.
pub fn client_key(config: &Config, headers: &HeaderMap, peer: SocketAddr) -> String {
    if config.security.trust_forwarded_for
        && let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok())
        && let Some(first) = forwarded.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    peer.ip().to_string()
}

pub fn request_meta(config: &Config, headers: &HeaderMap, peer: SocketAddr) -> RequestMeta {
    RequestMeta {
        ip_address: Some(client_key(config, headers, peer)),
        user_agent: headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string),
    }
}

async fn verify_csrf(session: &Session, headers: &HeaderMap) -> Result<(), ApiError> {
    if csrf::verify(session, headers).await {
        Ok(())
    } else {
        Err(ApiError::CsrfRejected)
    }
}

async fn current_principal(
    state: &AppState,
    session: &Session,
) -> Result<Option<Principal>, ApiError> {
    let Some(user_id) = session
        .get::<i32>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
    else {
        return Ok(None);
    };

    // A vanished user record means the session is stale.
    Ok(state.auth().resolve_principal(user_id).await?)
}

// ============================================================================
// Middleware
// ============================================================================

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = current_principal(&state, &session)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !principal.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    tracing::Span::current().record("user_id", principal.id);
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/auth/csrf-token
pub async fn get_csrf_token(session: Session) -> Result<Json<serde_json::Value>, ApiError> {
    let token = csrf::ensure_session_token(&session)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to issue CSRF token: {e}")))?;

    Ok(Json(json!({ "token": token })))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let config = state.config();

    if !state
        .limiters()
        .register
        .check(&client_key(config, &headers, peer))
    {
        return Err(ApiError::RateLimited);
    }
    verify_csrf(&session, &headers).await?;

    let mut errors = Vec::new();
    super::validation::validate_email(&payload.username, "username", &mut errors);
    super::validation::validate_required(&payload.password, "password", &mut errors);
    if !payload.consent_terms {
        errors.push("You must accept the terms of service".to_string());
    }
    if !payload.consent_privacy {
        errors.push("You must accept the privacy policy".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let principal = state
        .auth()
        .register(NewRegistration {
            username: payload.username,
            password: payload.password,
            consent_terms: payload.consent_terms,
            consent_privacy: payload.consent_privacy,
            consent_marketing: payload.consent_marketing,
        })
        .await?;

    let meta = request_meta(config, &headers, peer);
    state
        .audit()
        .record(
            Some(principal.id),
            ACTION_REGISTER,
            &meta,
            Some(json!({
                "consentTerms": true,
                "consentPrivacy": true,
                "consentMarketing": payload.consent_marketing,
            })),
        )
        .await;

    let message = if config.security.email_verification_required {
        "Account created. Please check your email to verify your address."
    } else {
        "Account created. You can now log in."
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": principal.id,
            "username": principal.username,
            "role": principal.role,
            "message": message,
        })),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<PrincipalResponse>, ApiError> {
    let config = state.config();

    if !state
        .limiters()
        .login
        .check(&client_key(config, &headers, peer))
    {
        return Err(ApiError::RateLimited);
    }
    verify_csrf(&session, &headers).await?;

    let mut errors = Vec::new();
    super::validation::validate_required(&payload.username, "username", &mut errors);
    super::validation::validate_required(&payload.password, "password", &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let meta = request_meta(config, &headers, peer);

    let principal = match state.auth().authenticate(&payload.username, &payload.password).await {
        Ok(principal) => principal,
        Err(AuthError::InvalidCredentials {
            attempted_user_id,
            reason,
        }) => {
            state
                .audit()
                .record(
                    attempted_user_id,
                    ACTION_LOGIN_FAILED,
                    &meta,
                    Some(json!({ "reason": reason.as_str() })),
                )
                .await;
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    session
        .insert(SESSION_USER_KEY, principal.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    state
        .audit()
        .record(Some(principal.id), ACTION_LOGIN, &meta, None)
        .await;

    Ok(Json(principal.into()))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    verify_csrf(&session, &headers).await?;

    let principal = current_principal(&state, &session)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to destroy session: {e}")))?;

    let meta = request_meta(state.config(), &headers, peer);
    state
        .audit()
        .record(Some(principal.id), ACTION_LOGOUT, &meta, None)
        .await;

    Ok(Json(json!({ "message": "Logged out" })))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<PrincipalResponse>, ApiError> {
    let principal = current_principal(&state, &session)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(principal.into()))
}

/// POST /api/auth/forgot-password
///
/// The response is identical whether or not the account exists.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config = state.config();

    if !state
        .limiters()
        .forgot_password
        .check(&client_key(config, &headers, peer))
    {
        return Err(ApiError::RateLimited);
    }
    verify_csrf(&session, &headers).await?;

    let mut errors = Vec::new();
    super::validation::validate_email(&payload.email, "email", &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if let Some(user_id) = state.auth().forgot_password(&payload.email).await? {
        let meta = request_meta(config, &headers, peer);
        state
            .audit()
            .record(Some(user_id), ACTION_PASSWORD_RESET_REQUEST, &meta, None)
            .await;
    }

    Ok(Json(json!({
        "message": "If an account exists for this email, a reset link has been sent."
    })))
}

/// GET /api/auth/validate-reset-token?token=
pub async fn validate_reset_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.auth().validate_reset_token(&query.token).await {
        Ok(()) => Ok(Json(json!({ "valid": true }))),
        Err(e @ (AuthError::TokenInvalid | AuthError::TokenExpired)) => {
            Ok(Json(json!({ "valid": false, "message": e.to_string() })))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config = state.config();

    if !state
        .limiters()
        .reset_password
        .check(&client_key(config, &headers, peer))
    {
        return Err(ApiError::RateLimited);
    }
    verify_csrf(&session, &headers).await?;

    let mut errors = Vec::new();
    super::validation::validate_required(&payload.token, "token", &mut errors);
    super::validation::validate_required(&payload.password, "password", &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Token validity is re-checked at consume time inside the service;
    // a preflight validate call grants nothing here.
    let user_id = state
        .auth()
        .reset_password(&payload.token, &payload.password)
        .await?;

    let meta = request_meta(config, &headers, peer);
    state
        .audit()
        .record(Some(user_id), ACTION_PASSWORD_RESET_COMPLETE, &meta, None)
        .await;

    Ok(Json(json!({
        "message": "Password updated. You can now log in with your new password."
    })))
}

/// GET /api/auth/verify-email?token=
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.auth().verify_email(&query.token).await?;

    Ok(Json(json!({ "message": "Email address confirmed." })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(ip: [u8; 4]) -> SocketAddr {
        SocketAddr::from((ip, 52042))
    }

    #[test]
    fn direct_clients_get_their_own_key() {
        let config = Config::default();
        let headers = HeaderMap::new();

        let a = client_key(&config, &headers, peer([10, 0, 0, 1]));
        let b = client_key(&config, &headers, peer([10, 0, 0, 2]));

        assert_eq!(a, "10.0.0.1");
        assert_ne!(a, b);
    }

    #[test]
    fn trusted_forwarded_for_takes_precedence() {
        let config = Config::default();
        assert!(config.security.trust_forwarded_for);

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());

        let key = client_key(&config, &headers, peer([127, 0, 0, 1]));
        assert_eq!(key, "203.0.113.9");
    }

    #[test]
    fn untrusted_proxy_header_is_ignored() {
        let mut config = Config::default();
        config.security.trust_forwarded_for = false;

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9".parse().unwrap());

        let key = client_key(&config, &headers, peer([192, 168, 1, 7]));
        assert_eq!(key, "192.168.1.7");
    }
}
