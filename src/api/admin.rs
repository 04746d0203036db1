//! Back-office endpoints: admin account management, branding settings,
//! and the audit report. All routes here sit behind `require_admin`;
//! account mutations are further restricted to the configured primary
//! admin.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, AppState, validation};
use crate::db::repositories::user::hash_password;
use crate::db::{CreateUserError, NewUser, User};
use crate::entities::{audit_logs, site_settings};
use crate::security::password_policy;
use crate::services::auth_service::Principal;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserResponse {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub created_at: String,
}

impl From<User> for AdminUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateAdminRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct AuditQuery {
    pub user_id: Option<i32>,
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub store_name: String,
    pub tagline: Option<String>,
    pub logo_url: Option<String>,
    pub accent_color: Option<String>,
}

fn require_primary_admin(state: &AppState, principal: &Principal) -> Result<(), ApiError> {
    if state.config().security.is_primary_admin(&principal.username) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Only the primary administrator can manage admin accounts".to_string(),
        ))
    }
}

/// GET /api/admin/users
pub async fn list_admins(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AdminUserResponse>>, ApiError> {
    let admins = state.store().users().list_admins().await?;

    Ok(Json(admins.into_iter().map(Into::into).collect()))
}

/// POST /api/admin/users
pub async fn create_admin(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<AdminUserResponse>), ApiError> {
    require_primary_admin(&state, &principal)?;

    let mut errors = Vec::new();
    validation::validate_email(&payload.username, "username", &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if !password_policy::is_acceptable(&payload.password) {
        return Err(ApiError::WeakPassword(password_policy::evaluate(
            &payload.password,
        )));
    }

    let security = state.config().security.clone();
    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, &security))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;

    let user = state
        .store()
        .users()
        .create(NewUser {
            username: payload.username,
            password_hash,
            role: "admin".to_string(),
            consent_terms: true,
            consent_privacy: true,
            consent_marketing: false,
        })
        .await
        .map_err(|e| match e {
            CreateUserError::DuplicateUsername => ApiError::DuplicateUsername,
            CreateUserError::Db(e) => ApiError::DatabaseError(e.to_string()),
        })?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// DELETE /api/admin/users/:id
pub async fn delete_admin(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    require_primary_admin(&state, &principal)?;

    let target = state
        .store()
        .users()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    // The primary admin account itself can never be deleted.
    if state.config().security.is_primary_admin(&target.username) {
        return Err(ApiError::Forbidden(
            "The primary administrator account cannot be deleted".to_string(),
        ));
    }

    state.store().users().delete_by_id(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/audit-logs?user_id=
///
/// Read-only consent-history / data-export report.
pub async fn audit_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<audit_logs::Model>>, ApiError> {
    let entries = match query.user_id {
        Some(user_id) => state.store().audit().list_for_user(user_id).await?,
        None => {
            state
                .store()
                .audit()
                .list_recent(query.limit.unwrap_or(100))
                .await?
        }
    };

    Ok(Json(entries))
}

/// GET /api/settings (public branding read)
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<site_settings::Model>, ApiError> {
    Ok(Json(state.store().settings().get().await?))
}

/// PUT /api/admin/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SettingsRequest>,
) -> Result<Json<site_settings::Model>, ApiError> {
    let mut errors = Vec::new();
    validation::validate_required(&payload.store_name, "storeName", &mut errors);
    validation::validate_max_length(&payload.store_name, "storeName", 100, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let settings = state
        .store()
        .settings()
        .update(
            &payload.store_name,
            payload.tagline,
            payload.logo_url,
            payload.accent_color,
        )
        .await?;

    Ok(Json(settings))
}
