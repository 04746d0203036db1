//! Newsletter signup (public) and subscriber management (admin).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{ApiError, AppState, validation};
use crate::db::repositories::subscriber::SOURCE_NEWSLETTER;
use crate::entities::subscribers;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub email: String,
    #[serde(default = "default_consent")]
    pub consent_marketing: bool,
}

const fn default_consent() -> bool {
    true
}

/// POST /api/newsletter/subscribe
///
/// Idempotent: re-subscribing an existing address responds the same way.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut errors = Vec::new();
    validation::validate_email(&payload.email, "email", &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    state
        .store()
        .subscribers()
        .insert_if_absent(&payload.email, SOURCE_NEWSLETTER, payload.consent_marketing)
        .await?;

    Ok(Json(json!({ "message": "Thanks for subscribing!" })))
}

pub async fn list_subscribers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<subscribers::Model>>, ApiError> {
    Ok(Json(state.store().subscribers().list().await?))
}

pub async fn delete_subscriber(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if state.store().subscribers().delete_by_id(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Subscriber", id))
    }
}
