//! Journal posts: public list/read of published posts, admin CRUD.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, validation};
use crate::entities::journal_posts;

#[derive(Deserialize)]
pub struct JournalPostRequest {
    pub title: String,
    pub slug: Option<String>,
    pub body: String,
    #[serde(default)]
    pub published: bool,
}

pub async fn list_published(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<journal_posts::Model>>, ApiError> {
    Ok(Json(state.store().journal().list_published().await?))
}

pub async fn get_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<journal_posts::Model>, ApiError> {
    let post = state
        .store()
        .journal()
        .get_by_slug(&slug)
        .await?
        .filter(|p| p.published)
        .ok_or_else(|| ApiError::not_found("Journal post", slug))?;

    Ok(Json(post))
}

pub async fn list_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<journal_posts::Model>>, ApiError> {
    Ok(Json(state.store().journal().list_all().await?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JournalPostRequest>,
) -> Result<(StatusCode, Json<journal_posts::Model>), ApiError> {
    let mut errors = Vec::new();
    validation::validate_required(&payload.title, "title", &mut errors);
    validation::validate_required(&payload.body, "body", &mut errors);

    let slug = payload.slug.unwrap_or_else(|| slugify(&payload.title));
    validation::validate_slug(&slug, "slug", &mut errors);

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let post = state
        .store()
        .journal()
        .create(&payload.title, &slug, &payload.body, payload.published)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<JournalPostRequest>,
) -> Result<Json<journal_posts::Model>, ApiError> {
    let mut errors = Vec::new();
    validation::validate_required(&payload.title, "title", &mut errors);
    validation::validate_required(&payload.body, "body", &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let post = state
        .store()
        .journal()
        .update(id, &payload.title, &payload.body, payload.published)
        .await?
        .ok_or_else(|| ApiError::not_found("Journal post", id))?;

    Ok(Json(post))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if state.store().journal().delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Journal post", id))
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_hyphen = true;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("The Art of Gold, Part 2"), "the-art-of-gold-part-2");
        assert_eq!(slugify("  Héllo!  "), "h-llo");
    }
}
