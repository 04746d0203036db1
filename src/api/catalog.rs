//! Thin pass-through CRUD for products, categories, and collections.
//! Public reads, admin-only mutations (enforced by the router layer).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, validation};
use crate::db::repositories::catalog::ProductInput;
use crate::entities::{categories, collections, products};

#[derive(Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<i32>,
    pub collection_id: Option<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub category_id: Option<i32>,
    pub collection_id: Option<i32>,
    pub image_url: Option<String>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_currency() -> String {
    "EUR".to_string()
}

const fn default_in_stock() -> bool {
    true
}

#[derive(Deserialize)]
pub struct TaxonomyRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

fn validate_product(payload: &ProductRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    validation::validate_required(&payload.name, "name", &mut errors);
    validation::validate_max_length(&payload.name, "name", 200, &mut errors);
    validation::validate_slug(&payload.slug, "slug", &mut errors);
    if payload.price_cents < 0 {
        errors.push("priceCents must not be negative".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn validate_taxonomy(payload: &TaxonomyRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    validation::validate_required(&payload.name, "name", &mut errors);
    validation::validate_slug(&payload.slug, "slug", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

impl From<ProductRequest> for ProductInput {
    fn from(payload: ProductRequest) -> Self {
        Self {
            name: payload.name,
            slug: payload.slug,
            description: payload.description,
            price_cents: payload.price_cents,
            currency: payload.currency,
            category_id: payload.category_id,
            collection_id: payload.collection_id,
            image_url: payload.image_url,
            in_stock: payload.in_stock,
        }
    }
}

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<products::Model>>, ApiError> {
    let products = state
        .store()
        .catalog()
        .list_products(filter.category_id, filter.collection_id)
        .await?;

    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<products::Model>, ApiError> {
    let product = state
        .store()
        .catalog()
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProductRequest>,
) -> Result<(StatusCode, Json<products::Model>), ApiError> {
    validate_product(&payload)?;

    let product = state.store().catalog().create_product(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<ProductRequest>,
) -> Result<Json<products::Model>, ApiError> {
    validate_product(&payload)?;

    let product = state
        .store()
        .catalog()
        .update_product(id, payload.into())
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if state.store().catalog().delete_product(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Product", id))
    }
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<categories::Model>>, ApiError> {
    Ok(Json(state.store().catalog().list_categories().await?))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TaxonomyRequest>,
) -> Result<(StatusCode, Json<categories::Model>), ApiError> {
    validate_taxonomy(&payload)?;

    let category = state
        .store()
        .catalog()
        .create_category(&payload.name, &payload.slug, payload.description)
        .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if state.store().catalog().delete_category(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Category", id))
    }
}

pub async fn list_collections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<collections::Model>>, ApiError> {
    Ok(Json(state.store().catalog().list_collections().await?))
}

pub async fn create_collection(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TaxonomyRequest>,
) -> Result<(StatusCode, Json<collections::Model>), ApiError> {
    validate_taxonomy(&payload)?;

    let collection = state
        .store()
        .catalog()
        .create_collection(&payload.name, &payload.slug, payload.description)
        .await?;

    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn delete_collection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if state.store().catalog().delete_collection(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Collection", id))
    }
}
