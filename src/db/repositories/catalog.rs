use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{categories, collections, products};

#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub category_id: Option<i32>,
    pub collection_id: Option<i32>,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

/// Thin pass-through CRUD over the catalog tables.
pub struct CatalogRepository {
    conn: DatabaseConnection,
}

impl CatalogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_products(
        &self,
        category_id: Option<i32>,
        collection_id: Option<i32>,
    ) -> Result<Vec<products::Model>> {
        let mut query = products::Entity::find().order_by_asc(products::Column::Name);

        if let Some(id) = category_id {
            query = query.filter(products::Column::CategoryId.eq(id));
        }
        if let Some(id) = collection_id {
            query = query.filter(products::Column::CollectionId.eq(id));
        }

        query.all(&self.conn).await.context("Failed to list products")
    }

    pub async fn get_product(&self, id: i32) -> Result<Option<products::Model>> {
        products::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query product")
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<products::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = products::ActiveModel {
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            price_cents: Set(input.price_cents),
            currency: Set(input.currency),
            category_id: Set(input.category_id),
            collection_id: Set(input.collection_id),
            image_url: Set(input.image_url),
            in_stock: Set(input.in_stock),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to create product")
    }

    pub async fn update_product(&self, id: i32, input: ProductInput) -> Result<Option<products::Model>> {
        let Some(existing) = products::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: products::ActiveModel = existing.into();
        active.name = Set(input.name);
        active.slug = Set(input.slug);
        active.description = Set(input.description);
        active.price_cents = Set(input.price_cents);
        active.currency = Set(input.currency);
        active.category_id = Set(input.category_id);
        active.collection_id = Set(input.collection_id);
        active.image_url = Set(input.image_url);
        active.in_stock = Set(input.in_stock);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.conn).await.context("Failed to update product")?;
        Ok(Some(updated))
    }

    pub async fn delete_product(&self, id: i32) -> Result<bool> {
        let result = products::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete product")?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list_categories(&self) -> Result<Vec<categories::Model>> {
        categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list categories")
    }

    pub async fn create_category(
        &self,
        name: &str,
        slug: &str,
        description: Option<String>,
    ) -> Result<categories::Model> {
        let active = categories::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            description: Set(description),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to create category")
    }

    pub async fn delete_category(&self, id: i32) -> Result<bool> {
        let result = categories::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete category")?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list_collections(&self) -> Result<Vec<collections::Model>> {
        collections::Entity::find()
            .order_by_asc(collections::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list collections")
    }

    pub async fn create_collection(
        &self,
        name: &str,
        slug: &str,
        description: Option<String>,
    ) -> Result<collections::Model> {
        let active = collections::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            description: Set(description),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to create collection")
    }

    pub async fn delete_collection(&self, id: i32) -> Result<bool> {
        let result = collections::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete collection")?;
        Ok(result.rows_affected > 0)
    }
}
