use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::journal_posts::{self, Entity as JournalPosts};

pub struct JournalRepository {
    conn: DatabaseConnection,
}

impl JournalRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Published posts only, newest first (storefront view).
    pub async fn list_published(&self) -> Result<Vec<journal_posts::Model>> {
        JournalPosts::find()
            .filter(journal_posts::Column::Published.eq(true))
            .order_by_desc(journal_posts::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list published journal posts")
    }

    pub async fn list_all(&self) -> Result<Vec<journal_posts::Model>> {
        JournalPosts::find()
            .order_by_desc(journal_posts::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list journal posts")
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<journal_posts::Model>> {
        JournalPosts::find()
            .filter(journal_posts::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .context("Failed to query journal post by slug")
    }

    pub async fn create(
        &self,
        title: &str,
        slug: &str,
        body: &str,
        published: bool,
    ) -> Result<journal_posts::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = journal_posts::ActiveModel {
            title: Set(title.to_string()),
            slug: Set(slug.to_string()),
            body: Set(body.to_string()),
            published: Set(published),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to create journal post")
    }

    pub async fn update(
        &self,
        id: i32,
        title: &str,
        body: &str,
        published: bool,
    ) -> Result<Option<journal_posts::Model>> {
        let Some(existing) = JournalPosts::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: journal_posts::ActiveModel = existing.into();
        active.title = Set(title.to_string());
        active.body = Set(body.to_string());
        active.published = Set(published);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.conn).await.context("Failed to update journal post")?;
        Ok(Some(updated))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = JournalPosts::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete journal post")?;
        Ok(result.rows_affected > 0)
    }
}
