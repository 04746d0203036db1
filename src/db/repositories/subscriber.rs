use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set, SqlErr};

use crate::entities::subscribers::{self, Entity as Subscribers};

pub const SOURCE_LEAD: &str = "lead";
pub const SOURCE_NEWSLETTER: &str = "newsletter";

pub struct SubscriberRepository {
    conn: DatabaseConnection,
}

impl SubscriberRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a subscriber; a duplicate email is treated as success
    /// (returns false) so signup and lead auto-creation stay idempotent.
    pub async fn insert_if_absent(
        &self,
        email: &str,
        source: &str,
        consent_marketing: bool,
    ) -> Result<bool> {
        let active = subscribers::ActiveModel {
            email: Set(email.to_string()),
            source: Set(source.to_string()),
            consent_marketing: Set(consent_marketing),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(_) => Ok(true),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Ok(false),
                _ => Err(e).context("Failed to insert subscriber"),
            },
        }
    }

    pub async fn list(&self) -> Result<Vec<subscribers::Model>> {
        Subscribers::find()
            .order_by_desc(subscribers::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list subscribers")
    }

    pub async fn delete_by_id(&self, id: i32) -> Result<bool> {
        let result = Subscribers::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete subscriber")?;
        Ok(result.rows_affected > 0)
    }
}
