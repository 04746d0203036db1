use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::audit_logs::{self, Entity as AuditLogs};

/// Append-only store for security events. No update or delete is exposed.
pub struct AuditRepository {
    conn: DatabaseConnection,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn append(
        &self,
        user_id: Option<i32>,
        action: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        details: Option<String>,
    ) -> Result<()> {
        let active = audit_logs::ActiveModel {
            user_id: Set(user_id),
            action: Set(action.to_string()),
            ip_address: Set(ip_address.map(ToString::to_string)),
            user_agent: Set(user_agent.map(ToString::to_string)),
            details: Set(details),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        AuditLogs::insert(active)
            .exec(&self.conn)
            .await
            .context("Failed to append audit log entry")?;

        Ok(())
    }

    /// Per-user history for consent/data-export reporting.
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<audit_logs::Model>> {
        let entries = AuditLogs::find()
            .filter(audit_logs::Column::UserId.eq(user_id))
            .order_by_desc(audit_logs::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list audit entries for user")?;

        Ok(entries)
    }

    pub async fn list_recent(&self, limit: u64) -> Result<Vec<audit_logs::Model>> {
        let entries = AuditLogs::find()
            .order_by_desc(audit_logs::Column::CreatedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list recent audit entries")?;

        Ok(entries)
    }
}
