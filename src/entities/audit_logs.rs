use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Append-only compliance trail; never updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Nullable: a failed login against an unknown username has no user.
    pub user_id: Option<i32>,

    pub action: String,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    /// Structured details, serialized JSON.
    pub details: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
