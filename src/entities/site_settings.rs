use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Single-row branding configuration (id is always 1).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "site_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub store_name: String,

    pub tagline: Option<String>,

    pub logo_url: Option<String>,

    pub accent_color: Option<String>,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
