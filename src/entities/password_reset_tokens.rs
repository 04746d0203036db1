use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "password_reset_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    /// SHA-256 digest of the raw token; the raw value is never persisted.
    #[sea_orm(unique)]
    pub token_hash: String,

    /// `password_reset` or `email_verification`.
    pub kind: String,

    /// ISO-8601; a token is valid only while `now < expires_at`.
    pub expires_at: String,

    pub created_at: String,

    pub used: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
