use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entities::password_reset_tokens::{self, Entity as Tokens};

pub const KIND_PASSWORD_RESET: &str = "password_reset";
pub const KIND_EMAIL_VERIFICATION: &str = "email_verification";

pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Deletes any outstanding tokens of `kind` for the user. Called before
    /// issuing a replacement so only the most recent token is honored.
    pub async fn delete_for_user(&self, user_id: i32, kind: &str) -> Result<u64> {
        let result = Tokens::delete_many()
            .filter(password_reset_tokens::Column::UserId.eq(user_id))
            .filter(password_reset_tokens::Column::Kind.eq(kind))
            .exec(&self.conn)
            .await
            .context("Failed to delete outstanding tokens")?;

        Ok(result.rows_affected)
    }

    pub async fn insert(
        &self,
        user_id: i32,
        token_hash: &str,
        kind: &str,
        expires_at: &str,
    ) -> Result<password_reset_tokens::Model> {
        let active = password_reset_tokens::ActiveModel {
            user_id: Set(user_id),
            token_hash: Set(token_hash.to_string()),
            kind: Set(kind.to_string()),
            expires_at: Set(expires_at.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            used: Set(false),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert token")?;

        Ok(model)
    }

    pub async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<password_reset_tokens::Model>> {
        let token = Tokens::find()
            .filter(password_reset_tokens::Column::TokenHash.eq(token_hash))
            .one(&self.conn)
            .await
            .context("Failed to query token by hash")?;

        Ok(token)
    }

    /// Marks a token used with a conditional single-row update
    /// (`used = false` guard). Returns false when another writer got there
    /// first; that caller must treat the token as invalid.
    pub async fn mark_used(&self, token_id: i32) -> Result<bool> {
        let result = Tokens::update_many()
            .col_expr(password_reset_tokens::Column::Used, Expr::value(true))
            .filter(password_reset_tokens::Column::Id.eq(token_id))
            .filter(password_reset_tokens::Column::Used.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to mark token used")?;

        Ok(result.rows_affected == 1)
    }
}
