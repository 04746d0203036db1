//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter, TransactionTrait};
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::Config;
use crate::db::repositories::token::{KIND_EMAIL_VERIFICATION, KIND_PASSWORD_RESET};
use crate::db::repositories::user::{hash_password, verify_password};
use crate::db::{NewUser, Store};
use crate::domain::events::DomainEvent;
use crate::entities::{password_reset_tokens, users};
use crate::security::password_policy;
use crate::security::tokens;
use crate::services::auth_service::{
    AuthError, AuthService, CredentialFailure, NewRegistration, Principal,
};

pub struct SeaOrmAuthService {
    store: Store,
    config: Arc<Config>,
    event_bus: broadcast::Sender<DomainEvent>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(
        store: Store,
        config: Arc<Config>,
        event_bus: broadcast::Sender<DomainEvent>,
    ) -> Self {
        Self {
            store,
            config,
            event_bus,
        }
    }

    /// Argon2 hashing off the async runtime.
    async fn hash_blocking(&self, password: &str) -> Result<String, AuthError> {
        let security = self.config.security.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(AuthError::from)
    }

    async fn verify_blocking(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(AuthError::from)
    }

    /// Issues a fresh token of `kind`, superseding any outstanding one,
    /// and returns the raw value for the outbound link.
    async fn issue_token(&self, user_id: i32, kind: &str) -> Result<String, AuthError> {
        self.store.tokens().delete_for_user(user_id, kind).await?;

        let raw = tokens::generate_raw_token();
        let expires_at = (chrono::Utc::now()
            + chrono::Duration::minutes(self.config.security.token_expiry_minutes))
        .to_rfc3339();

        self.store
            .tokens()
            .insert(user_id, &tokens::digest(&raw), kind, &expires_at)
            .await?;

        Ok(raw)
    }

    /// Looks up a raw token and checks kind, used flag, and expiry.
    /// Does not consume it.
    async fn find_live_token(
        &self,
        raw_token: &str,
        kind: &str,
    ) -> Result<password_reset_tokens::Model, AuthError> {
        let token = self
            .store
            .tokens()
            .find_by_hash(&tokens::digest(raw_token))
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if token.kind != kind || token.used {
            return Err(AuthError::TokenInvalid);
        }

        let expires_at = chrono::DateTime::parse_from_rfc3339(&token.expires_at)
            .map_err(|_| AuthError::TokenInvalid)?;
        if expires_at < chrono::Utc::now() {
            return Err(AuthError::TokenExpired);
        }

        Ok(token)
    }

    fn publish(&self, event: DomainEvent) {
        // No receivers is fine (tests run without the listener).
        let _ = self.event_bus.send(event);
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, registration: NewRegistration) -> Result<Principal, AuthError> {
        let evaluation = password_policy::evaluate(&registration.password);
        if !password_policy::is_acceptable(&registration.password) {
            return Err(AuthError::WeakPassword(evaluation));
        }

        let password_hash = self.hash_blocking(&registration.password).await?;

        let user = self
            .store
            .users()
            .create(NewUser {
                username: registration.username,
                password_hash,
                role: "customer".to_string(),
                consent_terms: registration.consent_terms,
                consent_privacy: registration.consent_privacy,
                consent_marketing: registration.consent_marketing,
            })
            .await
            .map_err(|e| match e {
                crate::db::CreateUserError::DuplicateUsername => AuthError::DuplicateUsername,
                crate::db::CreateUserError::Db(e) => AuthError::Database(e.to_string()),
            })?;

        if self.config.security.email_verification_required {
            let raw_token = self.issue_token(user.id, KIND_EMAIL_VERIFICATION).await?;
            self.publish(DomainEvent::VerificationRequested {
                user_id: user.id,
                username: user.username.clone(),
                raw_token,
            });
        }

        self.publish(DomainEvent::UserRegistered {
            user_id: user.id,
            username: user.username.clone(),
            consent_marketing: user.consent_marketing,
        });

        Ok(Principal {
            id: user.id,
            username: user.username,
            role: user.role,
        })
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let Some((user, password_hash)) = self
            .store
            .users()
            .get_by_username_with_password(username)
            .await?
        else {
            return Err(AuthError::InvalidCredentials {
                attempted_user_id: None,
                reason: CredentialFailure::UnknownUsername,
            });
        };

        if !self.verify_blocking(password, &password_hash).await? {
            return Err(AuthError::InvalidCredentials {
                attempted_user_id: Some(user.id),
                reason: CredentialFailure::WrongPassword,
            });
        }

        Ok(Principal {
            id: user.id,
            username: user.username,
            role: user.role,
        })
    }

    async fn resolve_principal(&self, user_id: i32) -> Result<Option<Principal>, AuthError> {
        let user = self.store.users().get_by_id(user_id).await?;

        Ok(user.map(|u| Principal {
            id: u.id,
            username: u.username,
            role: u.role,
        }))
    }

    async fn forgot_password(&self, email: &str) -> Result<Option<i32>, AuthError> {
        let Some(user) = self.store.users().get_by_username(email).await? else {
            // Unknown account: do nothing, reveal nothing.
            debug!("Password reset requested for unknown account");
            return Ok(None);
        };

        let raw_token = self.issue_token(user.id, KIND_PASSWORD_RESET).await?;

        self.publish(DomainEvent::PasswordResetRequested {
            user_id: user.id,
            username: user.username,
            raw_token,
        });

        Ok(Some(user.id))
    }

    async fn validate_reset_token(&self, raw_token: &str) -> Result<(), AuthError> {
        self.find_live_token(raw_token, KIND_PASSWORD_RESET).await?;
        Ok(())
    }

    async fn reset_password(&self, raw_token: &str, new_password: &str) -> Result<i32, AuthError> {
        let evaluation = password_policy::evaluate(new_password);
        if !password_policy::is_acceptable(new_password) {
            return Err(AuthError::WeakPassword(evaluation));
        }

        let token = self.find_live_token(raw_token, KIND_PASSWORD_RESET).await?;
        let new_hash = self.hash_blocking(new_password).await?;

        // Consume and update atomically. The conditional single-row update
        // on `used = false` decides the race between concurrent resets;
        // the loser sees zero rows affected and gets a token-invalid error.
        let token_id = token.id;
        let user_id = token.user_id;
        let consumed = self
            .store
            .conn
            .transaction::<_, bool, DbErr>(move |txn| {
                Box::pin(async move {
                    let marked = password_reset_tokens::Entity::update_many()
                        .col_expr(password_reset_tokens::Column::Used, Expr::value(true))
                        .filter(password_reset_tokens::Column::Id.eq(token_id))
                        .filter(password_reset_tokens::Column::Used.eq(false))
                        .exec(txn)
                        .await?;

                    if marked.rows_affected != 1 {
                        return Ok(false);
                    }

                    users::Entity::update_many()
                        .col_expr(users::Column::PasswordHash, Expr::value(new_hash))
                        .filter(users::Column::Id.eq(user_id))
                        .exec(txn)
                        .await?;

                    Ok(true)
                })
            })
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        if !consumed {
            return Err(AuthError::TokenInvalid);
        }

        if let Some(user) = self.store.users().get_by_id(user_id).await? {
            self.publish(DomainEvent::PasswordResetCompleted {
                user_id,
                username: user.username,
            });
        }

        Ok(user_id)
    }

    async fn verify_email(&self, raw_token: &str) -> Result<(), AuthError> {
        let token = self
            .find_live_token(raw_token, KIND_EMAIL_VERIFICATION)
            .await?;

        if !self.store.tokens().mark_used(token.id).await? {
            return Err(AuthError::TokenInvalid);
        }

        self.store.users().set_email_verified(token.user_id).await?;

        Ok(())
    }
}
