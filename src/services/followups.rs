//! Fire-and-forget follow-ups driven by the event bus.
//!
//! Core operations commit first, publish an event, and respond; this
//! listener then runs the side effects (lead capture, admin notification,
//! outbound email) with its own error boundary. A failure here is logged
//! and never reaches the original request.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::clients::email::EmailClient;
use crate::db::repositories::subscriber::SOURCE_LEAD;
use crate::db::Store;
use crate::domain::events::DomainEvent;

pub struct FollowupService {
    store: Store,
    email: Arc<EmailClient>,
    event_bus: broadcast::Sender<DomainEvent>,
}

impl FollowupService {
    #[must_use]
    pub const fn new(
        store: Store,
        email: Arc<EmailClient>,
        event_bus: broadcast::Sender<DomainEvent>,
    ) -> Self {
        Self {
            store,
            email,
            event_bus,
        }
    }

    pub fn start_listener(self: Arc<Self>) {
        let mut rx = self.event_bus.subscribe();
        let service = self;

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => service.handle_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!(count, "Follow-up listener lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!("Follow-up listener event bus closed");
                        break;
                    }
                }
            }
        });
    }

    async fn handle_event(&self, event: DomainEvent) {
        match event {
            DomainEvent::UserRegistered {
                username,
                consent_marketing,
                ..
            } => {
                if let Err(e) = self
                    .store
                    .subscribers()
                    .insert_if_absent(&username, SOURCE_LEAD, consent_marketing)
                    .await
                {
                    warn!(error = %e, "Failed to auto-create lead subscriber");
                }

                if let Err(e) = self.email.send_admin_notification(&username).await {
                    warn!(error = %e, "Failed to send new-registration notification");
                }
            }

            DomainEvent::VerificationRequested {
                username,
                raw_token,
                ..
            } => {
                if let Err(e) = self.email.send_verification(&username, &raw_token).await {
                    warn!(error = %e, "Failed to send verification email");
                }
            }

            DomainEvent::PasswordResetRequested {
                username,
                raw_token,
                ..
            } => {
                if let Err(e) = self.email.send_password_reset(&username, &raw_token).await {
                    warn!(error = %e, "Failed to send password reset email");
                }
            }

            DomainEvent::PasswordResetCompleted { user_id, .. } => {
                info!(user_id, "Password reset completed");
            }
        }
    }
}
