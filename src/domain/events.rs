//! Domain events for the application.
//!
//! Core operations publish these on the event bus after their own
//! transaction has committed; follow-up listeners (lead capture, admin
//! notification, outbound email) run with their own error isolation so
//! a slow or failing side effect never blocks the request.

use serde::Serialize;

/// Follow-up events published after a successful core mutation.
///
/// Raw tokens ride on the event so the email listener can build the
/// link; they are never persisted (only digests are stored) and never
/// serialized into logs.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum DomainEvent {
    UserRegistered {
        user_id: i32,
        username: String,
        consent_marketing: bool,
    },
    VerificationRequested {
        user_id: i32,
        username: String,
        #[serde(skip_serializing)]
        raw_token: String,
    },
    PasswordResetRequested {
        user_id: i32,
        username: String,
        #[serde(skip_serializing)]
        raw_token: String,
    },
    PasswordResetCompleted {
        user_id: i32,
        username: String,
    },
}
