//! Best-effort audit trail writer.
//!
//! Every security-relevant transition appends one row. Writes never fail
//! the request that triggered them; a failed append is logged and dropped.

use tracing::warn;

use crate::db::Store;

pub const ACTION_REGISTER: &str = "register";
pub const ACTION_LOGIN: &str = "login";
pub const ACTION_LOGIN_FAILED: &str = "login_failed";
pub const ACTION_LOGOUT: &str = "logout";
pub const ACTION_PASSWORD_RESET_REQUEST: &str = "password_reset_request";
pub const ACTION_PASSWORD_RESET_COMPLETE: &str = "password_reset_complete";

/// Request metadata attached to every audit row.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

pub struct AuditService {
    store: Store,
}

impl AuditService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Appends an audit row. Infallible by contract: storage errors are
    /// logged at warn and swallowed.
    pub async fn record(
        &self,
        user_id: Option<i32>,
        action: &str,
        meta: &RequestMeta,
        details: Option<serde_json::Value>,
    ) {
        let details = details.map(|d| d.to_string());

        if let Err(e) = self
            .store
            .audit()
            .append(
                user_id,
                action,
                meta.ip_address.as_deref(),
                meta.user_agent.as_deref(),
                details,
            )
            .await
        {
            warn!(error = %e, action, "Failed to append audit log entry");
        }
    }
}
