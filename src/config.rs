use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub rate_limits: RateLimitsConfig,

    pub email: EmailConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/aurelia.db".to_string(),
            log_level: "info".to_string(),
            event_bus_buffer_size: 100,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Production mode. Enables the Secure flag on session cookies and
    /// refuses to start with the default session secret.
    pub production: bool,

    /// Session inactivity expiry in minutes.
    pub session_expiry_minutes: i64,

    /// Secret used to sign the session cookie. The default is for local
    /// development only; override via `AURELIA_SESSION_SECRET` in production.
    pub session_secret: String,
}

pub const DEFAULT_SESSION_SECRET: &str = "aurelia-dev-secret-change-me";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 4870,
            cors_allowed_origins: vec![
                "http://localhost:4870".to_string(),
                "http://127.0.0.1:4870".to_string(),
            ],
            production: false,
            session_expiry_minutes: 60,
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Username of the single designated primary administrator. Only this
    /// account may create or delete admin accounts.
    pub primary_admin: String,

    /// When true, registration responds with a verify-your-email message and
    /// a verification token is issued. Login is not blocked either way.
    pub email_verification_required: bool,

    /// Reset/verification token lifetime in minutes.
    pub token_expiry_minutes: i64,

    /// When true, the first `X-Forwarded-For` entry is used as the
    /// rate-limit client key; otherwise the peer address is used.
    pub trust_forwarded_for: bool,
}

impl SecurityConfig {
    /// The privilege boundary for admin-management mutations: only the one
    /// configured primary admin may create or delete admin accounts.
    #[must_use]
    pub fn is_primary_admin(&self, username: &str) -> bool {
        username == self.primary_admin
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            primary_admin: "admin".to_string(),
            email_verification_required: false,
            token_expiry_minutes: 60,
            trust_forwarded_for: true,
        }
    }
}

/// Per-route window/max pairs for the sensitive auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitsConfig {
    pub login: RouteLimitConfig,

    pub register: RouteLimitConfig,

    pub forgot_password: RouteLimitConfig,

    pub reset_password: RouteLimitConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RouteLimitConfig {
    pub max_attempts: usize,

    pub window_seconds: u64,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            login: RouteLimitConfig {
                max_attempts: 5,
                window_seconds: 15 * 60,
            },
            register: RouteLimitConfig {
                max_attempts: 3,
                window_seconds: 60 * 60,
            },
            forgot_password: RouteLimitConfig {
                max_attempts: 3,
                window_seconds: 60 * 60,
            },
            reset_password: RouteLimitConfig {
                max_attempts: 5,
                window_seconds: 15 * 60,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// When false, outgoing mail is logged instead of sent.
    pub enabled: bool,

    /// HTTP endpoint of the mail provider (JSON POST).
    pub provider_url: String,

    /// Provider API key, sent as a bearer token.
    pub api_key: String,

    pub from_address: String,

    /// Base URL used to build reset/verification links in messages.
    pub public_base_url: String,

    /// Address receiving new-registration notifications.
    pub admin_notification_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider_url: "http://localhost:8025/api/send".to_string(),
            api_key: String::new(),
            from_address: "no-reply@aurelia.store".to_string(),
            public_base_url: "http://localhost:4870".to_string(),
            admin_notification_address: "owner@aurelia.store".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            rate_limits: RateLimitsConfig::default(),
            email: EmailConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Loads `config.toml` from the working directory (falling back to
    /// defaults if absent) and applies environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = Path::new("config.toml");
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).context("Failed to read config.toml")?;
            toml::from_str(&raw).context("Failed to parse config.toml")?
        } else {
            info!("No config.toml found, using defaults");
            Self::default()
        };

        if let Ok(url) = std::env::var("AURELIA_DATABASE_URL") {
            config.general.database_path = url;
        }
        if let Ok(secret) = std::env::var("AURELIA_SESSION_SECRET") {
            config.server.session_secret = secret;
        }
        if let Ok(primary) = std::env::var("AURELIA_PRIMARY_ADMIN") {
            config.security.primary_admin = primary;
        }
        if let Ok(production) = std::env::var("AURELIA_PRODUCTION") {
            config.server.production = production == "1" || production.eq_ignore_ascii_case("true");
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.production && self.server.session_secret == DEFAULT_SESSION_SECRET {
            anyhow::bail!(
                "Refusing to start in production with the default session secret; set AURELIA_SESSION_SECRET"
            );
        }
        if self.security.primary_admin.trim().is_empty() {
            anyhow::bail!("security.primary_admin must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn production_rejects_default_secret() {
        let mut config = Config::default();
        config.server.production = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn primary_admin_policy_is_config_backed() {
        let mut security = SecurityConfig::default();
        assert!(security.is_primary_admin("admin"));
        assert!(!security.is_primary_admin("other"));

        security.primary_admin = "owner@aurelia.store".to_string();
        assert!(security.is_primary_admin("owner@aurelia.store"));
        assert!(!security.is_primary_admin("admin"));
    }

    #[test]
    fn route_limits_match_policy() {
        let limits = RateLimitsConfig::default();
        assert_eq!(limits.login.max_attempts, 5);
        assert_eq!(limits.login.window_seconds, 900);
        assert_eq!(limits.register.max_attempts, 3);
        assert_eq!(limits.forgot_password.window_seconds, 3600);
    }
}
