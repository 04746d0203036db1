pub mod csrf;
pub mod password_policy;
pub mod rate_limit;
pub mod tokens;

pub use password_policy::{PasswordEvaluation, Strength, evaluate, is_acceptable};
pub use rate_limit::{AuthLimiters, RateLimiter};
