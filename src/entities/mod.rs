pub mod prelude;

pub mod audit_logs;
pub mod categories;
pub mod collections;
pub mod journal_posts;
pub mod password_reset_tokens;
pub mod products;
pub mod site_settings;
pub mod subscribers;
pub mod users;
