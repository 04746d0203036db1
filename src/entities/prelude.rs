pub use super::audit_logs::Entity as AuditLogs;
pub use super::categories::Entity as Categories;
pub use super::collections::Entity as Collections;
pub use super::journal_posts::Entity as JournalPosts;
pub use super::password_reset_tokens::Entity as PasswordResetTokens;
pub use super::products::Entity as Products;
pub use super::site_settings::Entity as SiteSettings;
pub use super::subscribers::Entity as Subscribers;
pub use super::users::Entity as Users;
