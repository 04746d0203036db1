use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::entities::site_settings::{self, Entity as SiteSettings};

const SETTINGS_ROW_ID: i32 = 1;

pub struct SettingsRepository {
    conn: DatabaseConnection,
}

impl SettingsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// The branding row is seeded by the initial migration and always exists.
    pub async fn get(&self) -> Result<site_settings::Model> {
        SiteSettings::find_by_id(SETTINGS_ROW_ID)
            .one(&self.conn)
            .await
            .context("Failed to query site settings")?
            .ok_or_else(|| anyhow::anyhow!("Site settings row missing"))
    }

    pub async fn update(
        &self,
        store_name: &str,
        tagline: Option<String>,
        logo_url: Option<String>,
        accent_color: Option<String>,
    ) -> Result<site_settings::Model> {
        let existing = self.get().await?;

        let mut active: site_settings::ActiveModel = existing.into();
        active.store_name = Set(store_name.to_string());
        active.tagline = Set(tagline);
        active.logo_url = Set(logo_url);
        active.accent_color = Set(accent_color);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        active.update(&self.conn).await.context("Failed to update site settings")
    }
}
