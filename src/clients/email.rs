//! Outbound mail via an HTTP provider.
//!
//! The provider is an opaque JSON endpoint; when `email.enabled` is false
//! (the default, and all tests) messages are logged instead of sent. Raw
//! tokens only ever appear in the link inside the message body, never in
//! log output.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use crate::config::EmailConfig;

#[derive(Serialize)]
struct OutboundMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    config: EmailConfig,
}

impl EmailClient {
    #[must_use]
    pub fn new(config: EmailConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    pub async fn send_password_reset(&self, to: &str, raw_token: &str) -> Result<()> {
        let link = format!(
            "{}/reset-password?token={raw_token}",
            self.config.public_base_url
        );
        let body = format!(
            "A password reset was requested for your account.\n\n\
             Reset your password here: {link}\n\n\
             The link expires in one hour. If you did not request this, you can ignore this message."
        );

        self.send(to, "Reset your password", &body).await
    }

    pub async fn send_verification(&self, to: &str, raw_token: &str) -> Result<()> {
        let link = format!(
            "{}/verify-email?token={raw_token}",
            self.config.public_base_url
        );
        let body = format!("Welcome! Please confirm your email address: {link}");

        self.send(to, "Confirm your email address", &body).await
    }

    pub async fn send_admin_notification(&self, new_username: &str) -> Result<()> {
        let to = self.config.admin_notification_address.clone();
        let body = format!("A new customer account was registered: {new_username}");

        self.send(&to, "New account registered", &body).await
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if !self.config.enabled {
            info!(to, subject, "Email sending disabled, message not sent");
            return Ok(());
        }

        let message = OutboundMessage {
            from: &self.config.from_address,
            to,
            subject,
            body,
        };

        let response = self
            .client
            .post(&self.config.provider_url)
            .bearer_auth(&self.config.api_key)
            .json(&message)
            .send()
            .await
            .context("Failed to reach email provider")?;

        response
            .error_for_status()
            .context("Email provider rejected the message")?;

        Ok(())
    }
}
