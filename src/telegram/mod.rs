pub mod message;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info};

use crate::config::TelegramCredentials;

const TEXT_TIMEOUT: Duration = Duration::from_secs(5);
const PHOTO_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers formatted messages to the configured chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a photo with `message` as caption, or plain text when there is no image.
    async fn send(&self, message: &str, image_url: Option<&str>) -> Result<()>;
}

pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    credentials: TelegramCredentials,
}

impl TelegramNotifier {
    pub fn new(client: Client, api_url: impl Into<String>, credentials: TelegramCredentials) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            credentials,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_url.trim_end_matches('/'),
            self.credentials.bot_token,
            method
        )
    }

    /// Calls `getMe` to confirm the bot token works.
    pub async fn check_connection(&self) -> Result<()> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .timeout(TEXT_TIMEOUT)
            .send()
            .await
            .context("Failed to reach Telegram API")?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Telegram getMe failed: {}", response.status()))
        }
    }

    async fn post_form(&self, method: &str, form: &[(&str, &str)], timeout: Duration) -> Result<()> {
        let response = self
            .client
            .post(self.method_url(method))
            .form(form)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("Failed to send Telegram {}", method))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!("Telegram {} failed with status {}: {}", method, status, error_text);
            Err(anyhow::anyhow!("Telegram {} failed: {} - {}", method, status, error_text))
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str, image_url: Option<&str>) -> Result<()> {
        let chat_id = self.credentials.chat_id.as_str();

        match image_url {
            Some(photo) => {
                self.post_form(
                    "sendPhoto",
                    &[
                        ("chat_id", chat_id),
                        ("photo", photo),
                        ("caption", message),
                        ("parse_mode", "HTML"),
                    ],
                    PHOTO_TIMEOUT,
                )
                .await?;
                info!("Sent photo: {}", message.lines().next().unwrap_or_default());
            }
            None => {
                self.post_form(
                    "sendMessage",
                    &[("chat_id", chat_id), ("text", message), ("parse_mode", "HTML")],
                    TEXT_TIMEOUT,
                )
                .await?;
                info!("Sent message: {}", message.chars().take(50).collect::<String>());
            }
        }
        Ok(())
    }
}
