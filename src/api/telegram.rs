use crate::capabilities::Distributor;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Telegram Bot API `sendVideo`.
pub struct TelegramBot {
    client: Client,
    token: String,
    base_url: String,
}

impl TelegramBot {
    pub fn new(client: Client, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
            base_url: "https://api.telegram.org".to_string(),
        }
    }

    fn send_video_url(&self) -> String {
        format!("{}/bot{}/sendVideo", self.base_url, self.token)
    }
}

fn describe_failure(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("description").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(300).collect())
}

#[async_trait]
impl Distributor for TelegramBot {
    async fn send_video(&self, chat_id: &str, video: &Path, caption: &str) -> Result<()> {
        let bytes = fs::read(video)
            .await
            .with_context(|| format!("read video {}", video.display()))?;
        let part = Part::bytes(bytes)
            .file_name("video.mp4")
            .mime_str("video/mp4")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("disable_notification", "true")
            .part("video", part);

        let resp = self
            .client
            .post(self.send_video_url())
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await
            .context("sendVideo request failed")?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "sendVideo failed for {} (HTTP {}): {}",
                chat_id,
                status.as_u16(),
                describe_failure(&body)
            );
        }
        Ok(())
    }
}
