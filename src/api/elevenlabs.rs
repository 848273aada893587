use crate::config::Config;
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

const TTS_TIMEOUT: Duration = Duration::from_secs(120);

/// Cloud voice: ElevenLabs text-to-speech, MP3 output.
pub struct ElevenLabsVoice {
    client: Client,
    api_key: String,
    model_id: String,
    base_url: String,
}

impl ElevenLabsVoice {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.elevenlabs_key.clone(),
            model_id: cfg.eleven_model_id.clone(),
            base_url: "https://api.elevenlabs.io".to_string(),
        }
    }

    fn endpoint(&self, voice_id: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}?output_format=mp3_44100_128",
            self.base_url, voice_id
        )
    }

    pub async fn tts_to_mp3(&self, text: &str, voice_id: &str, out_mp3_path: &Path) -> Result<()> {
        if self.api_key.is_empty() {
            anyhow::bail!("ElevenLabs API key not configured");
        }

        let body = serde_json::json!({
            "text": text,
            "model_id": self.model_id,
        });

        let resp = self
            .client
            .post(self.endpoint(voice_id))
            .header("Content-Type", "application/json")
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .timeout(TTS_TIMEOUT)
            .send()
            .await
            .context("ElevenLabs request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("ElevenLabs TTS failed HTTP {}", resp.status().as_u16());
        }

        let bytes = resp.bytes().await.context("ElevenLabs response read failed")?;
        if bytes.is_empty() {
            anyhow::bail!("ElevenLabs returned empty audio");
        }
        if let Some(parent) = out_mp3_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }
        fs::write(out_mp3_path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", out_mp3_path.display()))?;

        Ok(())
    }
}
