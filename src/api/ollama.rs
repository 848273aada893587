use crate::capabilities::ScriptProvider;
use crate::config::Config;
use crate::logw;
use crate::topic::Topic;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

fn build_prompt(topic: &Topic) -> String {
    format!(
        "Write a 30-second, 65–85 word script in a calm, practical tone for a survival/preparedness short.\nTopic: {}\nRequirements:\n- Direct, prescriptive tips\n- No fear-mongering\n- End with a one-sentence takeaway\n",
        topic
    )
}

fn ollama_extract_message_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error").and_then(|v| v.as_str()) {
        logw(format!("Ollama error message: {}", err));
        return None;
    }

    let text = root.get("message")?.get("content")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

/// Chat-completion script writer backed by an Ollama server.
pub struct OllamaScriptProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaScriptProvider {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            base_url: cfg.ollama_url.clone(),
            model: cfg.ollama_model.clone(),
        }
    }
}

#[async_trait]
impl ScriptProvider for OllamaScriptProvider {
    async fn generate(&self, topic: &Topic) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You write concise 30-second scripts for survival tips."},
                {"role": "user", "content": build_prompt(topic)},
            ],
            "stream": false,
            "options": {"temperature": 0.5, "num_predict": 200},
        });

        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .timeout(CHAT_TIMEOUT)
            .send()
            .await
            .context("Ollama request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            let snippet = raw.chars().take(400).collect::<String>();
            anyhow::bail!("Ollama HTTP {}: {}", status.as_u16(), snippet);
        }

        ollama_extract_message_text(&raw).context("Ollama response had no message content")
    }
}
