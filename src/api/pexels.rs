use crate::config::Config;
use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(90);
const PER_PAGE: u32 = 15;

#[derive(Debug, Clone, Deserialize)]
pub struct VideoFile {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoItem {
    pub id: u64,
    #[serde(default)]
    pub video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<VideoItem>,
}

impl VideoItem {
    /// MP4 variants as `(link, height)`, tallest first.
    pub fn mp4_variants(&self) -> Vec<(String, u32)> {
        let mut out: Vec<(String, u32)> = self
            .video_files
            .iter()
            .filter(|f| f.file_type.as_deref() == Some("video/mp4"))
            .filter_map(|f| Some((f.link.clone()?, f.height.unwrap_or(0))))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        out
    }

    /// Second-tallest MP4 variant, or the only one. Skips 4K-class files without
    /// settling for the smallest rendition.
    pub fn preferred_variant(&self) -> Option<(String, u32)> {
        let variants = self.mp4_variants();
        let idx = variants.len().checked_sub(1)?.min(1);
        variants.into_iter().nth(idx)
    }
}

pub struct PexelsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl PexelsClient {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.pexels_key.clone(),
            base_url: "https://api.pexels.com".to_string(),
        }
    }

    pub async fn search_videos(&self, query: &str) -> Result<Vec<VideoItem>> {
        let per_page = PER_PAGE.to_string();
        let resp = self
            .client
            .get(format!("{}/videos/search", self.base_url))
            .header("Authorization", &self.api_key)
            .query(&[("query", query), ("per_page", per_page.as_str())])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await
            .context("Pexels search request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Pexels search HTTP {}", resp.status().as_u16());
        }

        let parsed: SearchResponse = resp.json().await.context("Pexels search parse failed")?;
        Ok(parsed.videos)
    }

    /// Streams `url` into `dest`; a partial file is removed on failure.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let result = self.download_inner(url, dest).await;
        if result.is_err() {
            let _ = fs::remove_file(dest).await;
        }
        result
    }

    async fn download_inner(&self, url: &str, dest: &Path) -> Result<()> {
        let resp = self
            .client
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("download request failed: {url}"))?;

        if !resp.status().is_success() {
            anyhow::bail!("download HTTP {} for {}", resp.status().as_u16(), url);
        }

        let mut out = fs::File::create(dest)
            .await
            .with_context(|| format!("create {}", dest.display()))?;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("download stream interrupted")?;
            out.write_all(&chunk).await?;
        }
        out.flush().await?;
        Ok(())
    }
}
