use crate::api::pexels::PexelsClient;
use crate::capabilities::FootageSource;
use crate::error::PipelineError;
use crate::{logi, logok, logw};
use anyhow::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};

/// Pexels-backed footage: shuffled results, preferred MP4 variant, capped downloads.
pub struct PexelsFootage {
    pexels: PexelsClient,
    max_downloads: usize,
}

impl PexelsFootage {
    pub fn new(pexels: PexelsClient, max_downloads: usize) -> Self {
        Self {
            pexels,
            max_downloads,
        }
    }
}

#[async_trait]
impl FootageSource for PexelsFootage {
    async fn fetch(&self, query: &str, dest_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut videos = self.pexels.search_videos(query).await?;
        logi(format!("Pexels returned {} videos for {:?}", videos.len(), query));
        videos.shuffle(&mut rand::thread_rng());

        let mut paths = Vec::new();
        for video in &videos {
            let Some((link, height)) = video.preferred_variant() else {
                continue;
            };
            let dest = dest_dir.join(format!("pexels_{}.mp4", video.id));
            match self.pexels.download(&link, &dest).await {
                Ok(()) => {
                    logok(format!("Downloaded {}p clip -> {}", height, dest.display()));
                    paths.push(dest);
                    if paths.len() >= self.max_downloads {
                        break;
                    }
                }
                Err(err) => logw(format!("Skipping clip {}: {:#}", video.id, err)),
            }
        }
        Ok(paths)
    }
}

/// Tries each query in turn until one yields clips. Search errors count as an empty result.
pub async fn gather_clips(
    source: &dyn FootageSource,
    queries: &[String],
    dest_dir: &Path,
) -> Result<Vec<PathBuf>> {
    for query in queries {
        match source.fetch(query, dest_dir).await {
            Ok(clips) if !clips.is_empty() => return Ok(clips),
            Ok(_) => logw(format!("No clips for query {:?}", query)),
            Err(err) => logw(format!("Footage search failed for {:?}: {:#}", query, err)),
        }
    }
    Err(PipelineError::NoFootage {
        queries: queries.to_vec(),
    }
    .into())
}
