//! Seams between the pipeline and the outside services it drives.
//!
//! Each trait is implemented once against a real service (see [`crate::api`],
//! [`crate::speech`]) and by in-memory fakes in tests.

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::topic::Topic;

/// Produces narration text for a topic.
#[async_trait]
pub trait ScriptProvider: Send + Sync {
    /// Returns generated text, or an error if the service could not produce any.
    /// Callers substitute the template on error.
    async fn generate(&self, topic: &Topic) -> Result<String>;
}

/// Turns narration into an audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str, out_path: &Path) -> Result<()>;
}

/// Searches and downloads stock footage into a directory.
#[async_trait]
pub trait FootageSource: Send + Sync {
    /// Returns the paths of the clips that were downloaded, possibly none.
    async fn fetch(&self, query: &str, dest_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Sends a finished video to one recipient.
#[async_trait]
pub trait Distributor: Send + Sync {
    async fn send_video(&self, chat_id: &str, video: &Path, caption: &str) -> Result<()>;
}
