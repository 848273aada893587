use crate::config::Config;
use crate::logi;
use crate::platform;
use anyhow::{Context, Result};
use tokio::fs;

const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    if !cfg.output_dir.exists() {
        fs::create_dir_all(&cfg.output_dir)
            .await
            .with_context(|| format!("create {}", cfg.output_dir.display()))?;
        logi(format!("Created directory: {}", cfg.output_dir.display()));
    }
    Ok(())
}

/// Media tools that are missing from PATH or fail to report a version.
pub async fn missing_tools() -> Vec<&'static str> {
    let mut missing = Vec::new();
    for tool in REQUIRED_TOOLS {
        if platform::find_in_path(tool).is_none() || !tool_runs(tool).await {
            missing.push(*tool);
        }
    }
    missing
}

async fn tool_runs(tool: &str) -> bool {
    match tokio::process::Command::new(tool)
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
