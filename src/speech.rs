use crate::api::elevenlabs::ElevenLabsVoice;
use crate::capabilities::SpeechSynthesizer;
use crate::config::TtsBackend;
use crate::error::PipelineError;
use crate::ffmpeg;
use crate::{logi, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tokio::process::Command;

const SAY_RATE: &str = "190";

#[async_trait]
impl SpeechSynthesizer for ElevenLabsVoice {
    async fn synthesize(&self, text: &str, voice: &str, out_path: &Path) -> Result<()> {
        self.tts_to_mp3(text, voice, out_path).await
    }
}

/// ElevenLabs "George", the default `VOX`.
const ELEVENLABS_GEORGE: &str = "JBFqnCBsd6RMkjVDRZzb";

/// Maps a cloud voice (Edge name or ElevenLabs voice id) onto a macOS voice.
pub fn mac_voice_for(voice_hint: &str) -> &'static str {
    match voice_hint {
        "en-US-GuyNeural" | ELEVENLABS_GEORGE => "Alex",
        _ => "Samantha",
    }
}

/// macOS `say` to AIFF, then AAC through ffmpeg, moved onto the requested path.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSayVoice;

#[async_trait]
impl SpeechSynthesizer for LocalSayVoice {
    async fn synthesize(&self, text: &str, voice: &str, out_path: &Path) -> Result<()> {
        let aiff = out_path.with_extension("aiff");
        let m4a = out_path.with_extension("m4a");

        let result = async {
            let status = Command::new("say")
                .args(["-v", mac_voice_for(voice), "-r", SAY_RATE, "-o"])
                .arg(&aiff)
                .arg(text)
                .status()
                .await
                .context("failed to launch say")?;
            if !status.success() {
                anyhow::bail!("say exited with {}", status);
            }

            if !ffmpeg::ffmpeg_transcode_aac(&aiff, &m4a).await? {
                anyhow::bail!("ffmpeg produced no audio at {}", m4a.display());
            }
            if m4a != out_path {
                fs::rename(&m4a, out_path)
                    .await
                    .with_context(|| format!("move {} -> {}", m4a.display(), out_path.display()))?;
            }
            Ok::<(), anyhow::Error>(())
        }
        .await;

        let _ = fs::remove_file(&aiff).await;
        result
    }
}

/// Picks between the cloud and local engines according to [`TtsBackend`].
pub struct BackendSpeech {
    backend: TtsBackend,
    cloud: Box<dyn SpeechSynthesizer>,
    local: Box<dyn SpeechSynthesizer>,
    local_available: bool,
}

impl BackendSpeech {
    pub fn new(
        backend: TtsBackend,
        cloud: Box<dyn SpeechSynthesizer>,
        local: Box<dyn SpeechSynthesizer>,
        local_available: bool,
    ) -> Self {
        Self {
            backend,
            cloud,
            local,
            local_available,
        }
    }

    async fn speak_locally(&self, text: &str, voice: &str, out_path: &Path) -> Result<()> {
        if !self.local_available {
            return Err(PipelineError::LocalSynthesisUnavailable.into());
        }
        self.local.synthesize(text, voice, out_path).await
    }
}

#[async_trait]
impl SpeechSynthesizer for BackendSpeech {
    async fn synthesize(&self, text: &str, voice: &str, out_path: &Path) -> Result<()> {
        match self.backend {
            TtsBackend::Local => self.speak_locally(text, voice, out_path).await,
            TtsBackend::Cloud => self.cloud.synthesize(text, voice, out_path).await,
            TtsBackend::Auto => match self.cloud.synthesize(text, voice, out_path).await {
                Ok(()) => Ok(()),
                Err(err) if self.local_available => {
                    logw(format!("Cloud TTS failed ({:#}).", err));
                    logi("Falling back to local voice.");
                    self.local.synthesize(text, voice, out_path).await
                }
                Err(err) => Err(err.context("cloud TTS failed and no local voice is available")),
            },
        }
    }
}
