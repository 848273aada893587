//! One end-to-end run: script, voice, footage, assembly, captions, delivery.
//!
//! Steps run strictly in that order. Downloads and narration live in a per-run
//! temporary workspace that is removed when the run ends, whatever the outcome.

use crate::api::elevenlabs::ElevenLabsVoice;
use crate::api::ollama::OllamaScriptProvider;
use crate::api::pexels::PexelsClient;
use crate::api::telegram::TelegramBot;
use crate::assembler::{AssemblySettings, ClipAssembler, VideoEditor};
use crate::capabilities::{Distributor, FootageSource, ScriptProvider, SpeechSynthesizer};
use crate::captions;
use crate::config::Config;
use crate::distribution::{self, DeliveryReport};
use crate::ffmpeg::FfmpegEditor;
use crate::footage::{self, PexelsFootage};
use crate::platform;
use crate::script;
use crate::speech::{BackendSpeech, LocalSayVoice};
use crate::subscribers;
use crate::topic::{GENERIC_QUERY, Topic};
use crate::{logi, logok};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Where a run's durable artifacts go.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub video: PathBuf,
    pub captions: PathBuf,
    pub script: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, topic: &Topic, date: NaiveDate) -> Self {
        let date = date.format("%Y-%m-%d").to_string();
        let stem = format!("daily_video_{}_{}", topic.slug(), date);
        Self {
            video: dir.join(format!("{stem}.mp4")),
            captions: dir.join(format!("{stem}.srt")),
            script: dir.join(format!("script_{date}.txt")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub topic: Topic,
    pub outputs: OutputPaths,
    pub script: String,
    pub segments: usize,
    pub cues: usize,
    /// `None` when no messaging token is configured.
    pub delivery: Option<DeliveryReport>,
}

/// The outside services a run depends on.
pub struct Services {
    pub script: Box<dyn ScriptProvider>,
    pub speech: Box<dyn SpeechSynthesizer>,
    pub footage: Box<dyn FootageSource>,
    pub distributor: Option<Box<dyn Distributor>>,
}

impl Services {
    /// Real service clients for `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        let speech = BackendSpeech::new(
            cfg.tts_backend,
            Box::new(ElevenLabsVoice::new(client.clone(), cfg)),
            Box::new(LocalSayVoice),
            platform::local_synthesis_available(),
        );
        let footage = PexelsFootage::new(PexelsClient::new(client.clone(), cfg), cfg.max_downloads);
        let distributor: Option<Box<dyn Distributor>> = if cfg.telegram_token.is_empty() {
            None
        } else {
            Some(Box::new(TelegramBot::new(client.clone(), cfg.telegram_token.clone())))
        };

        Ok(Self {
            script: Box::new(OllamaScriptProvider::new(client, cfg)),
            speech: Box::new(speech),
            footage: Box::new(footage),
            distributor,
        })
    }
}

pub struct Pipeline<E: VideoEditor> {
    cfg: Config,
    services: Services,
    assembler: ClipAssembler<E>,
}

impl Pipeline<FfmpegEditor> {
    /// Rejects a config that could never voice a script, before any service is called.
    pub fn from_config(cfg: Config) -> Result<Self> {
        cfg.check_speech(platform::local_synthesis_available())?;
        let services = Services::from_config(&cfg)?;
        Ok(Self::new(cfg, services, FfmpegEditor))
    }
}

impl<E: VideoEditor> Pipeline<E> {
    pub fn new(cfg: Config, services: Services, editor: E) -> Self {
        let assembler = ClipAssembler::new(editor, AssemblySettings::from(&cfg));
        Self {
            cfg,
            services,
            assembler,
        }
    }

    /// Random topic, today's date.
    pub async fn run_today(&self) -> Result<RunSummary> {
        let topic = Topic::pick(&mut rand::thread_rng());
        let date = chrono::Local::now().date_naive();
        self.run(&topic, date).await
    }

    pub async fn run(&self, topic: &Topic, date: NaiveDate) -> Result<RunSummary> {
        fs::create_dir_all(&self.cfg.output_dir)
            .await
            .with_context(|| format!("create output dir {}", self.cfg.output_dir.display()))?;
        let outputs = OutputPaths::new(&self.cfg.output_dir, topic, date);

        let workspace = tempfile::Builder::new()
            .prefix("dailyvid_")
            .tempdir()
            .context("Failed to create workspace")?;
        logi(format!("=== {} === (workspace {})", topic, workspace.path().display()));

        // dropping the workspace deletes it, success or failure
        let summary = self.run_in(workspace.path(), topic, date, outputs).await;
        drop(workspace);
        summary
    }

    async fn run_in(
        &self,
        work: &Path,
        topic: &Topic,
        date: NaiveDate,
        outputs: OutputPaths,
    ) -> Result<RunSummary> {
        let target = self.assembler.settings().target;

        logi("Step 1/6: script");
        let script = script::write_script(self.services.script.as_ref(), topic).await;
        fs::write(&outputs.script, &script)
            .await
            .with_context(|| format!("write {}", outputs.script.display()))?;

        logi("Step 2/6: voiceover");
        let voice = work.join(format!("voice_{}.mp3", date.format("%Y-%m-%d")));
        self.services
            .speech
            .synthesize(&script, &self.cfg.voice, &voice)
            .await
            .context("Speech synthesis failed")?;
        logok(format!("Voiceover ready: {}", voice.display()));

        logi("Step 3/6: footage");
        let queries = vec![topic.footage_query(), GENERIC_QUERY.to_string()];
        let clips = footage::gather_clips(self.services.footage.as_ref(), &queries, work).await?;
        logok(format!("{} clips downloaded", clips.len()));

        logi("Step 4/6: assembly");
        let report = self.assembler.assemble(&clips, &voice, &outputs.video).await?;

        logi("Step 5/6: captions");
        let cues = captions::write_srt(&outputs.captions, &script, target).await?;
        logok(format!("Generated: {}", outputs.video.display()));

        logi("Step 6/6: delivery");
        let delivery = match &self.services.distributor {
            None => {
                logi("No TELEGRAM_BOT_TOKEN set; skipping send.");
                None
            }
            Some(distributor) => Some(self.deliver(distributor.as_ref(), topic, &outputs.video).await),
        };

        Ok(RunSummary {
            topic: topic.clone(),
            outputs,
            script,
            segments: report.segments.len(),
            cues: cues.len(),
            delivery,
        })
    }

    async fn deliver(&self, distributor: &dyn Distributor, topic: &Topic, video: &Path) -> DeliveryReport {
        let caption = distribution::caption_for(topic);

        let subscribers: Vec<String> = subscribers::load_subscribers(&self.cfg.subscribers_file)
            .await
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        let mut report = distribution::broadcast(distributor, &subscribers, video, &caption).await;

        if !self.cfg.target_chats.is_empty() {
            let targets =
                distribution::broadcast(distributor, &self.cfg.target_chats, video, &caption).await;
            report.merge(targets);
        }
        report
    }
}
