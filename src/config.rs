use crate::error::PipelineError;
use anyhow::Result;
use std::path::PathBuf;
use std::str::FromStr;

/// Which speech engine narrates the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsBackend {
    /// Cloud voice first, local voice if the cloud call fails and one is available.
    #[default]
    Auto,
    /// Cloud voice only.
    Cloud,
    /// Local command-line voice only.
    Local,
}

impl FromStr for TtsBackend {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "edge" | "cloud" => Ok(Self::Cloud),
            "say" | "local" => Ok(Self::Local),
            other => Err(PipelineError::InvalidConfig(format!(
                "TTS_BACKEND must be edge, say or empty (got {other:?})"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub pexels_key: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub voice: String,
    pub elevenlabs_key: String,
    pub eleven_model_id: String,
    pub telegram_token: String,
    pub subscribers_file: PathBuf,
    pub output_dir: PathBuf,
    pub bitrate: String,
    pub target_chats: Vec<String>,
    pub tts_backend: TtsBackend,
    pub target_seconds: f64,
    pub min_clip: f64,
    pub max_clip: f64,
    pub max_downloads: usize,
}

fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_ollama_model() -> String {
    "qwen2.5".to_string()
}

fn default_voice() -> String {
    "JBFqnCBsd6RMkjVDRZzb".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_subscribers_file() -> PathBuf {
    PathBuf::from("subscribers.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("daily_videos")
}

fn default_bitrate() -> String {
    "3500k".to_string()
}

fn default_target_seconds() -> f64 {
    30.0
}

fn default_min_clip() -> f64 {
    5.0
}

fn default_max_clip() -> f64 {
    12.0
}

fn default_max_downloads() -> usize {
    6
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pexels_key: String::new(),
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
            voice: default_voice(),
            elevenlabs_key: String::new(),
            eleven_model_id: default_model_id(),
            telegram_token: String::new(),
            subscribers_file: default_subscribers_file(),
            output_dir: default_output_dir(),
            bitrate: default_bitrate(),
            target_chats: Vec::new(),
            tts_backend: TtsBackend::Auto,
            target_seconds: default_target_seconds(),
            min_clip: default_min_clip(),
            max_clip: default_max_clip(),
            max_downloads: default_max_downloads(),
        }
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, PipelineError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| PipelineError::InvalidConfig(format!("{key} is not a number: {raw:?}")))
}

fn split_targets(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Config::default();

        if let Some(v) = get("PEXELS_API_KEY") {
            cfg.pexels_key = v.trim().to_string();
        }
        if let Some(v) = get("OLLAMA_URL") {
            cfg.ollama_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            cfg.ollama_model = v;
        }
        if let Some(v) = get("VOX") {
            cfg.voice = v;
        }
        if let Some(v) = get("ELEVENLABS_API_KEY") {
            cfg.elevenlabs_key = v.trim().to_string();
        }
        if let Some(v) = get("ELEVEN_MODEL_ID") {
            cfg.eleven_model_id = v;
        }
        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            cfg.telegram_token = v.trim().to_string();
        }
        if let Some(v) = get("SUBSCRIBERS_FILE") {
            cfg.subscribers_file = PathBuf::from(v);
        }
        if let Some(v) = get("VIDEO_DIR") {
            cfg.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("EXPORT_BITRATE") {
            cfg.bitrate = v.trim().to_string();
        }
        if let Some(v) = get("TARGET_CHAT") {
            cfg.target_chats = split_targets(&v);
        }
        if let Some(v) = get("TTS_BACKEND") {
            cfg.tts_backend = v.parse()?;
        }
        if let Some(v) = get("TARGET_SECONDS") {
            cfg.target_seconds = parse_number("TARGET_SECONDS", &v)?;
        }
        if let Some(v) = get("MIN_CLIP") {
            cfg.min_clip = parse_number("MIN_CLIP", &v)?;
        }
        if let Some(v) = get("MAX_CLIP") {
            cfg.max_clip = parse_number("MAX_CLIP", &v)?;
        }
        if let Some(v) = get("MAX_DOWNLOADS") {
            cfg.max_downloads = parse_number("MAX_DOWNLOADS", &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.pexels_key.is_empty() {
            return Err(PipelineError::MissingApiKey { name: "PEXELS_API_KEY" });
        }
        if self.tts_backend == TtsBackend::Cloud && self.elevenlabs_key.is_empty() {
            return Err(PipelineError::MissingApiKey { name: "ELEVENLABS_API_KEY" });
        }
        if !(self.target_seconds.is_finite() && self.target_seconds > 0.0) {
            return Err(PipelineError::InvalidConfig(
                "TARGET_SECONDS must be positive".to_string(),
            ));
        }
        if !(self.min_clip > 0.0 && self.max_clip.is_finite() && self.min_clip <= self.max_clip) {
            return Err(PipelineError::InvalidConfig(format!(
                "clip bounds must satisfy 0 < MIN_CLIP <= MAX_CLIP (got {} / {})",
                self.min_clip, self.max_clip
            )));
        }
        if self.max_downloads == 0 {
            return Err(PipelineError::InvalidConfig(
                "MAX_DOWNLOADS must be at least 1".to_string(),
            ));
        }
        if !is_valid_bitrate(&self.bitrate) {
            return Err(PipelineError::InvalidConfig(format!(
                "EXPORT_BITRATE must look like 3500k (got {:?})",
                self.bitrate
            )));
        }
        Ok(())
    }

    pub fn has_cloud_voice(&self) -> bool {
        !self.elevenlabs_key.is_empty()
    }

    /// Fails when the selected backend can never produce a voiceover on this host.
    pub fn check_speech(&self, local_available: bool) -> Result<(), PipelineError> {
        match self.tts_backend {
            TtsBackend::Local if !local_available => Err(PipelineError::LocalSynthesisUnavailable),
            TtsBackend::Auto if !self.has_cloud_voice() && !local_available => {
                Err(PipelineError::MissingApiKey { name: "ELEVENLABS_API_KEY" })
            }
            _ => Ok(()),
        }
    }
}

/// Digits with an optional k/K/M suffix, the form ffmpeg accepts for `-b:v`.
fn is_valid_bitrate(s: &str) -> bool {
    let digits = s.trim_end_matches(['k', 'K', 'M']);
    !digits.is_empty() && digits.len() + 1 >= s.len() && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_pexels_key() {
        let cfg = Config::from_lookup(lookup_from(&[("PEXELS_API_KEY", "abc")])).unwrap();
        assert_eq!(cfg.target_seconds, 30.0);
        assert_eq!(cfg.min_clip, 5.0);
        assert_eq!(cfg.max_clip, 12.0);
        assert_eq!(cfg.bitrate, "3500k");
        assert_eq!(cfg.tts_backend, TtsBackend::Auto);
        assert_eq!(cfg.output_dir, PathBuf::from("daily_videos"));
        assert!(cfg.target_chats.is_empty());
    }

    #[test]
    fn test_missing_pexels_key_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        let err = err.downcast::<PipelineError>().unwrap();
        assert!(matches!(err, PipelineError::MissingApiKey { name: "PEXELS_API_KEY" }));
    }

    #[test]
    fn test_target_chat_csv_is_split() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("PEXELS_API_KEY", "abc"),
            ("TARGET_CHAT", " @my_channel, ,-1001234567890 "),
        ]))
        .unwrap();
        assert_eq!(cfg.target_chats, vec!["@my_channel", "-1001234567890"]);
    }

    #[test]
    fn test_backend_names() {
        assert_eq!("edge".parse::<TtsBackend>().unwrap(), TtsBackend::Cloud);
        assert_eq!("SAY".parse::<TtsBackend>().unwrap(), TtsBackend::Local);
        assert_eq!("".parse::<TtsBackend>().unwrap(), TtsBackend::Auto);
        assert!("polly".parse::<TtsBackend>().is_err());
    }

    #[test]
    fn test_forced_cloud_needs_key() {
        let res = Config::from_lookup(lookup_from(&[
            ("PEXELS_API_KEY", "abc"),
            ("TTS_BACKEND", "edge"),
        ]));
        assert!(res.is_err());
    }

    #[test]
    fn test_invalid_clip_bounds() {
        let mut cfg = Config {
            pexels_key: "abc".into(),
            ..Config::default()
        };
        cfg.min_clip = 15.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bitrate_format() {
        assert!(is_valid_bitrate("3500k"));
        assert!(is_valid_bitrate("4M"));
        assert!(is_valid_bitrate("800000"));
        assert!(!is_valid_bitrate("fast"));
        assert!(!is_valid_bitrate("k"));
        assert!(!is_valid_bitrate("35kk"));
    }

    #[test]
    fn test_non_numeric_target_is_rejected() {
        let res = Config::from_lookup(lookup_from(&[
            ("PEXELS_API_KEY", "abc"),
            ("TARGET_SECONDS", "thirty"),
        ]));
        assert!(res.is_err());
    }

    fn with_backend(backend: TtsBackend, elevenlabs_key: &str) -> Config {
        Config {
            pexels_key: "abc".into(),
            elevenlabs_key: elevenlabs_key.into(),
            tts_backend: backend,
            ..Config::default()
        }
    }

    #[test]
    fn test_auto_without_key_or_local_voice_is_fatal() {
        let cfg = with_backend(TtsBackend::Auto, "");
        assert!(matches!(
            cfg.check_speech(false),
            Err(PipelineError::MissingApiKey { name: "ELEVENLABS_API_KEY" })
        ));
        assert!(cfg.check_speech(true).is_ok());
        assert!(with_backend(TtsBackend::Auto, "xi-key").check_speech(false).is_ok());
    }

    #[test]
    fn test_forced_local_without_local_voice_is_fatal() {
        let cfg = with_backend(TtsBackend::Local, "xi-key");
        assert!(matches!(
            cfg.check_speech(false),
            Err(PipelineError::LocalSynthesisUnavailable)
        ));
        assert!(cfg.check_speech(true).is_ok());
    }

    #[test]
    fn test_dotenv_file_feeds_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# keys\nPEXELS_API_KEY=\"px-123\"\nTARGET_CHAT=@survival_daily\nTTS_BACKEND=edge\nELEVENLABS_API_KEY=xi-key\n",
        )
        .unwrap();

        let vars: HashMap<String, String> = dotenvy::from_path_iter(&path)
            .unwrap()
            .map(|item| item.unwrap())
            .collect();
        let cfg = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(cfg.pexels_key, "px-123");
        assert_eq!(cfg.target_chats, vec!["@survival_daily"]);
        assert_eq!(cfg.tts_backend, TtsBackend::Cloud);
    }
}
