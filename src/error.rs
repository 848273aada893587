use thiserror::Error;

/// Errors that stop a pipeline run. Everything recoverable is logged and skipped instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing {name} (set it in the environment)")]
    MissingApiKey { name: &'static str },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No footage clips found (tried: {})", .queries.join(", "))]
    NoFootage { queries: Vec<String> },

    #[error("No usable clips downloaded")]
    NoUsableSegments,

    #[error("Local speech synthesis is not available on this system")]
    LocalSynthesisUnavailable,

    #[error("Video encoding failed: {reason}")]
    Encode { reason: String },
}
