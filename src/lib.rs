pub mod api;
pub mod assembler;
pub mod capabilities;
pub mod captions;
pub mod config;
pub mod distribution;
pub mod error;
pub mod ffmpeg;
pub mod footage;
pub mod init;
pub mod pipeline;
pub mod platform;
pub mod script;
pub mod speech;
pub mod subscribers;
pub mod topic;

pub(crate) fn logv(tag: &str, message: &str) {
    match tag {
        "WARN" => tracing::warn!("[{}] {}", tag, message),
        _ => tracing::info!("[{}] {}", tag, message),
    }
}

pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}
