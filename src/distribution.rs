use crate::capabilities::Distributor;
use crate::topic::Topic;
use crate::{logi, logok, logw};
use std::path::Path;

pub fn caption_for(topic: &Topic) -> String {
    format!("Daily Survival Tip 🎒 — {}", topic)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    /// `(chat id, reason)`
    pub failed: Vec<(String, String)>,
}

impl DeliveryReport {
    pub fn merge(&mut self, other: DeliveryReport) {
        self.delivered.extend(other.delivered);
        self.failed.extend(other.failed);
    }
}

/// Sends to every recipient in order. A failed recipient is logged and skipped.
pub async fn broadcast(
    distributor: &dyn Distributor,
    recipients: &[String],
    video: &Path,
    caption: &str,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    if recipients.is_empty() {
        logi("No recipients; skipping broadcast.");
        return report;
    }

    for chat_id in recipients {
        match distributor.send_video(chat_id, video, caption).await {
            Ok(()) => {
                logok(format!("Sent video to {}", chat_id));
                report.delivered.push(chat_id.clone());
            }
            Err(err) => {
                logw(format!("Failed to send to {}: {:#}", chat_id, err));
                report.failed.push((chat_id.clone(), format!("{:#}", err)));
            }
        }
    }
    report
}
