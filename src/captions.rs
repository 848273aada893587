use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").expect("static regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionCue {
    /// 1-based, as written to the SRT file.
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl CaptionCue {
    pub fn to_srt(&self) -> String {
        format!(
            "{}\n{} --> {}\n{}\n",
            self.index,
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text
        )
    }
}

/// Splits after `.`, `!` or `?` followed by whitespace. Text without such a break
/// comes back as a single chunk.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut last = 0;
    for m in SENTENCE_END.find_iter(text) {
        // keep the punctuation, drop the whitespace
        let cut = m.start() + 1;
        chunks.push(text[last..cut].trim().to_string());
        last = m.end();
    }
    chunks.push(text[last..].trim().to_string());
    chunks.retain(|c| !c.is_empty());

    if chunks.is_empty() {
        chunks.push(text.trim().to_string());
    }
    chunks
}

/// Cues of equal length that exactly tile `[0, total_seconds]`.
pub fn build_cues(text: &str, total_seconds: f64) -> Vec<CaptionCue> {
    let chunks = split_sentences(text);
    let count = chunks.len();
    let per = total_seconds / count as f64;

    let mut cues = Vec::with_capacity(count);
    let mut cur = 0.0;
    for (i, chunk) in chunks.into_iter().enumerate() {
        let start = cur;
        let end = if i + 1 == count {
            total_seconds
        } else {
            total_seconds.min(cur + per)
        };
        cues.push(CaptionCue {
            index: i + 1,
            start,
            end,
            text: chunk,
        });
        cur = end;
    }
    cues
}

pub fn render_srt(cues: &[CaptionCue]) -> String {
    cues.iter()
        .map(CaptionCue::to_srt)
        .collect::<Vec<_>>()
        .join("\n")
}

/// `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let m = (total_sec / 60) % 60;
    let h = total_sec / 3600;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

pub async fn write_srt(path: &Path, text: &str, total_seconds: f64) -> Result<Vec<CaptionCue>> {
    let cues = build_cues(text, total_seconds);
    let mut out = fs::File::create(path)
        .await
        .with_context(|| format!("create srt output: {}", path.display()))?;
    out.write_all(render_srt(&cues).as_bytes()).await?;
    out.flush().await?;
    Ok(cues)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tiles(cues: &[CaptionCue], total: f64) {
        assert!(!cues.is_empty());
        assert_eq!(cues[0].start, 0.0);
        assert_eq!(cues[cues.len() - 1].end, total);
        for pair in cues.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start <= pair[0].end);
        }
    }

    #[test]
    fn test_three_sentences_in_thirty_seconds() {
        let cues = build_cues("Boil water. Check the radio. Pack bandages.", 30.0);
        assert_eq!(cues.len(), 3);
        assert_eq!((cues[0].start, cues[0].end), (0.0, 10.0));
        assert_eq!((cues[1].start, cues[1].end), (10.0, 20.0));
        assert_eq!((cues[2].start, cues[2].end), (20.0, 30.0));
        assert_eq!(cues[1].text, "Check the radio.");
        assert_eq!(cues[2].index, 3);
    }

    #[test]
    fn test_cues_tile_for_many_counts_and_durations() {
        for total in [1.0, 7.5, 29.97, 30.0, 61.3, 3601.0] {
            for n in 1..=13 {
                let text = (0..n).map(|i| format!("Tip {i}.")).collect::<Vec<_>>().join(" ");
                let cues = build_cues(&text, total);
                assert_eq!(cues.len(), n);
                assert_tiles(&cues, total);
            }
        }
    }

    #[test]
    fn test_no_terminal_punctuation_is_one_cue() {
        let cues = build_cues("keep a whistle in your go bag", 30.0);
        assert_eq!(cues.len(), 1);
        assert_eq!((cues[0].start, cues[0].end), (0.0, 30.0));
        assert_eq!(cues[0].text, "keep a whistle in your go bag");
    }

    #[test]
    fn test_split_keeps_punctuation_and_skips_blanks() {
        assert_eq!(
            split_sentences("  Stay calm!  Is the radio on?\n\nGood.  "),
            vec!["Stay calm!", "Is the radio on?", "Good."]
        );
        assert_eq!(split_sentences("Store 3.5 liters per day."), vec!["Store 3.5 liters per day."]);
        assert_eq!(split_sentences("   "), vec![""]);
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(10.0), "00:00:10,000");
        assert_eq!(format_timestamp(4.2857), "00:00:04,286");
        assert_eq!(format_timestamp(3725.5), "01:02:05,500");
        assert_eq!(format_timestamp(9.9999), "00:00:10,000");
    }

    #[test]
    fn test_render_srt_blocks() {
        let srt = render_srt(&build_cues("Boil water. Pack bandages.", 30.0));
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:15,000\nBoil water.\n\n2\n00:00:15,000 --> 00:00:30,000\nPack bandages.\n"
        );
    }

    #[tokio::test]
    async fn test_write_srt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.srt");
        let cues = write_srt(&path, "One. Two.", 30.0).await.unwrap();
        assert_eq!(cues.len(), 2);
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("1\n00:00:00,000 --> 00:00:15,000\nOne.\n"));
    }
}
