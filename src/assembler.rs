//! Builds the final video from downloaded clips and the narration track.
//!
//! Clips are taken in order, each trimmed to `clamp(duration, min_clip, max_clip)`
//! (never past its own end), until the running total reaches the target. The
//! segments are concatenated on a shared canvas, the narration replaces any
//! source audio, and the result is forced to exactly the target length: overshoot
//! is cut, undershoot holds the last frame.

use crate::config::Config;
use crate::error::PipelineError;
use crate::{logi, logok, logw};
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const OUTPUT_FPS: u32 = 30;

/// What probing a clip reveals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// A video-only slice `[start, end)` of a downloaded clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub clip: PathBuf,
    pub start: f64,
    pub end: f64,
    pub width: u32,
    pub height: u32,
}

impl Segment {
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub segments: Vec<Segment>,
    pub canvas: (u32, u32),
    pub audio: PathBuf,
    pub output: PathBuf,
    pub target: f64,
    pub fps: u32,
    pub bitrate: String,
}

/// Media toolkit the assembler drives.
#[async_trait]
pub trait VideoEditor: Send + Sync {
    /// Opens a clip; an error means the clip cannot be decoded.
    async fn probe(&self, clip: &Path) -> Result<ClipInfo>;

    /// Encodes `job.output`. Must not leave a file behind on failure.
    async fn render(&self, job: &RenderJob) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblySettings {
    pub target: f64,
    pub min_clip: f64,
    pub max_clip: f64,
    pub fps: u32,
    pub bitrate: String,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            target: 30.0,
            min_clip: 5.0,
            max_clip: 12.0,
            fps: OUTPUT_FPS,
            bitrate: "3500k".to_string(),
        }
    }
}

impl From<&Config> for AssemblySettings {
    fn from(cfg: &Config) -> Self {
        Self {
            target: cfg.target_seconds,
            min_clip: cfg.min_clip,
            max_clip: cfg.max_clip,
            fps: OUTPUT_FPS,
            bitrate: cfg.bitrate.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    pub segments: Vec<Segment>,
    /// Sum of segment lengths before the output was forced to the target.
    pub accumulated: f64,
    pub output: PathBuf,
}

/// Length of the slice taken from a clip of `duration` seconds.
///
/// The lower bound only stops trimming a long clip below `min_clip`; a clip that is
/// already shorter contributes all it has.
pub fn segment_length(duration: f64, min_clip: f64, max_clip: f64) -> f64 {
    duration.clamp(min_clip, max_clip).min(duration)
}

/// Smallest even-sized canvas that fits every segment.
pub fn compose_canvas(segments: &[Segment]) -> (u32, u32) {
    let w = segments.iter().map(|s| s.width).max().unwrap_or(0);
    let h = segments.iter().map(|s| s.height).max().unwrap_or(0);
    ((w + 1) & !1, (h + 1) & !1)
}

pub struct ClipAssembler<E: VideoEditor> {
    editor: E,
    settings: AssemblySettings,
}

impl<E: VideoEditor> ClipAssembler<E> {
    pub fn new(editor: E, settings: AssemblySettings) -> Self {
        Self { editor, settings }
    }

    pub fn settings(&self) -> &AssemblySettings {
        &self.settings
    }

    /// Probes candidates in order and keeps segments until the target is covered.
    pub async fn select_segments(&self, candidates: &[PathBuf]) -> (Vec<Segment>, f64) {
        let s = &self.settings;
        let mut segments = Vec::new();
        let mut total = 0.0;

        for clip in candidates {
            let info = match self.editor.probe(clip).await {
                Ok(info) if info.duration > 0.0 => info,
                Ok(_) => {
                    logw(format!("Skipping {} (empty clip)", clip.display()));
                    continue;
                }
                Err(err) => {
                    logw(format!("Skipping {} (undecodable: {:#})", clip.display(), err));
                    continue;
                }
            };

            let seg = segment_length(info.duration, s.min_clip, s.max_clip);
            logi(format!(
                "Using {:.2}s of {} ({:.2}s, {}x{})",
                seg,
                clip.display(),
                info.duration,
                info.width,
                info.height
            ));
            segments.push(Segment {
                clip: clip.clone(),
                start: 0.0,
                end: seg,
                width: info.width,
                height: info.height,
            });
            total += seg;
            if total >= s.target {
                break;
            }
        }

        (segments, total)
    }

    pub async fn assemble(
        &self,
        candidates: &[PathBuf],
        audio: &Path,
        output: &Path,
    ) -> Result<AssemblyReport> {
        let (segments, accumulated) = self.select_segments(candidates).await;
        if segments.is_empty() {
            return Err(PipelineError::NoUsableSegments.into());
        }

        let target = self.settings.target;
        if accumulated < target {
            logw(format!(
                "Clips cover {:.2}s of {:.2}s; holding last frame",
                accumulated, target
            ));
        }

        let job = RenderJob {
            canvas: compose_canvas(&segments),
            segments,
            audio: audio.to_path_buf(),
            output: output.to_path_buf(),
            target,
            fps: self.settings.fps,
            bitrate: self.settings.bitrate.clone(),
        };

        logi(format!(
            "Rendering {} segments on {}x{} -> {}",
            job.segments.len(),
            job.canvas.0,
            job.canvas.1,
            output.display()
        ));
        if let Err(err) = self.editor.render(&job).await {
            let _ = fs::remove_file(output).await;
            return Err(err);
        }
        logok(format!("Rendered {:.2}s video: {}", target, output.display()));

        Ok(AssemblyReport {
            segments: job.segments,
            accumulated,
            output: output.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Clips named in `infos` decode; anything else fails to open.
    #[derive(Default)]
    struct FakeEditor {
        infos: HashMap<PathBuf, ClipInfo>,
        probed: Mutex<Vec<PathBuf>>,
        rendered: Mutex<Vec<RenderJob>>,
        fail_render: bool,
    }

    impl FakeEditor {
        fn with_durations(durations: &[f64]) -> (Self, Vec<PathBuf>) {
            let mut editor = FakeEditor::default();
            let mut paths = Vec::new();
            for (i, d) in durations.iter().enumerate() {
                let path = PathBuf::from(format!("clip_{i}.mp4"));
                editor.infos.insert(
                    path.clone(),
                    ClipInfo {
                        duration: *d,
                        width: 1280,
                        height: 720,
                    },
                );
                paths.push(path);
            }
            (editor, paths)
        }
    }

    #[async_trait]
    impl VideoEditor for FakeEditor {
        async fn probe(&self, clip: &Path) -> Result<ClipInfo> {
            self.probed.lock().unwrap().push(clip.to_path_buf());
            self.infos
                .get(clip)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("moov atom not found"))
        }

        async fn render(&self, job: &RenderJob) -> Result<()> {
            self.rendered.lock().unwrap().push(job.clone());
            if self.fail_render {
                anyhow::bail!("encoder crashed");
            }
            std::fs::write(&job.output, b"mp4")?;
            Ok(())
        }
    }

    fn lengths(segments: &[Segment]) -> Vec<f64> {
        segments.iter().map(Segment::length).collect()
    }

    #[test]
    fn test_segment_length_bounds() {
        assert_eq!(segment_length(20.0, 5.0, 12.0), 12.0);
        assert_eq!(segment_length(12.0, 5.0, 12.0), 12.0);
        assert_eq!(segment_length(8.5, 5.0, 12.0), 8.5);
        assert_eq!(segment_length(4.0, 5.0, 12.0), 4.0);
        assert_eq!(segment_length(0.5, 5.0, 12.0), 0.5);
    }

    #[test]
    fn test_canvas_is_largest_even_frame() {
        let seg = |w, h| Segment {
            clip: PathBuf::from("c.mp4"),
            start: 0.0,
            end: 5.0,
            width: w,
            height: h,
        };
        assert_eq!(compose_canvas(&[seg(1920, 1080), seg(1080, 1920)]), (1920, 1920));
        assert_eq!(compose_canvas(&[seg(641, 359)]), (642, 360));
    }

    #[tokio::test]
    async fn test_long_clips_are_capped_and_selection_stops_at_target() {
        let (editor, clips) = FakeEditor::with_durations(&[20.0, 15.0, 30.0, 12.0, 40.0]);
        let assembler = ClipAssembler::new(editor, AssemblySettings::default());
        let (segments, total) = assembler.select_segments(&clips).await;
        assert_eq!(lengths(&segments), vec![12.0, 12.0, 12.0]);
        assert_eq!(total, 36.0);
        assert_eq!(assembler.editor.probed.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_short_clips_keep_their_length() {
        let (editor, clips) = FakeEditor::with_durations(&[4.0, 20.0, 3.0]);
        let assembler = ClipAssembler::new(editor, AssemblySettings::default());
        let (segments, total) = assembler.select_segments(&clips).await;
        assert_eq!(lengths(&segments), vec![4.0, 12.0, 3.0]);
        assert_eq!(total, 19.0);
    }

    #[tokio::test]
    async fn test_undecodable_clips_are_skipped() {
        let (editor, mut clips) = FakeEditor::with_durations(&[9.0]);
        clips.insert(0, PathBuf::from("broken.mp4"));
        let assembler = ClipAssembler::new(editor, AssemblySettings::default());
        let (segments, _) = assembler.select_segments(&clips).await;
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].clip, PathBuf::from("clip_0.mp4"));
    }

    #[tokio::test]
    async fn test_undershoot_renders_at_target() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        let (editor, clips) = FakeEditor::with_durations(&[4.0, 20.0, 3.0]);
        let assembler = ClipAssembler::new(editor, AssemblySettings::default());

        let report = assembler
            .assemble(&clips, Path::new("voice.mp3"), &out)
            .await
            .unwrap();
        assert_eq!(report.accumulated, 19.0);
        assert!(out.exists());

        let jobs = assembler.editor.rendered.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target, 30.0);
        assert_eq!(jobs[0].fps, 30);
        assert_eq!(jobs[0].canvas, (1280, 720));
        assert_eq!(jobs[0].audio, PathBuf::from("voice.mp3"));
    }

    #[tokio::test]
    async fn test_overshoot_renders_at_target() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        let (editor, clips) = FakeEditor::with_durations(&[11.0, 11.0, 11.0]);
        let assembler = ClipAssembler::new(editor, AssemblySettings::default());

        let report = assembler
            .assemble(&clips, Path::new("voice.mp3"), &out)
            .await
            .unwrap();
        assert_eq!(report.accumulated, 33.0);
        assert_eq!(assembler.editor.rendered.lock().unwrap()[0].target, 30.0);
    }

    #[tokio::test]
    async fn test_no_decodable_clips_is_fatal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        let assembler = ClipAssembler::new(FakeEditor::default(), AssemblySettings::default());
        let clips = vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")];

        let err = assembler
            .assemble(&clips, Path::new("voice.mp3"), &out)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoUsableSegments)
        ));
        assert!(!out.exists());
        assert!(assembler.editor.rendered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_render_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        std::fs::write(&out, b"stale").unwrap();
        let (mut editor, clips) = FakeEditor::with_durations(&[12.0]);
        editor.fail_render = true;
        let assembler = ClipAssembler::new(editor, AssemblySettings::default());

        assert!(assembler
            .assemble(&clips, Path::new("voice.mp3"), &out)
            .await
            .is_err());
        assert!(!out.exists());
    }
}
