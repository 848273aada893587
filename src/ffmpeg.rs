use crate::assembler::{ClipInfo, RenderJob, VideoEditor};
use crate::error::PipelineError;
use crate::logw;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tokio::process::Command;

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let output = cmd
        .output()
        .await
        .with_context(|| format!("Command execution failed: {}", args[0]))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail = stderr.trim().lines().last().unwrap_or("").to_string();
        return Err(anyhow::anyhow!("{} exited with {}: {}", args[0], output.status, tail));
    }

    Ok(())
}

/// Display dimensions of the first video stream, with ±90° rotation applied.
pub async fn ffprobe_video_dimensions(path: &Path) -> Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height:stream_tags=rotate:stream_side_data=rotation",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe execution failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    parse_dimensions(&text).ok_or_else(|| anyhow::anyhow!("Invalid dimensions: {:?}", text.trim()))
}

fn parse_dimensions(json: &str) -> Option<(u32, u32)> {
    let v: Value = serde_json::from_str(json).ok()?;
    let stream = v.get("streams")?.get(0)?;
    let w = u32::try_from(stream.get("width")?.as_u64()?).ok()?;
    let h = u32::try_from(stream.get("height")?.as_u64()?).ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    let quarter_turn = stream_rotation(stream).is_some_and(|deg| deg.rem_euclid(180) == 90);
    Some(if quarter_turn { (h, w) } else { (w, h) })
}

/// Display-matrix rotation, falling back to the legacy `rotate` tag.
fn stream_rotation(stream: &Value) -> Option<i64> {
    let from_side_data = stream
        .get("side_data_list")
        .and_then(Value::as_array)
        .and_then(|list| list.iter().find_map(|sd| sd.get("rotation")))
        .and_then(|r| r.as_f64().or_else(|| r.as_str()?.trim().parse().ok()));
    let from_tag = || {
        stream
            .get("tags")?
            .get("rotate")?
            .as_str()?
            .trim()
            .parse::<f64>()
            .ok()
    };
    from_side_data.or_else(from_tag).map(|deg| deg.round() as i64)
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.1 {
        return Err(anyhow::anyhow!("Invalid duration"));
    }
    Ok(duration)
}

/// Full ffmpeg invocation for an assembly job.
///
/// Each segment is trimmed from 0, centred on the job canvas and resampled to the
/// output frame rate. Frames that fit the canvas keep their size; anything larger
/// (a rotated clip whose metadata disagrees with the probe) is shrunk to fit. The concatenation holds its last frame for up to `target`
/// seconds and the output is cut at exactly `target`, so undershoot and overshoot
/// both end at the same length. Source audio is never mapped.
pub fn render_args(job: &RenderJob) -> Vec<String> {
    let (cw, ch) = job.canvas;
    let mut args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ];

    for seg in &job.segments {
        args.push("-t".to_string());
        args.push(format!("{:.3}", seg.end));
        args.push("-i".to_string());
        args.push(seg.clip.display().to_string());
    }
    args.push("-i".to_string());
    args.push(job.audio.display().to_string());

    let mut filter = String::new();
    let mut labels = String::new();
    for (i, seg) in job.segments.iter().enumerate() {
        filter.push_str(&format!(
            "[{i}:v]trim=start={:.3}:end={:.3},setpts=PTS-STARTPTS,fps={},\
             scale=w=min(iw\\,{cw}):h=min(ih\\,{ch}):force_original_aspect_ratio=decrease,\
             pad={cw}:{ch}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1[v{i}];",
            seg.start, seg.end, job.fps
        ));
        labels.push_str(&format!("[v{i}]"));
    }
    filter.push_str(&format!(
        "{labels}concat=n={}:v=1:a=0[cat];[cat]tpad=stop_mode=clone:stop_duration={:.3}[vout]",
        job.segments.len(),
        job.target
    ));

    let audio_index = job.segments.len();
    args.extend([
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        "[vout]".to_string(),
        "-map".to_string(),
        format!("{}:a:0", audio_index),
        "-t".to_string(),
        format!("{:.3}", job.target),
        "-r".to_string(),
        job.fps.to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-b:v".to_string(),
        job.bitrate.clone(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        job.output.display().to_string(),
    ]);
    args
}

/// Re-encodes any audio file ffmpeg can read into AAC.
pub async fn ffmpeg_transcode_aac(in_audio: &Path, out_m4a: &Path) -> Result<bool> {
    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        in_audio.display().to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-f".to_string(),
        "mp4".to_string(),
        out_m4a.display().to_string(),
    ];
    run_cmd(&args).await?;
    Ok(out_m4a.exists())
}

/// [`VideoEditor`] backed by the ffmpeg/ffprobe command-line tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegEditor;

#[async_trait]
impl VideoEditor for FfmpegEditor {
    async fn probe(&self, clip: &Path) -> Result<ClipInfo> {
        let duration = ffprobe_duration_seconds(clip).await?;
        let (width, height) = ffprobe_video_dimensions(clip).await?;
        Ok(ClipInfo {
            duration,
            width,
            height,
        })
    }

    async fn render(&self, job: &RenderJob) -> Result<()> {
        let args = render_args(job);
        if let Err(err) = run_cmd(&args).await {
            logw(format!("Render failed: {:#}", err));
            let _ = fs::remove_file(&job.output).await;
            return Err(PipelineError::Encode {
                reason: format!("{:#}", err),
            }
            .into());
        }
        if !job.output.exists() {
            return Err(PipelineError::Encode {
                reason: format!("ffmpeg produced no file at {}", job.output.display()),
            }
            .into());
        }
        Ok(())
    }
}
