use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::bail;
use tracing::{error, info};

use crate::audio::wav_duration_seconds;
use crate::captions::{self, CANVAS_HEIGHT, CANVAS_WIDTH};

/// Short-form platform ceiling; longer narration is truncated, never
/// stretched.
pub const MAX_DURATION_SECS: f64 = 29.5;
pub const FRAME_RATE: u32 = 30;

pub struct VideoArtifacts {
    pub video: PathBuf,
    pub thumbnail: PathBuf,
}

pub fn effective_duration(audio_secs: f64) -> f64 {
    audio_secs.min(MAX_DURATION_SECS)
}

fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// Background chain: cover-scale and crop to the canvas, a slow monotonic
/// zoom capped well inside the crop budget, then the caption burn.
fn background_filter(ass_path: &Path) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},\
         zoompan=z='min(1.04+0.02*on/{fps},1.8)':\
         x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d=1:s={w}x{h}:fps={fps},\
         ass='{ass}'",
        w = CANVAS_WIDTH,
        h = CANVAS_HEIGHT,
        fps = FRAME_RATE,
        ass = escape_filter_path(ass_path),
    )
}

fn build_compose_args(
    image: &Path,
    audio: &Path,
    filter: &str,
    duration: f64,
    out: &Path,
) -> Vec<String> {
    vec![
        "-y".into(),
        "-loop".into(),
        "1".into(),
        "-framerate".into(),
        FRAME_RATE.to_string(),
        "-i".into(),
        image.to_string_lossy().into_owned(),
        "-i".into(),
        audio.to_string_lossy().into_owned(),
        "-vf".into(),
        filter.to_string(),
        "-t".into(),
        format!("{duration:.3}"),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "veryfast".into(),
        "-c:a".into(),
        "aac".into(),
        "-r".into(),
        FRAME_RATE.to_string(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-movflags".into(),
        "+faststart".into(),
        out.to_string_lossy().into_owned(),
    ]
}

fn build_thumbnail_args(video: &Path, out: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        video.to_string_lossy().into_owned(),
        "-frames:v".into(),
        "1".into(),
        "-q:v".into(),
        "2".into(),
        out.to_string_lossy().into_owned(),
    ]
}

fn run_ffmpeg(args: &[String], what: &str) -> anyhow::Result<()> {
    let status = Command::new("ffmpeg").args(args).status()?;
    if !status.success() {
        error!("ffmpeg failed while {what}");
        bail!("ffmpeg failed while {what}");
    }
    Ok(())
}

/// Composite one topic's media: clamp the audio duration, partition the
/// narration into timed captions, burn them over the zoomed background,
/// mux the (possibly truncated) audio, and extract the thumbnail from the
/// first frame of the finished composition. Everything is built in a
/// scratch directory and renamed into place only on success, so a failed
/// encode leaves nothing under final names.
pub fn compose_video(
    image_path: &Path,
    audio_path: &Path,
    script: &str,
    slug: &str,
    out_dir: &Path,
) -> anyhow::Result<VideoArtifacts> {
    let duration = effective_duration(wav_duration_seconds(audio_path)?);
    let segments = captions::timed_segments(script, duration);
    if segments.is_empty() {
        bail!("narration script is empty, nothing to caption");
    }
    info!(
        "Composing {:.1}s video with {} caption segment(s)",
        duration,
        segments.len()
    );

    let work_dir = out_dir.join(".work").join(slug);
    if work_dir.exists() {
        fs::remove_dir_all(&work_dir)?;
    }
    fs::create_dir_all(&work_dir)?;

    let ass_path = work_dir.join("subs.ass");
    let font = captions::resolve_font();
    fs::write(&ass_path, captions::build_ass(&segments, font))?;

    let work_video = work_dir.join("video.mp4");
    let filter = background_filter(&ass_path);
    run_ffmpeg(
        &build_compose_args(image_path, audio_path, &filter, duration, &work_video),
        "compositing the video",
    )?;

    let work_thumb = work_dir.join("thumb.jpg");
    run_ffmpeg(
        &build_thumbnail_args(&work_video, &work_thumb),
        "extracting the thumbnail",
    )?;

    let video = out_dir.join(format!("{slug}.mp4"));
    let thumbnail = out_dir.join(format!("{slug}_thumb.jpg"));
    fs::rename(&work_video, &video)?;
    fs::rename(&work_thumb, &thumbnail)?;
    let _ = fs::remove_dir_all(&work_dir);

    info!("Final video written to {}", video.display());
    Ok(VideoArtifacts { video, thumbnail })
}
