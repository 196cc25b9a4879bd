//! Background sources and their decoded, drawable form.
//!
//! An image source becomes one still frame. A video source becomes a
//! [`VideoLoop`]: a list of frames with delays that keeps "playing" from the
//! moment it is created, whether or not anything is showing it.

use std::ffi::OsString;
use std::io::Cursor;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::FrameBuffer;

/// Browsers treat GIF delays below 10 ms as 100 ms; so do we.
const MIN_FRAME_DELAY: Duration = Duration::from_millis(10);
const FALLBACK_FRAME_DELAY: Duration = Duration::from_millis(100);

/// Frame rate used when extracting non-GIF video through ffmpeg.
const FFMPEG_FPS: u32 = 30;
/// Longest ffmpeg-extracted loop kept in memory (10 s at 30 fps).
const MAX_VIDEO_FRAMES: usize = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[serde(alias = "img")]
    Image,
    Video,
}

/// Where a background comes from. Immutable once handed to the manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundSource {
    pub kind: MediaKind,
    pub location: String,
}

impl BackgroundSource {
    pub fn image(location: impl Into<String>) -> Self {
        Self { kind: MediaKind::Image, location: location.into() }
    }

    pub fn video(location: impl Into<String>) -> Self {
        Self { kind: MediaKind::Video, location: location.into() }
    }
}

/// One decoded video frame and how long it stays on screen.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub image: FrameBuffer,
    pub delay: Duration,
}

/// A muted, looping, autoplaying frame sequence.
#[derive(Clone, Debug)]
pub struct VideoLoop {
    frames: Vec<VideoFrame>,
    total: Duration,
    started: Instant,
}

impl VideoLoop {
    /// Start playback at `started`. Returns None for an empty frame list.
    pub fn new(frames: Vec<VideoFrame>, started: Instant) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }
        let frames: Vec<VideoFrame> = frames
            .into_iter()
            .map(|mut f| {
                if f.delay < MIN_FRAME_DELAY {
                    f.delay = FALLBACK_FRAME_DELAY;
                }
                f
            })
            .collect();
        let total = frames.iter().map(|f| f.delay).sum();
        Some(Self { frames, total, started })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Index of the frame showing at `now`, wrapping around forever.
    pub fn frame_index_at(&self, now: Instant) -> usize {
        let elapsed = now.saturating_duration_since(self.started);
        let mut pos = elapsed.as_nanos() % self.total.as_nanos().max(1);
        for (i, f) in self.frames.iter().enumerate() {
            let d = f.delay.as_nanos();
            if pos < d {
                return i;
            }
            pos -= d;
        }
        self.frames.len() - 1
    }

    pub fn frame_at(&self, now: Instant) -> &FrameBuffer {
        &self.frames[self.frame_index_at(now)].image
    }
}

/// A resolved background the manager can blit from.
#[derive(Clone, Debug)]
pub enum BackgroundMedia {
    Image(FrameBuffer),
    Video(VideoLoop),
}

impl BackgroundMedia {
    /// The pixels to draw at `now`.
    pub fn drawable(&self, now: Instant) -> &FrameBuffer {
        match self {
            BackgroundMedia::Image(fb) => fb,
            BackgroundMedia::Video(v) => v.frame_at(now),
        }
    }
}

/// Read and decode a source from disk. Video playback starts at `now`.
/// `fit` is the surface size; ffmpeg-extracted frames are cut down to it.
pub fn load(source: &BackgroundSource, fit: (usize, usize), now: Instant) -> Result<BackgroundMedia, Error> {
    let bytes = std::fs::read(&source.location).map_err(|e| Error::Io {
        path: source.location.clone(),
        source: e,
    })?;

    // Containers the image crate can't read (mp4, webm...) go through ffmpeg.
    if source.kind == MediaKind::Video && image::guess_format(&bytes).is_err() {
        let frames = extract_with_ffmpeg(Path::new(&source.location), fit)?;
        return into_video(&source.location, frames, now);
    }

    decode_bytes(source.kind, &source.location, &bytes, now)
}

/// Decode in-memory bytes. `location` is only used in error messages.
pub fn decode_bytes(
    kind: MediaKind,
    location: &str,
    bytes: &[u8],
    now: Instant,
) -> Result<BackgroundMedia, Error> {
    let decode_err = |reason: String| Error::Decode { location: location.to_string(), reason };

    match kind {
        MediaKind::Image => {
            let img = image::load_from_memory(bytes).map_err(|e| decode_err(e.to_string()))?;
            let fb = FrameBuffer::from_rgba(&img.to_rgba8());
            debug!("Decoded image {} ({}x{})", location, fb.width, fb.height);
            Ok(BackgroundMedia::Image(fb))
        }
        MediaKind::Video => {
            let format = image::guess_format(bytes).map_err(|e| decode_err(e.to_string()))?;
            let frames = if format == ImageFormat::Gif {
                decode_gif_frames(bytes).map_err(decode_err)?
            } else {
                // A still picture played as a video: one frame, looping.
                let img = image::load_from_memory(bytes).map_err(|e| decode_err(e.to_string()))?;
                vec![VideoFrame {
                    image: FrameBuffer::from_rgba(&img.to_rgba8()),
                    delay: FALLBACK_FRAME_DELAY,
                }]
            };
            into_video(location, frames, now)
        }
    }
}

fn into_video(location: &str, frames: Vec<VideoFrame>, now: Instant) -> Result<BackgroundMedia, Error> {
    let count = frames.len();
    let video = VideoLoop::new(frames, now).ok_or_else(|| Error::Decode {
        location: location.to_string(),
        reason: "video has no frames".into(),
    })?;
    info!("Video {} playing ({} frames, looping)", location, count);
    Ok(BackgroundMedia::Video(video))
}

fn decode_gif_frames(bytes: &[u8]) -> Result<Vec<VideoFrame>, String> {
    let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let frames = decoder.into_frames().collect_frames().map_err(|e| e.to_string())?;

    Ok(frames
        .into_iter()
        .map(|frame| {
            let (num, den) = frame.delay().numer_denom_ms();
            let delay = Duration::from_micros(num as u64 * 1000 / den.max(1) as u64);
            VideoFrame { image: FrameBuffer::from_rgba(frame.buffer()), delay }
        })
        .collect())
}

/// ffmpeg arguments: resample to `FFMPEG_FPS`, cover-scale and crop to
/// `fit`, stop after `MAX_VIDEO_FRAMES`.
fn ffmpeg_args(path: &Path, output_pattern: &Path, fit: (usize, usize)) -> Vec<OsString> {
    let (w, h) = (fit.0.max(1), fit.1.max(1));
    let filter = format!("fps={FFMPEG_FPS},scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}");
    vec![
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        path.into(),
        "-vf".into(),
        filter.into(),
        "-frames:v".into(),
        MAX_VIDEO_FRAMES.to_string().into(),
        output_pattern.into(),
    ]
}

/// Decode a video file into frames using the ffmpeg CLI.
fn extract_with_ffmpeg(path: &Path, fit: (usize, usize)) -> Result<Vec<VideoFrame>, Error> {
    let location = path.display().to_string();
    let decode_err = |reason: String| Error::Decode { location: location.clone(), reason };

    let temp_dir = tempfile::tempdir().map_err(|e| Error::Io { path: "tempdir".into(), source: e })?;
    let output_pattern = temp_dir.path().join("frame_%05d.png");

    info!("Extracting {} with ffmpeg at {} fps, {}x{}", location, FFMPEG_FPS, fit.0, fit.1);

    let output = Command::new("ffmpeg")
        .args(ffmpeg_args(path, &output_pattern, fit))
        .output()
        .map_err(|e| decode_err(format!("failed to run ffmpeg (is it installed?): {e}")))?;

    if !output.status.success() {
        return Err(decode_err(format!(
            "ffmpeg failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let delay = Duration::from_secs(1) / FFMPEG_FPS;
    let mut frames = Vec::new();
    let mut frame_num = 1;
    while frames.len() < MAX_VIDEO_FRAMES {
        let frame_path = temp_dir.path().join(format!("frame_{:05}.png", frame_num));
        if !frame_path.exists() {
            break;
        }
        let img = image::open(&frame_path).map_err(|e| decode_err(e.to_string()))?;
        frames.push(VideoFrame { image: FrameBuffer::from_rgba(&img.to_rgba8()), delay });
        frame_num += 1;
    }

    debug!("ffmpeg produced {} frames for {}", frames.len(), location);
    Ok(frames)
}
