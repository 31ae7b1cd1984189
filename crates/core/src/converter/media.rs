//! FFmpeg-based media converter.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::config::ConverterConfig;

use super::error::ConvertError;
use super::traits::Converter;
use super::types::{ConversionRequest, Quality};

/// Audio input extensions handled by the media converter.
pub const AUDIO_INPUT_EXTENSIONS: &[&str] = &["mp3", "wav", "flac"];

/// Video input extensions handled by the media converter.
pub const VIDEO_INPUT_EXTENSIONS: &[&str] = &["mp4", "avi"];

/// Fixed output allow-list for audio inputs.
pub const AUDIO_OUTPUT_FORMATS: &[&str] = &["mp3", "wav", "flac", "ogg"];

/// Fixed output allow-list for video inputs.
pub const VIDEO_OUTPUT_FORMATS: &[&str] = &["mp4", "avi", "mkv", "mov"];

const MEDIA_OUTPUT_FORMATS: &[&str] = &["mp3", "wav", "flac", "ogg", "mp4", "avi", "mkv", "mov"];

/// Whether a media file is audio or video, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Audio,
    Video,
}

fn classify(extension: &str) -> Option<MediaKind> {
    if AUDIO_INPUT_EXTENSIONS.contains(&extension) {
        Some(MediaKind::Audio)
    } else if VIDEO_INPUT_EXTENSIONS.contains(&extension) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

fn audio_codec(format: &str) -> &'static str {
    match format {
        "mp3" => "libmp3lame",
        "wav" => "pcm_s16le",
        "flac" => "flac",
        _ => "libvorbis",
    }
}

fn is_lossless(format: &str) -> bool {
    matches!(format, "wav" | "flac")
}

/// Converter for audio and video files, shelling out to ffmpeg.
pub struct MediaConverter {
    config: ConverterConfig,
}

impl MediaConverter {
    /// Creates a new media converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Validates that ffmpeg is available.
    pub async fn validate(&self) -> Result<(), ConvertError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;
        match output {
            Ok(o) if o.status.success() => Ok(()),
            _ => Err(ConvertError::ToolNotFound {
                tool: self.config.ffmpeg_path.clone(),
            }),
        }
    }

    /// Builds ffmpeg arguments for audio conversion.
    fn build_audio_args(
        input_path: &Path,
        output_path: &Path,
        output_format: &str,
        quality: Quality,
    ) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-c:a".to_string(),
            audio_codec(output_format).to_string(),
        ];

        if !is_lossless(output_format) {
            args.extend(["-b:a".to_string(), quality.audio_bitrate().to_string()]);
        }

        args.extend([
            "-loglevel".to_string(),
            "error".to_string(),
            output_path.to_string_lossy().to_string(),
        ]);
        args
    }

    /// Builds ffmpeg arguments for video conversion.
    fn build_video_args(
        input_path: &Path,
        output_path: &Path,
        quality: Quality,
    ) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-b:v".to_string(),
            quality.video_bitrate().to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            quality.audio_bitrate().to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            output_path.to_string_lossy().to_string(),
        ]
    }

    async fn run_ffmpeg(&self, args: &[String]) -> Result<(), ConvertError> {
        let timeout_secs = self.config.tool_timeout_secs;
        let output = timeout(
            Duration::from_secs(timeout_secs),
            Command::new(&self.config.ffmpeg_path)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| ConvertError::Timeout { timeout_secs })?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConvertError::ToolNotFound {
                    tool: self.config.ffmpeg_path.clone(),
                }
            } else {
                ConvertError::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(ConvertError::tool_failed(
                self.config.ffmpeg_path.to_string_lossy(),
                format!("exit status {}", output.status),
                Some(stderr),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Converter for MediaConverter {
    fn name(&self) -> &str {
        "media"
    }

    fn output_formats(&self) -> &[&str] {
        MEDIA_OUTPUT_FORMATS
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<PathBuf, ConvertError> {
        let extension = request.input_extension().unwrap_or_default();
        let Some(kind) = classify(&extension) else {
            return Err(ConvertError::UnsupportedInput { extension });
        };

        // Audio cannot become video and vice versa; the per-kind
        // allow-lists are disjoint from each other.
        let allowed = match kind {
            MediaKind::Audio => AUDIO_OUTPUT_FORMATS,
            MediaKind::Video => VIDEO_OUTPUT_FORMATS,
        };
        if !allowed.contains(&request.output_format.as_str()) {
            return Err(ConvertError::UnsupportedOutput {
                converter: self.name().to_string(),
                format: request.output_format.clone(),
            });
        }
        if !request.input_path.exists() {
            return Err(ConvertError::InputNotFound {
                path: request.input_path.clone(),
            });
        }

        let output_path = request.default_output_path();
        let args = match kind {
            MediaKind::Audio => Self::build_audio_args(
                &request.input_path,
                &output_path,
                &request.output_format,
                request.quality,
            ),
            MediaKind::Video => {
                Self::build_video_args(&request.input_path, &output_path, request.quality)
            }
        };

        self.run_ffmpeg(&args).await?;

        tracing::debug!(
            input = %request.input_path.display(),
            output = %output_path.display(),
            "media converted"
        );
        Ok(output_path)
    }
}
