//! Types shared by the converter implementations.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Conversion quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    /// Returns the lowercase tag used in persisted records and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Audio bitrate for this preset, as an ffmpeg `-b:a` value.
    pub fn audio_bitrate(&self) -> &'static str {
        match self {
            Self::Low => "128k",
            Self::Medium => "192k",
            Self::High => "320k",
        }
    }

    /// Video bitrate for this preset, as an ffmpeg `-b:v` value.
    pub fn video_bitrate(&self) -> &'static str {
        match self {
            Self::Low => "500k",
            Self::Medium => "1500k",
            Self::High => "3000k",
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown quality: {}", other)),
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-file conversion request handed to a converter.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Input file path.
    pub input_path: PathBuf,
    /// Directory the output file is written into.
    pub output_dir: PathBuf,
    /// Target format tag, lowercase, without leading dot.
    pub output_format: String,
    /// Quality preset.
    pub quality: Quality,
}

impl ConversionRequest {
    /// Create a request, normalizing the output format to lowercase.
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        output_format: &str,
        quality: Quality,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_dir: output_dir.into(),
            output_format: output_format.trim_start_matches('.').to_ascii_lowercase(),
            quality,
        }
    }

    /// Lowercase input extension without the leading dot, if any.
    pub fn input_extension(&self) -> Option<String> {
        extension_of(&self.input_path)
    }

    /// Input file stem, or "output" when the path has none.
    pub fn input_stem(&self) -> String {
        self.input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string())
    }

    /// Default output path: `<output_dir>/<stem>.<output_format>`.
    pub fn default_output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.input_stem(), self.output_format))
    }
}

/// Lowercase extension of a path without the leading dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}
