use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8787
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    app_dir().join("history.db")
}

/// Application directory under the user's home (`~/.recast`).
///
/// Falls back to a relative directory when no home directory can be
/// resolved (e.g. stripped-down containers).
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".recast"))
        .unwrap_or_else(|| PathBuf::from(".recast"))
}

/// External tool configuration for converters that shell out.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConverterConfig {
    /// Path to the ffmpeg binary (default: "ffmpeg", resolved via PATH)
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    /// Path to the tar binary
    #[serde(default = "default_tar_path")]
    pub tar_path: PathBuf,
    /// Path to the 7z binary
    #[serde(default = "default_seven_zip_path")]
    pub seven_zip_path: PathBuf,
    /// Path to the unrar binary
    #[serde(default = "default_unrar_path")]
    pub unrar_path: PathBuf,
    /// Timeout for a single external tool invocation in seconds (default: 600)
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            tar_path: default_tar_path(),
            seven_zip_path: default_seven_zip_path(),
            unrar_path: default_unrar_path(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_tar_path() -> PathBuf {
    PathBuf::from("tar")
}

fn default_seven_zip_path() -> PathBuf {
    PathBuf::from("7z")
}

fn default_unrar_path() -> PathBuf {
    PathBuf::from("unrar")
}

fn default_tool_timeout() -> u64 {
    600
}

/// History store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Upper bound on the number of records considered by an export.
    #[serde(default = "default_max_export_entries")]
    pub max_export_entries: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_export_entries: default_max_export_entries(),
        }
    }
}

fn default_max_export_entries() -> u32 {
    10_000
}
