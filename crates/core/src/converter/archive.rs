//! Archive converter (ZIP, TAR, RAR, 7Z).

use async_trait::async_trait;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use walkdir::WalkDir;

use crate::config::ConverterConfig;

use super::error::ConvertError;
use super::traits::Converter;
use super::types::ConversionRequest;

/// Supported archive input extensions.
pub const ARCHIVE_INPUT_EXTENSIONS: &[&str] = &["zip", "tar", "rar", "7z"];

/// Availability of the external archive tools on this system.
///
/// Probed once at startup; a converter never discovers a missing tool by
/// failing mid-conversion when the capability flag already says no.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveTools {
    pub tar: bool,
    pub seven_zip: bool,
    pub unrar: bool,
}

impl ArchiveTools {
    /// Detect available tools by invoking each binary once.
    pub async fn detect(config: &ConverterConfig) -> Self {
        Self {
            tar: probe(&config.tar_path, &["--version"]).await,
            seven_zip: probe(&config.seven_zip_path, &[]).await,
            unrar: probe(&config.unrar_path, &[]).await,
        }
    }

    /// All tools present, for tests that stub out tool use.
    pub fn all() -> Self {
        Self {
            tar: true,
            seven_zip: true,
            unrar: true,
        }
    }
}

/// A binary is available when it can be spawned at all; exit status is
/// irrelevant (7z and unrar print usage and exit nonzero without args).
async fn probe(program: &Path, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .is_ok()
}

/// Converter for archives: extraction plus repacking between formats.
///
/// Zip is handled natively via the `zip` crate; tar, 7z and rar go
/// through the system binaries. Format conversion extracts into a
/// scratch directory and repacks.
pub struct ArchiveConverter {
    config: ConverterConfig,
    tools: ArchiveTools,
    outputs: Vec<&'static str>,
}

impl ArchiveConverter {
    pub fn new(config: ConverterConfig, tools: ArchiveTools) -> Self {
        let mut outputs = vec!["zip"];
        if tools.tar {
            outputs.push("tar");
        }
        if tools.seven_zip {
            outputs.push("7z");
        }
        Self {
            config,
            tools,
            outputs,
        }
    }

    /// Construct with tool detection against the configured binaries.
    pub async fn detect(config: ConverterConfig) -> Self {
        let tools = ArchiveTools::detect(&config).await;
        Self::new(config, tools)
    }

    async fn run_tool(
        &self,
        program: &Path,
        args: &[&OsStr],
        cwd: Option<&Path>,
    ) -> Result<(), ConvertError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let timeout_secs = self.config.tool_timeout_secs;
        let output = timeout(Duration::from_secs(timeout_secs), cmd.output())
            .await
            .map_err(|_| ConvertError::Timeout { timeout_secs })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConvertError::ToolNotFound {
                        tool: program.to_path_buf(),
                    }
                } else {
                    ConvertError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(ConvertError::tool_failed(
                program.to_string_lossy(),
                format!("exit status {}", output.status),
                Some(stderr),
            ));
        }
        Ok(())
    }

    /// Extract an archive into `output_dir`, creating it if needed.
    pub async fn extract_archive(
        &self,
        archive_path: &Path,
        output_dir: &Path,
    ) -> Result<(), ConvertError> {
        if !archive_path.exists() {
            return Err(ConvertError::InputNotFound {
                path: archive_path.to_path_buf(),
            });
        }
        fs::create_dir_all(output_dir)?;

        let extension = super::types::extension_of(archive_path).unwrap_or_default();
        match extension.as_str() {
            "zip" => {
                let file = fs::File::open(archive_path)?;
                let mut archive = zip::ZipArchive::new(file)?;
                archive.extract(output_dir)?;
                Ok(())
            }
            "tar" => {
                if !self.tools.tar {
                    return Err(ConvertError::ToolNotFound {
                        tool: self.config.tar_path.clone(),
                    });
                }
                self.run_tool(
                    &self.config.tar_path,
                    &[
                        OsStr::new("-xf"),
                        archive_path.as_os_str(),
                        OsStr::new("-C"),
                        output_dir.as_os_str(),
                    ],
                    None,
                )
                .await
            }
            "7z" => {
                if !self.tools.seven_zip {
                    return Err(ConvertError::ToolNotFound {
                        tool: self.config.seven_zip_path.clone(),
                    });
                }
                let dest = format!("-o{}", output_dir.display());
                self.run_tool(
                    &self.config.seven_zip_path,
                    &[
                        OsStr::new("x"),
                        OsStr::new("-y"),
                        OsStr::new(&dest),
                        archive_path.as_os_str(),
                    ],
                    None,
                )
                .await
            }
            "rar" => {
                if !self.tools.unrar {
                    return Err(ConvertError::ToolNotFound {
                        tool: self.config.unrar_path.clone(),
                    });
                }
                self.run_tool(
                    &self.config.unrar_path,
                    &[
                        OsStr::new("x"),
                        OsStr::new("-y"),
                        archive_path.as_os_str(),
                        output_dir.as_os_str(),
                    ],
                    None,
                )
                .await
            }
            other => Err(ConvertError::UnsupportedInput {
                extension: other.to_string(),
            }),
        }
    }

    /// Pack the contents of `dir` into an archive of the given format.
    async fn pack(
        &self,
        dir: &Path,
        output_path: &Path,
        format: &str,
    ) -> Result<(), ConvertError> {
        match format {
            "zip" => pack_zip(dir, output_path),
            "tar" => {
                self.run_tool(
                    &self.config.tar_path,
                    &[
                        OsStr::new("-cf"),
                        output_path.as_os_str(),
                        OsStr::new("-C"),
                        dir.as_os_str(),
                        OsStr::new("."),
                    ],
                    None,
                )
                .await
            }
            "7z" => {
                self.run_tool(
                    &self.config.seven_zip_path,
                    &[OsStr::new("a"), output_path.as_os_str(), OsStr::new(".")],
                    Some(dir),
                )
                .await
            }
            other => Err(ConvertError::UnsupportedOutput {
                converter: "archive".to_string(),
                format: other.to_string(),
            }),
        }
    }
}

/// Recursively zip a directory's contents.
fn pack_zip(dir: &Path, output_path: &Path) -> Result<(), ConvertError> {
    let file = fs::File::create(output_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(|e| ConvertError::parse(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| ConvertError::parse(e.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");

        if entry.file_type().is_dir() {
            writer.add_directory(relative, options)?;
        } else if entry.file_type().is_file() {
            writer.start_file(relative, options)?;
            let bytes = fs::read(entry.path())?;
            writer.write_all(&bytes)?;
        }
    }
    writer.finish()?;
    Ok(())
}

#[async_trait]
impl Converter for ArchiveConverter {
    fn name(&self) -> &str {
        "archive"
    }

    fn output_formats(&self) -> &[&str] {
        &self.outputs
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<PathBuf, ConvertError> {
        let extension = request.input_extension().unwrap_or_default();
        if !ARCHIVE_INPUT_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ConvertError::UnsupportedInput { extension });
        }
        if !self.supports_output(&request.output_format) {
            return Err(ConvertError::UnsupportedOutput {
                converter: self.name().to_string(),
                format: request.output_format.clone(),
            });
        }

        let scratch = std::env::temp_dir().join(format!("recast-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&scratch)?;

        let result = async {
            self.extract_archive(&request.input_path, &scratch).await?;
            let output_path = request.default_output_path();
            self.pack(&scratch, &output_path, &request.output_format)
                .await?;
            Ok(output_path)
        }
        .await;

        // Scratch cleanup failure is not a conversion failure.
        if let Err(e) = fs::remove_dir_all(&scratch) {
            tracing::warn!(path = %scratch.display(), "failed to clean scratch dir: {}", e);
        }

        match &result {
            Ok(output_path) => {
                tracing::debug!(
                    input = %request.input_path.display(),
                    output = %output_path.display(),
                    "archive converted"
                );
            }
            Err(e) => {
                tracing::debug!(input = %request.input_path.display(), "archive conversion failed: {}", e);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Quality;
    use tempfile::tempdir;

    fn no_tools_converter() -> ArchiveConverter {
        ArchiveConverter::new(ConverterConfig::default(), ArchiveTools::default())
    }

    fn write_test_zip(dir: &Path) -> PathBuf {
        let path = dir.join("input.zip");
        let file = fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("inner/a.txt", options).unwrap();
        writer.write_all(b"alpha").unwrap();
        writer.start_file("b.txt", options).unwrap();
        writer.write_all(b"beta").unwrap();
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_outputs_reflect_tool_availability() {
        let converter = no_tools_converter();
        assert_eq!(converter.output_formats(), &["zip"]);

        let converter = ArchiveConverter::new(ConverterConfig::default(), ArchiveTools::all());
        assert!(converter.supports_output("tar"));
        assert!(converter.supports_output("7z"));
    }

    #[tokio::test]
    async fn test_extract_zip() {
        let dir = tempdir().unwrap();
        let archive = write_test_zip(dir.path());
        let out = dir.path().join("extracted");

        let converter = no_tools_converter();
        converter.extract_archive(&archive, &out).await.unwrap();

        assert_eq!(fs::read_to_string(out.join("inner/a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(out.join("b.txt")).unwrap(), "beta");
    }

    #[tokio::test]
    async fn test_zip_to_zip_repack() {
        let dir = tempdir().unwrap();
        let archive = write_test_zip(dir.path());
        let out_dir = dir.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();

        let converter = no_tools_converter();
        let request = ConversionRequest::new(&archive, &out_dir, "zip", Quality::Medium);
        let output = converter.convert(&request).await.unwrap();

        let file = fs::File::open(&output).unwrap();
        let mut repacked = zip::ZipArchive::new(file).unwrap();
        assert!(repacked.by_name("b.txt").is_ok());
    }

    #[tokio::test]
    async fn test_tar_output_rejected_without_tool() {
        let dir = tempdir().unwrap();
        let archive = write_test_zip(dir.path());

        let converter = no_tools_converter();
        let request = ConversionRequest::new(&archive, dir.path(), "tar", Quality::Medium);
        let result = converter.convert(&request).await;
        assert!(matches!(
            result,
            Err(ConvertError::UnsupportedOutput { .. })
        ));
    }

    #[tokio::test]
    async fn test_extract_missing_archive() {
        let dir = tempdir().unwrap();
        let converter = no_tools_converter();
        let result = converter
            .extract_archive(&dir.path().join("absent.zip"), dir.path())
            .await;
        assert!(matches!(result, Err(ConvertError::InputNotFound { .. })));
    }
}
