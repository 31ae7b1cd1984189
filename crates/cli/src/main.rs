//! Command-line interface for converting files without the server.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recast_core::{
    app_dir, load_config, ArchiveConverter, ConversionRequest, ConverterRegistry, Quality,
};

#[derive(Parser)]
#[command(name = "recast", version, about = "Convert files between formats")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn parse_quality(value: &str) -> Result<Quality, String> {
    value.parse()
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single file
    Convert {
        /// File to convert
        input: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// Target format
        #[arg(short, long)]
        format: String,
        /// Conversion quality
        #[arg(short, long, default_value = "medium", value_parser = parse_quality)]
        quality: Quality,
    },
    /// Convert multiple files
    Batch {
        /// Files to convert
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// Target format
        #[arg(short, long)]
        format: String,
        /// Conversion quality
        #[arg(short, long, default_value = "medium", value_parser = parse_quality)]
        quality: Quality,
    },
    /// Extract an archive
    Extract {
        /// Archive to extract
        archive: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List supported formats
    Formats,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    let code = tokio::select! {
        result = run(cli) => match result {
            Ok(true) => 0,
            Ok(false) => 1,
            Err(e) => {
                eprintln!("✗ {}", e);
                1
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<bool> {
    let config = load_config(&app_dir().join("config.toml"))?;

    match cli.command {
        Commands::Convert {
            input,
            output,
            format,
            quality,
        } => {
            let registry = ConverterRegistry::with_defaults(&config.converter).await;
            convert_file(&registry, &input, &output, &format, quality).await
        }
        Commands::Batch {
            inputs,
            output,
            format,
            quality,
        } => {
            let registry = ConverterRegistry::with_defaults(&config.converter).await;
            let total = inputs.len();
            let mut succeeded = 0usize;
            let mut failed = 0usize;

            println!("Batch conversion: {} file(s)", total);
            for (i, input) in inputs.iter().enumerate() {
                println!("[{}/{}] {}", i + 1, total, input.display());
                if convert_file(&registry, input, &output, &format, quality).await? {
                    succeeded += 1;
                } else {
                    failed += 1;
                }
            }

            println!("Done: {} succeeded, {} failed", succeeded, failed);
            Ok(failed == 0)
        }
        Commands::Extract { archive, output } => {
            let converter = ArchiveConverter::detect(config.converter.clone()).await;
            match converter.extract_archive(&archive, &output).await {
                Ok(()) => {
                    println!("✓ Extracted to {}", output.display());
                    Ok(true)
                }
                Err(e) => {
                    eprintln!("✗ Extraction failed: {}", e);
                    Ok(false)
                }
            }
        }
        Commands::Formats => {
            print_formats();
            Ok(true)
        }
    }
}

/// Convert one file, reporting the outcome. A per-file failure prints
/// an error and returns Ok(false); only setup problems are hard errors.
async fn convert_file(
    registry: &ConverterRegistry,
    input: &Path,
    output_dir: &Path,
    format: &str,
    quality: Quality,
) -> Result<bool> {
    std::fs::create_dir_all(output_dir)?;

    let converter = match registry.resolve(input) {
        Ok(converter) => converter,
        Err(e) => {
            eprintln!("✗ {}: {}", input.display(), e);
            return Ok(false);
        }
    };
    if !converter.supports_output(format) {
        eprintln!(
            "✗ {}: {} converter does not support {}",
            input.display(),
            converter.name(),
            format
        );
        return Ok(false);
    }

    let request = ConversionRequest::new(input, output_dir, format, quality);
    match converter.convert(&request).await {
        Ok(path) => {
            println!("✓ {} -> {}", input.display(), path.display());
            Ok(true)
        }
        Err(e) => {
            eprintln!("✗ {}: {}", input.display(), e);
            Ok(false)
        }
    }
}

fn print_formats() {
    println!("Supported formats:");
    println!();
    println!("Images:");
    println!("  in:  png, jpg, jpeg, bmp, gif, tiff, webp");
    println!("  out: png, jpg, jpeg, bmp, gif, tiff, pdf");
    println!();
    println!("Documents:");
    println!("  in:  pdf, docx, txt");
    println!("  out: pdf, docx, txt");
    println!();
    println!("Advanced documents:");
    println!("  in:  epub, odt, rtf");
    println!("  out: pdf, docx, txt, epub, odt, rtf");
    println!();
    println!("Spreadsheets:");
    println!("  in:  xlsx, csv, ods");
    println!("  out: xlsx, csv, ods, pdf");
    println!();
    println!("Archives:");
    println!("  in:  zip, tar, rar, 7z");
    println!("  out: zip, tar, 7z (or extraction)");
    println!();
    println!("Audio:");
    println!("  in:  mp3, wav, flac");
    println!("  out: mp3, wav, flac, ogg");
    println!();
    println!("Video:");
    println!("  in:  mp4, avi");
    println!("  out: mp4, avi, mkv, mov");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_convert() {
        let cli = Cli::try_parse_from([
            "recast", "convert", "photo.png", "--output", "./out", "--format", "jpg",
        ])
        .unwrap();
        match cli.command {
            Commands::Convert {
                input,
                format,
                quality,
                ..
            } => {
                assert_eq!(input, PathBuf::from("photo.png"));
                assert_eq!(format, "jpg");
                assert_eq!(quality, Quality::Medium);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_cli_parses_batch_quality() {
        let cli = Cli::try_parse_from([
            "recast", "batch", "a.mp3", "b.mp3", "--output", "./out", "--format", "ogg",
            "--quality", "high",
        ])
        .unwrap();
        match cli.command {
            Commands::Batch {
                inputs, quality, ..
            } => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(quality, Quality::High);
            }
            _ => panic!("expected batch"),
        }
    }

    #[test]
    fn test_cli_rejects_empty_batch() {
        let result =
            Cli::try_parse_from(["recast", "batch", "--output", "./out", "--format", "ogg"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_bad_quality() {
        let result = Cli::try_parse_from([
            "recast", "convert", "a.png", "--output", "o", "--format", "jpg", "--quality",
            "ultra",
        ]);
        assert!(result.is_err());
    }
}
