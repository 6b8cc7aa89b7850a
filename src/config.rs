//! Configuration types for sharelog-to-parquet
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use crate::parquet::convert::ConvertOptions;
use crate::parquet::writer::{WriterConfig, DEFAULT_COMPRESSION_LEVEL, DEFAULT_ROWS_PER_ROW_GROUP};
use crate::sharelog::Framing;
use clap::Parser;
use std::path::PathBuf;

/// Row group size limits
const MIN_ROW_GROUP_SIZE: usize = 1;
const MAX_ROW_GROUP_SIZE: usize = 10_000_000;

/// ZSTD level limits
const MIN_COMPRESSION_LEVEL: i32 = 1;
const MAX_COMPRESSION_LEVEL: i32 = 22;

/// Convert BEAM share logs to Parquet
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sharelog-to-parquet",
    version,
    about = "Convert BEAM share logs to Parquet",
    long_about = "Reads a share log (a sequence of length-prefixed share records) and writes \
                  one Parquet file with a 'share_beam' table.\n\n\
                  Records with an unknown version tag or a malformed payload are skipped.",
    after_help = "EXAMPLES:\n    \
        sharelog-to-parquet sharelog-2019-05-16.bin -o shares.parquet\n    \
        sharelog-to-parquet archive.bin -o shares.parquet --framing raw\n    \
        sharelog-to-parquet sharelog.bin -o shares.parquet --row-group-size 100000 -q"
)]
pub struct CliArgs {
    /// Share log to read
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Parquet file to write
    #[arg(short, long, default_value = "shares.parquet", value_name = "FILE")]
    pub output: PathBuf,

    /// Layout of each record in the share log
    #[arg(long, value_enum, default_value_t = Framing::Versioned)]
    pub framing: Framing,

    /// Rows per row group
    #[arg(long, default_value_t = DEFAULT_ROWS_PER_ROW_GROUP, value_name = "NUM")]
    pub row_group_size: usize,

    /// ZSTD compression level (1-22)
    #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL, value_name = "LEVEL")]
    pub compression_level: i32,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (log every skipped record)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Share log path
    pub input_path: PathBuf,

    /// Parquet output path
    pub output_path: PathBuf,

    /// Conversion options
    pub options: ConvertOptions,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl ConvertConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if !args.input.is_file() {
            return Err(ConfigError::InputNotFound { path: args.input });
        }

        if let Some(parent) = args.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConfigError::InvalidOutputPath {
                    path: args.output.clone(),
                    reason: format!("Parent directory '{}' does not exist", parent.display()),
                });
            }
        }
        if args.output.is_dir() {
            return Err(ConfigError::InvalidOutputPath {
                path: args.output.clone(),
                reason: "Path is a directory".to_string(),
            });
        }

        if !(MIN_ROW_GROUP_SIZE..=MAX_ROW_GROUP_SIZE).contains(&args.row_group_size) {
            return Err(ConfigError::InvalidRowGroupSize {
                size: args.row_group_size,
                min: MIN_ROW_GROUP_SIZE,
                max: MAX_ROW_GROUP_SIZE,
            });
        }

        if !(MIN_COMPRESSION_LEVEL..=MAX_COMPRESSION_LEVEL).contains(&args.compression_level) {
            return Err(ConfigError::InvalidCompressionLevel {
                level: args.compression_level,
                min: MIN_COMPRESSION_LEVEL,
                max: MAX_COMPRESSION_LEVEL,
            });
        }

        Ok(Self {
            input_path: args.input,
            output_path: args.output,
            options: ConvertOptions {
                framing: args.framing,
                writer: WriterConfig {
                    row_group_size: args.row_group_size,
                    compression_level: args.compression_level,
                },
            },
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args_for(input: PathBuf, output: PathBuf) -> CliArgs {
        CliArgs {
            input,
            output,
            framing: Framing::Versioned,
            row_group_size: DEFAULT_ROWS_PER_ROW_GROUP,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            quiet: false,
            verbose: false,
        }
    }

    #[test]
    fn test_parse_cli_args() {
        let args = CliArgs::try_parse_from([
            "sharelog-to-parquet",
            "in.bin",
            "-o",
            "out.parquet",
            "--framing",
            "raw",
            "--row-group-size",
            "5000",
            "-q",
        ])
        .unwrap();
        assert_eq!(args.input, PathBuf::from("in.bin"));
        assert_eq!(args.output, PathBuf::from("out.parquet"));
        assert_eq!(args.framing, Framing::Raw);
        assert_eq!(args.row_group_size, 5000);
        assert_eq!(args.compression_level, DEFAULT_COMPRESSION_LEVEL);
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_defaults() {
        let args = CliArgs::try_parse_from(["sharelog-to-parquet", "in.bin"]).unwrap();
        assert_eq!(args.output, PathBuf::from("shares.parquet"));
        assert_eq!(args.framing, Framing::Versioned);
        assert_eq!(args.row_group_size, DEFAULT_ROWS_PER_ROW_GROUP);
    }

    #[test]
    fn test_from_args_valid() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        std::fs::write(&input, b"").unwrap();

        let config = ConvertConfig::from_args(args_for(input.clone(), dir.path().join("out.parquet")))
            .unwrap();
        assert_eq!(config.input_path, input);
        assert!(config.show_progress);
        assert_eq!(config.options.writer.row_group_size, DEFAULT_ROWS_PER_ROW_GROUP);
    }

    #[test]
    fn test_from_args_missing_input() {
        let dir = tempdir().unwrap();
        let result = ConvertConfig::from_args(args_for(
            dir.path().join("missing.bin"),
            dir.path().join("out.parquet"),
        ));
        assert!(matches!(result, Err(ConfigError::InputNotFound { .. })));
    }

    #[test]
    fn test_from_args_bad_output_parent() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        std::fs::write(&input, b"").unwrap();

        let result =
            ConvertConfig::from_args(args_for(input, dir.path().join("nope").join("out.parquet")));
        assert!(matches!(result, Err(ConfigError::InvalidOutputPath { .. })));
    }

    #[test]
    fn test_from_args_limits() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        std::fs::write(&input, b"").unwrap();
        let output = dir.path().join("out.parquet");

        let mut args = args_for(input.clone(), output.clone());
        args.row_group_size = 0;
        assert!(matches!(
            ConvertConfig::from_args(args),
            Err(ConfigError::InvalidRowGroupSize { size: 0, .. })
        ));

        let mut args = args_for(input, output);
        args.compression_level = 23;
        assert!(matches!(
            ConvertConfig::from_args(args),
            Err(ConfigError::InvalidCompressionLevel { level: 23, .. })
        ));
    }
}
