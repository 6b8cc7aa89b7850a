//! Share log to Parquet conversion
//!
//! Streams shares out of one share-log file and writes one Parquet file.
//! Undecodable records are counted and skipped; writer failures end the job.

use crate::error::{ConvertError, ShareError, SharelogError};
use crate::parquet::writer::{BeamParquetWriter, WriterConfig};
use crate::sharelog::{Framing, ShareLogReader};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Records between progress callbacks
const PROGRESS_INTERVAL: u64 = 100_000;

/// Options for a conversion job
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Layout of each frame body in the input
    pub framing: Framing,
    /// Parquet writer settings
    pub writer: WriterConfig,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            framing: Framing::Versioned,
            writer: WriterConfig::default(),
        }
    }
}

/// Statistics from a conversion job
#[derive(Debug, Clone, Default)]
pub struct ConvertStats {
    /// Frames read (decoded or not)
    pub records_read: u64,
    pub shares_written: u64,
    /// Frames carrying a version tag this build doesn't read
    pub skipped_unsupported: u64,
    /// Frames that failed to decode
    pub skipped_malformed: u64,
    /// Partial frames at the end of the input
    pub truncated_frames: u64,
    pub row_groups: u64,
    /// Shares whose IP text did not parse
    pub degraded_ips: u64,
    /// Size of the output file
    pub bytes_written: u64,
    /// False when stopped by the shutdown flag
    pub completed: bool,
    pub duration: Duration,
}

impl ConvertStats {
    /// All records that did not make it into the output
    pub fn skipped(&self) -> u64 {
        self.skipped_unsupported + self.skipped_malformed + self.truncated_frames
    }
}

/// Progress callback type: (records read, shares written)
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send>;

/// Convert a share log into a Parquet file.
///
/// The writer is closed exactly once on every path out of this function, so
/// rows buffered before an interruption or a read error still reach the file.
pub fn convert_sharelog_to_parquet<P1, P2>(
    input: P1,
    output: P2,
    options: &ConvertOptions,
    shutdown: Option<Arc<AtomicBool>>,
    progress_callback: Option<ProgressCallback>,
) -> Result<ConvertStats, ConvertError>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let input = input.as_ref();
    let output = output.as_ref();
    let start = Instant::now();

    info!("Opening share log: {} ({:?} framing)", input.display(), options.framing);
    let reader = ShareLogReader::open(input, options.framing)?;

    info!(
        "Writing Parquet: {} (row_group_size={})",
        output.display(),
        options.writer.row_group_size
    );
    let mut writer = BeamParquetWriter::open(output, &options.writer)?;

    let mut stats = ConvertStats {
        completed: true,
        ..Default::default()
    };
    let mut progress_counter: u64 = 0;

    for result in reader {
        match result {
            Ok(share) => {
                stats.records_read += 1;
                writer.append(share)?;
                stats.shares_written += 1;
            }
            Err(SharelogError::Record { offset, source }) => {
                stats.records_read += 1;
                match source {
                    ShareError::UnsupportedVersion { .. } => stats.skipped_unsupported += 1,
                    _ => stats.skipped_malformed += 1,
                }
                debug!(offset, "Skipping share: {}", source);
            }
            Err(e @ SharelogError::TruncatedFrame { .. }) => {
                stats.truncated_frames += 1;
                warn!("Ignoring partial frame: {}", e);
            }
            Err(e) => {
                // Keep what was read so far
                if let Err(close_err) = writer.close() {
                    warn!("Failed to close output after read error: {}", close_err);
                }
                return Err(e.into());
            }
        }

        progress_counter += 1;
        if progress_counter >= PROGRESS_INTERVAL {
            if let Some(ref cb) = progress_callback {
                cb(stats.records_read, stats.shares_written);
            }
            progress_counter = 0;
        }

        // Stop only once the frame in hand is counted
        if shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
        {
            info!("Conversion interrupted after {} records", stats.records_read);
            stats.completed = false;
            break;
        }
    }

    let writer_stats = writer.close()?;
    stats.row_groups = writer_stats.row_groups;
    stats.degraded_ips = writer_stats.degraded_ips;
    stats.bytes_written = fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    stats.duration = start.elapsed();

    if let Some(cb) = progress_callback {
        cb(stats.records_read, stats.shares_written);
    }

    info!(
        "Conversion complete: {} shares in {} row groups ({} skipped, {} bytes)",
        stats.shares_written,
        stats.row_groups,
        stats.skipped(),
        stats.bytes_written
    );

    Ok(stats)
}
