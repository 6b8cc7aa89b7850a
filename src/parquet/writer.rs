//! Buffered Parquet writer for share records
//!
//! Shares are spread across per-column buffers and written out as one row
//! group whenever the buffers reach the configured capacity, and once more
//! for the remainder on close. A row group is either written completely or
//! the writer fails; it never resumes after a failed flush.
//!
//! ```text
//!   append ──► column buffers ──(capacity reached / close)──► row group
//!                   ▲                                            │
//!                   └──────────── drained, reused ◄──────────────┘
//! ```

use crate::error::{ParquetError, ParquetResult};
use crate::parquet::columns::{BeamColumns, RowQuality, ShareColumns};
use arrow::array::ArrayRef;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriterOptions;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Rows per row group unless configured otherwise
pub const DEFAULT_ROWS_PER_ROW_GROUP: usize = 1_000_000;

/// Default ZSTD level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Writer for BEAM shares
pub type BeamParquetWriter = ShareParquetWriter<BeamColumns>;

/// Configuration for a share writer
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Number of rows per row group (also the buffer capacity)
    pub row_group_size: usize,
    /// ZSTD compression level (1-22)
    pub compression_level: i32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            row_group_size: DEFAULT_ROWS_PER_ROW_GROUP,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Counters for a writer's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Rows written to completed row groups
    pub rows_written: u64,
    /// Row groups written
    pub row_groups: u64,
    /// Rows whose IP text did not parse
    pub degraded_ips: u64,
}

enum WriterState {
    Open(ArrowWriter<File>),
    Closed,
    Failed,
}

/// Parquet writer that batches shares into fixed-size row groups.
///
/// Not shareable across threads of control; use one writer per output file.
pub struct ShareParquetWriter<C: ShareColumns> {
    path: PathBuf,
    schema: SchemaRef,
    columns: C,
    capacity: usize,
    /// Index of the last appended row. Survives flushes; only a new writer
    /// starts over.
    last_index: i64,
    state: WriterState,
    stats: WriterStats,
}

impl<C: ShareColumns> ShareParquetWriter<C> {
    /// Create the output file and allocate column buffers.
    pub fn open<P: AsRef<Path>>(path: P, config: &WriterConfig) -> ParquetResult<Self> {
        let path = path.as_ref().to_path_buf();
        let capacity = config.row_group_size.max(1);
        let props = writer_properties(config.compression_level, capacity)?;
        let schema = C::schema();

        let file = File::create(&path)?;
        let options = ArrowWriterOptions::new()
            .with_properties(props)
            .with_schema_root(C::TABLE_NAME.to_string());
        let writer = ArrowWriter::try_new_with_options(file, schema.clone(), options)?;

        debug!(
            path = %path.display(),
            table = C::TABLE_NAME,
            capacity,
            "Opened share writer"
        );

        Ok(Self {
            path,
            schema,
            columns: C::with_capacity(capacity),
            capacity,
            last_index: 0,
            state: WriterState::Open(writer),
            stats: WriterStats::default(),
        })
    }

    /// Buffer one share, flushing a row group if the buffers are full.
    pub fn append(&mut self, share: C::Share) -> ParquetResult<()> {
        self.ensure_open()?;

        self.last_index += 1;
        if self.columns.push(self.last_index, share) == RowQuality::DegradedIp {
            self.stats.degraded_ips += 1;
        }

        if self.columns.len() >= self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Write buffered rows as one row group. No-op when nothing is buffered.
    pub fn flush(&mut self) -> ParquetResult<()> {
        let writer = match &mut self.state {
            WriterState::Open(writer) => writer,
            WriterState::Closed => {
                return Err(ParquetError::WriterClosed {
                    path: self.path.clone(),
                })
            }
            WriterState::Failed => {
                return Err(ParquetError::WriterFailed {
                    path: self.path.clone(),
                })
            }
        };

        let rows = self.columns.len();
        if rows == 0 {
            return Ok(());
        }

        debug!(rows, "Flushing shares");

        match write_row_group(writer, &self.schema, self.columns.drain_arrays()) {
            Ok(()) => {
                self.stats.rows_written += rows as u64;
                self.stats.row_groups += 1;
                Ok(())
            }
            Err(e) => {
                error!(path = %self.path.display(), "Row group write failed: {}", e);
                // Drops the underlying writer and releases the file
                self.state = WriterState::Failed;
                Err(e)
            }
        }
    }

    /// Flush remaining rows and finalize the file.
    ///
    /// Closing an already closed writer returns the same stats again.
    pub fn close(&mut self) -> ParquetResult<WriterStats> {
        match self.state {
            WriterState::Open(_) => {}
            WriterState::Closed => return Ok(self.stats),
            WriterState::Failed => {
                return Err(ParquetError::WriterFailed {
                    path: self.path.clone(),
                })
            }
        }

        self.flush()?;

        if let WriterState::Open(writer) = std::mem::replace(&mut self.state, WriterState::Closed) {
            if let Err(e) = writer.close() {
                self.state = WriterState::Failed;
                return Err(e.into());
            }
        }

        debug!(
            path = %self.path.display(),
            rows = self.stats.rows_written,
            row_groups = self.stats.row_groups,
            "Closed share writer"
        );
        Ok(self.stats)
    }

    /// Current counters
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Rows waiting for the next flush
    pub fn buffered_rows(&self) -> usize {
        self.columns.len()
    }

    /// Rows per row group
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Output file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once `close` has succeeded
    pub fn is_closed(&self) -> bool {
        matches!(self.state, WriterState::Closed)
    }

    fn ensure_open(&self) -> ParquetResult<()> {
        match self.state {
            WriterState::Open(_) => Ok(()),
            WriterState::Closed => Err(ParquetError::WriterClosed {
                path: self.path.clone(),
            }),
            WriterState::Failed => Err(ParquetError::WriterFailed {
                path: self.path.clone(),
            }),
        }
    }
}

impl<C: ShareColumns> Drop for ShareParquetWriter<C> {
    fn drop(&mut self) {
        if matches!(self.state, WriterState::Open(_)) {
            if let Err(e) = self.close() {
                error!(path = %self.path.display(), "Failed to close share writer: {}", e);
            }
        }
    }
}

/// Build Parquet writer properties with ZSTD compression and column statistics.
fn writer_properties(compression_level: i32, row_group_size: usize) -> ParquetResult<WriterProperties> {
    let zstd_level =
        ZstdLevel::try_new(compression_level).map_err(|e| ParquetError::InvalidCompressionLevel {
            level: compression_level,
            reason: e.to_string(),
        })?;

    Ok(WriterProperties::builder()
        .set_compression(Compression::ZSTD(zstd_level))
        .set_statistics_enabled(EnabledStatistics::Chunk)
        .set_max_row_group_size(row_group_size)
        .build())
}

/// Write all columns as a single row group.
fn write_row_group(
    writer: &mut ArrowWriter<File>,
    schema: &SchemaRef,
    columns: Vec<ArrayRef>,
) -> ParquetResult<()> {
    // Rejects mismatched column counts, types, or lengths
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    writer.write(&batch)?;
    // Close the row group here instead of waiting for the size limit
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::{ShareBeam, CURRENT_VERSION};
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    fn test_share(nonce: i64) -> ShareBeam {
        let mut share = ShareBeam::new();
        share.version = Some(CURRENT_VERSION);
        share.worker_hash_id = Some(1000 + nonce);
        share.user_id = Some(7);
        share.ip = Some("192.168.0.1".to_string());
        share.nonce = Some(nonce);
        share
    }

    fn small_config(row_group_size: usize) -> WriterConfig {
        WriterConfig {
            row_group_size,
            compression_level: 1,
        }
    }

    /// Row group sizes and all batches of a written file
    fn read_back(path: &Path) -> (Vec<i64>, Vec<RecordBatch>) {
        let file = File::open(path).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let sizes = builder
            .metadata()
            .row_groups()
            .iter()
            .map(|rg| rg.num_rows())
            .collect();
        let batches = builder
            .build()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        (sizes, batches)
    }

    fn int64_values(batches: &[RecordBatch], name: &str) -> Vec<i64> {
        batches
            .iter()
            .flat_map(|b| {
                b.column_by_name(name)
                    .unwrap()
                    .as_any()
                    .downcast_ref::<Int64Array>()
                    .unwrap()
                    .values()
                    .to_vec()
            })
            .collect()
    }

    #[test]
    fn test_exact_capacity_flushes_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.parquet");
        let mut writer = BeamParquetWriter::open(&path, &small_config(4)).unwrap();

        for i in 0..4 {
            writer.append(test_share(i)).unwrap();
        }
        assert_eq!(writer.stats().row_groups, 1);
        assert_eq!(writer.buffered_rows(), 0);

        writer.append(test_share(4)).unwrap();
        assert_eq!(writer.stats().row_groups, 1);
        assert_eq!(writer.buffered_rows(), 1);

        let stats = writer.close().unwrap();
        assert_eq!(stats.row_groups, 2);
        assert_eq!(stats.rows_written, 5);

        let (sizes, _) = read_back(&path);
        assert_eq!(sizes, vec![4, 1]);
    }

    #[test]
    fn test_close_flushes_buffered_rows_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.parquet");
        let mut writer = BeamParquetWriter::open(&path, &small_config(100)).unwrap();

        for nonce in [30, 10, 20] {
            writer.append(test_share(nonce)).unwrap();
        }
        assert_eq!(writer.stats().row_groups, 0);
        writer.close().unwrap();

        let (sizes, batches) = read_back(&path);
        assert_eq!(sizes, vec![3]);
        assert_eq!(int64_values(&batches, "nonce"), vec![30, 10, 20]);
        assert_eq!(int64_values(&batches, "worker_id"), vec![1030, 1010, 1020]);
    }

    #[test]
    fn test_index_continues_across_flushes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.parquet");
        let mut writer = BeamParquetWriter::open(&path, &small_config(3)).unwrap();

        for i in 0..10 {
            writer.append(test_share(i)).unwrap();
        }
        writer.close().unwrap();

        let (sizes, batches) = read_back(&path);
        assert_eq!(sizes, vec![3, 3, 3, 1]);
        assert_eq!(int64_values(&batches, "index"), (1..=10).collect::<Vec<i64>>());
    }

    #[test]
    fn test_zero_bits_give_zero_difficulty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.parquet");
        let mut writer = BeamParquetWriter::open(&path, &small_config(10)).unwrap();

        for i in 0..3 {
            let mut share = test_share(i);
            share.block_bits = Some(0);
            share.bits_reached = Some(0);
            writer.append(share).unwrap();
        }
        writer.close().unwrap();

        let (_, batches) = read_back(&path);
        assert_eq!(int64_values(&batches, "index"), vec![1, 2, 3]);
        for name in ["network_diff", "diff_reached"] {
            for batch in &batches {
                let column = batch
                    .column_by_name(name)
                    .unwrap()
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .unwrap();
                assert!(column.values().iter().all(|v| *v == 0.0));
            }
        }
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.parquet");
        let mut writer = BeamParquetWriter::open(&path, &small_config(10)).unwrap();
        writer.append(test_share(1)).unwrap();

        let first = writer.close().unwrap();
        let second = writer.close().unwrap();
        assert_eq!(first, second);
        assert!(writer.is_closed());

        let (sizes, _) = read_back(&path);
        assert_eq!(sizes, vec![1]);
    }

    #[test]
    fn test_append_after_close_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.parquet");
        let mut writer = BeamParquetWriter::open(&path, &small_config(10)).unwrap();
        writer.close().unwrap();

        assert!(matches!(
            writer.append(test_share(1)),
            Err(ParquetError::WriterClosed { .. })
        ));
    }

    #[test]
    fn test_empty_writer_has_no_row_groups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.parquet");
        let mut writer = BeamParquetWriter::open(&path, &small_config(10)).unwrap();
        writer.flush().unwrap();
        let stats = writer.close().unwrap();
        assert_eq!(stats.row_groups, 0);

        let (sizes, batches) = read_back(&path);
        assert!(sizes.is_empty());
        assert!(batches.is_empty());
    }

    #[test]
    fn test_drop_flushes_pending_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.parquet");
        {
            let mut writer = BeamParquetWriter::open(&path, &small_config(10)).unwrap();
            writer.append(test_share(5)).unwrap();
            writer.append(test_share(6)).unwrap();
        }

        let (sizes, batches) = read_back(&path);
        assert_eq!(sizes, vec![2]);
        assert_eq!(int64_values(&batches, "nonce"), vec![5, 6]);
    }

    #[test]
    fn test_schema_root_is_table_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.parquet");
        BeamParquetWriter::open(&path, &small_config(10))
            .unwrap()
            .close()
            .unwrap();

        let file = File::open(&path).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let descr = builder.metadata().file_metadata().schema_descr();
        assert_eq!(descr.name(), "share_beam");
        assert_eq!(descr.num_columns(), 15);
    }

    #[test]
    fn test_malformed_ip_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.parquet");
        let mut writer = BeamParquetWriter::open(&path, &small_config(10)).unwrap();

        let mut share = test_share(1);
        share.ip = Some("999.1.1.1".to_string());
        writer.append(share).unwrap();
        writer.append(test_share(2)).unwrap();
        let stats = writer.close().unwrap();
        assert_eq!(stats.degraded_ips, 1);

        let (_, batches) = read_back(&path);
        let ip = batches[0]
            .column_by_name("ip")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(ip.value(0), "999.1.1.1");
        assert_eq!(ip.value(1), "192.168.0.1");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_flush_is_terminal() {
        let mut writer = BeamParquetWriter::open("/dev/full", &small_config(1000)).unwrap();

        let failed_at = (0..10_000).find(|&i| writer.append(test_share(i)).is_err());
        assert!(failed_at.is_some(), "writes to /dev/full never failed");

        assert!(matches!(
            writer.append(test_share(1)),
            Err(ParquetError::WriterFailed { .. })
        ));
        assert!(matches!(writer.flush(), Err(ParquetError::WriterFailed { .. })));
        assert!(matches!(writer.close(), Err(ParquetError::WriterFailed { .. })));
        assert!(!writer.is_closed());
    }

    #[test]
    fn test_invalid_compression_level() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.parquet");
        let config = WriterConfig {
            row_group_size: 10,
            compression_level: 99,
        };
        assert!(matches!(
            BeamParquetWriter::open(&path, &config),
            Err(ParquetError::InvalidCompressionLevel { level: 99, .. })
        ));
    }
}
