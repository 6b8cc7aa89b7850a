//! Parquet output
//!
//! Writes decoded shares to Parquet with one row group per buffer fill.
//!
//! # Module Structure
//!
//! - `schema`: Arrow schema of the `share_beam` table (15 columns)
//! - `columns`: per-variant column buffers (`ShareColumns`, `BeamColumns`)
//! - `writer`: buffered row-group writer
//! - `convert`: share log → Parquet conversion job

pub mod columns;
pub mod convert;
pub mod schema;
pub mod writer;

pub use columns::{BeamColumns, RowQuality, ShareColumns};
pub use convert::{convert_sharelog_to_parquet, ConvertStats, ProgressCallback};
pub use schema::{share_beam_schema, share_beam_schema_ref, SHARE_BEAM_TABLE};
pub use writer::{BeamParquetWriter, ShareParquetWriter, WriterConfig, WriterStats};
