//! sharelog-to-parquet - BEAM share log to Parquet converter
//!
//! Reads archived BEAM mining shares and writes them as a Parquet table for
//! analytics. Each share carries two packed difficulty encodings that are
//! decoded into `f64` columns on the way through.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │      Share log       │  [len][record] [len][record] ...
//! └──────────┬───────────┘
//!            │  ShareLogReader
//!            ▼
//! ┌──────────────────────┐
//! │      ShareBeam       │  version-prefixed protobuf payload
//! └──────────┬───────────┘
//!            │  append (block_bits, bits_reached → difficulty)
//!            ▼
//! ┌──────────────────────┐
//! │  ShareParquetWriter  │  per-column buffers, one row group per fill
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │   shares.parquet     │  table `share_beam`, 15 columns
//! └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! sharelog-to-parquet sharelog-2019-05-16.bin -o shares.parquet
//! ```

pub mod config;
pub mod difficulty;
pub mod error;
pub mod parquet;
pub mod progress;
pub mod share;
pub mod sharelog;

pub use config::{CliArgs, ConvertConfig};
pub use error::{ConvertError, Result, ShareError};
pub use share::{ShareBeam, CURRENT_VERSION};
pub use sharelog::{Framing, ShareLogReader, ShareLogWriter};
