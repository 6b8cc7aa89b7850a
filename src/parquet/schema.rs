//! Arrow schema for BEAM share output
//!
//! Single source of truth for the 15-column `share_beam` table. Column order
//! and types are part of the output contract; readers depend on them.

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;

/// Root name of the Parquet schema for BEAM shares
pub const SHARE_BEAM_TABLE: &str = "share_beam";

/// Build the schema for BEAM shares.
///
/// Every column is required; there are no nulls in the output.
pub fn share_beam_schema() -> Schema {
    Schema::new(vec![
        Field::new("index", DataType::Int64, false),
        Field::new("worker_id", DataType::Int64, false),
        Field::new("user_id", DataType::Int32, false),
        Field::new("status", DataType::Int32, false),
        Field::new("timestamp", DataType::Int64, false),
        Field::new("ip", DataType::Utf8, false),
        Field::new("job_id", DataType::Int64, false),
        Field::new("share_diff", DataType::Int64, false),
        Field::new("network_diff", DataType::Float64, false),
        Field::new("height", DataType::Int32, false),
        Field::new("nonce", DataType::Int64, false),
        Field::new("session_id", DataType::Int32, false),
        Field::new("output_hash", DataType::Int32, false),
        Field::new("ext_user_id", DataType::Int32, false),
        Field::new("diff_reached", DataType::Float64, false),
    ])
}

/// Get the schema wrapped in an Arc (for Arrow writer APIs).
pub fn share_beam_schema_ref() -> SchemaRef {
    Arc::new(share_beam_schema())
}
