//! Per-variant column buffers
//!
//! A share variant plugs into [`ShareParquetWriter`](super::ShareParquetWriter)
//! by implementing [`ShareColumns`]: it names its table, describes its schema,
//! and knows how to spread one share across its column buffers.

use crate::difficulty::{compact_target_to_difficulty, packed_to_beam_difficulty};
use crate::parquet::schema::{share_beam_schema_ref, SHARE_BEAM_TABLE};
use crate::share::ShareBeam;
use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::SchemaRef;
use std::sync::Arc;
use tracing::debug;

/// How a share landed in the buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowQuality {
    /// Every field converted cleanly
    Clean,
    /// IP text did not parse; it was stored as-is
    DegradedIp,
}

/// Column buffers for one share variant.
///
/// Buffers are allocated once with the row group capacity and reused for
/// every row group.
pub trait ShareColumns {
    /// Record type consumed by `push`
    type Share;

    /// Root name of the Parquet schema
    const TABLE_NAME: &'static str;

    /// Output schema; `drain_arrays` returns columns in this order
    fn schema() -> SchemaRef;

    /// Allocate buffers for `capacity` rows
    fn with_capacity(capacity: usize) -> Self;

    /// Append one share under the given row index
    fn push(&mut self, index: i64, share: Self::Share) -> RowQuality;

    /// Rows currently buffered
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build one array per column and empty the buffers, keeping their
    /// allocations.
    fn drain_arrays(&mut self) -> Vec<ArrayRef>;
}

/// Column buffers for BEAM shares
#[derive(Debug)]
pub struct BeamColumns {
    index: Vec<i64>,
    worker_id: Vec<i64>,
    user_id: Vec<i32>,
    status: Vec<i32>,
    timestamp: Vec<i64>,
    ip: Vec<String>,
    job_id: Vec<i64>,
    share_diff: Vec<i64>,
    network_diff: Vec<f64>,
    height: Vec<i32>,
    nonce: Vec<i64>,
    session_id: Vec<i32>,
    output_hash: Vec<i32>,
    ext_user_id: Vec<i32>,
    diff_reached: Vec<f64>,
}

impl ShareColumns for BeamColumns {
    type Share = ShareBeam;

    const TABLE_NAME: &'static str = SHARE_BEAM_TABLE;

    fn schema() -> SchemaRef {
        share_beam_schema_ref()
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            index: Vec::with_capacity(capacity),
            worker_id: Vec::with_capacity(capacity),
            user_id: Vec::with_capacity(capacity),
            status: Vec::with_capacity(capacity),
            timestamp: Vec::with_capacity(capacity),
            ip: Vec::with_capacity(capacity),
            job_id: Vec::with_capacity(capacity),
            share_diff: Vec::with_capacity(capacity),
            network_diff: Vec::with_capacity(capacity),
            height: Vec::with_capacity(capacity),
            nonce: Vec::with_capacity(capacity),
            session_id: Vec::with_capacity(capacity),
            output_hash: Vec::with_capacity(capacity),
            ext_user_id: Vec::with_capacity(capacity),
            diff_reached: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, index: i64, share: ShareBeam) -> RowQuality {
        let quality = if share.parse_ipv4().is_some() {
            RowQuality::Clean
        } else {
            debug!(index, ip = share.ip(), "Unparseable share IP stored as-is");
            RowQuality::DegradedIp
        };

        self.index.push(index);
        self.worker_id.push(share.worker_hash_id());
        self.user_id.push(share.user_id());
        self.status.push(share.status());
        self.timestamp.push(share.timestamp());
        self.job_id.push(share.input_prefix());
        self.share_diff.push(share.share_diff());
        self.network_diff
            .push(packed_to_beam_difficulty(share.block_bits()));
        self.height.push(share.height());
        self.nonce.push(share.nonce());
        self.session_id.push(share.session_id());
        self.output_hash.push(share.output_hash());
        self.ext_user_id.push(share.ext_user_id());
        self.diff_reached
            .push(compact_target_to_difficulty(share.bits_reached()));
        self.ip.push(share.ip.unwrap_or_default());

        quality
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn drain_arrays(&mut self) -> Vec<ArrayRef> {
        vec![
            Arc::new(Int64Array::from_iter_values(self.index.drain(..))),
            Arc::new(Int64Array::from_iter_values(self.worker_id.drain(..))),
            Arc::new(Int32Array::from_iter_values(self.user_id.drain(..))),
            Arc::new(Int32Array::from_iter_values(self.status.drain(..))),
            Arc::new(Int64Array::from_iter_values(self.timestamp.drain(..))),
            Arc::new(StringArray::from_iter_values(self.ip.drain(..))),
            Arc::new(Int64Array::from_iter_values(self.job_id.drain(..))),
            Arc::new(Int64Array::from_iter_values(self.share_diff.drain(..))),
            Arc::new(Float64Array::from_iter_values(self.network_diff.drain(..))),
            Arc::new(Int32Array::from_iter_values(self.height.drain(..))),
            Arc::new(Int64Array::from_iter_values(self.nonce.drain(..))),
            Arc::new(Int32Array::from_iter_values(self.session_id.drain(..))),
            Arc::new(Int32Array::from_iter_values(self.output_hash.drain(..))),
            Arc::new(Int32Array::from_iter_values(self.ext_user_id.drain(..))),
            Arc::new(Float64Array::from_iter_values(self.diff_reached.drain(..))),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::CURRENT_VERSION;
    use arrow::array::Array;

    fn share(ip: &str) -> ShareBeam {
        let mut share = ShareBeam::new();
        share.version = Some(CURRENT_VERSION);
        share.worker_hash_id = Some(42);
        share.ip = Some(ip.to_string());
        share.block_bits = Some(0x1800_0000);
        share.bits_reached = Some(0x1d00_ffff);
        share
    }

    #[test]
    fn test_push_and_drain() {
        let mut columns = BeamColumns::with_capacity(8);
        assert!(columns.is_empty());

        assert_eq!(columns.push(1, share("1.2.3.4")), RowQuality::Clean);
        assert_eq!(columns.push(2, share("1.2.3.5")), RowQuality::Clean);
        assert_eq!(columns.len(), 2);

        let arrays = columns.drain_arrays();
        assert_eq!(arrays.len(), BeamColumns::schema().fields().len());
        assert!(arrays.iter().all(|a| a.len() == 2));
        assert!(columns.is_empty());

        let network_diff = arrays[8].as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(network_diff.value(0), 16_777_216.0);
        let diff_reached = arrays[14].as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(diff_reached.value(1), 4_295_032_833.0);
    }

    #[test]
    fn test_drain_keeps_capacity() {
        let mut columns = BeamColumns::with_capacity(16);
        for i in 0..16 {
            columns.push(i, share("10.0.0.1"));
        }
        columns.drain_arrays();
        assert!(columns.index.capacity() >= 16);
        assert!(columns.ip.capacity() >= 16);
    }

    #[test]
    fn test_degraded_ip_is_stored_verbatim() {
        let mut columns = BeamColumns::with_capacity(1);
        assert_eq!(columns.push(1, share("bogus:ip")), RowQuality::DegradedIp);

        let arrays = columns.drain_arrays();
        let ip = arrays[5].as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(ip.value(0), "bogus:ip");
    }
}
