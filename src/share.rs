//! BEAM share records
//!
//! A share is stored as a protobuf message. Two framings exist in archived
//! data:
//!
//! ```text
//! version-prefixed:  [version: u32 LE][payload]
//! length-prefixed:   [length:  u32 LE][payload]
//! ```
//!
//! Only the current version tag is accepted when decoding a version-prefixed
//! record. Anything else is an expected, skippable condition for old data.

use crate::error::ShareError;
use prost::Message;
use std::net::{IpAddr, Ipv4Addr};

/// Version tag of the current share format: `0bea` for BEAM, `0001` for v1
pub const CURRENT_VERSION: u32 = 0x0bea_0001;

/// Size of the version or length prefix
pub const PREFIX_LEN: usize = std::mem::size_of::<u32>();

/// IP text of a freshly constructed share
pub const DEFAULT_IP: &str = "0.0.0.0";

/// One share submitted by a BEAM miner.
///
/// Fields `output_hash`, `bits_reached` and `ext_user_id` are optional on the
/// wire and read as zero when absent; every other field is required.
#[derive(Clone, PartialEq, Message)]
pub struct ShareBeam {
    #[prost(uint32, optional, tag = "1")]
    pub version: Option<u32>,
    #[prost(int64, optional, tag = "2")]
    pub worker_hash_id: Option<i64>,
    #[prost(int32, optional, tag = "3")]
    pub user_id: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub status: Option<i32>,
    #[prost(int64, optional, tag = "5")]
    pub timestamp: Option<i64>,
    #[prost(string, optional, tag = "6")]
    pub ip: Option<String>,
    /// Job identifier
    #[prost(int64, optional, tag = "7")]
    pub input_prefix: Option<i64>,
    #[prost(int64, optional, tag = "8")]
    pub share_diff: Option<i64>,
    /// Network difficulty in BEAM packed form
    #[prost(uint32, optional, tag = "9")]
    pub block_bits: Option<u32>,
    #[prost(int32, optional, tag = "10")]
    pub height: Option<i32>,
    #[prost(int64, optional, tag = "11")]
    pub nonce: Option<i64>,
    #[prost(int32, optional, tag = "12")]
    pub session_id: Option<i32>,
    #[prost(int32, optional, tag = "13")]
    pub output_hash: Option<i32>,
    /// Reached target, as a bit length (old logs) or compact target
    #[prost(uint32, optional, tag = "14")]
    pub bits_reached: Option<u32>,
    #[prost(int32, optional, tag = "15")]
    pub ext_user_id: Option<i32>,
}

impl ShareBeam {
    /// Create a share with every required field set to zero.
    ///
    /// The version is `0`, not [`CURRENT_VERSION`]; callers producing records
    /// for `decode` set it explicitly. `ShareBeam::default()` leaves every
    /// field unset instead and won't serialize.
    pub fn new() -> Self {
        Self {
            version: Some(0),
            worker_hash_id: Some(0),
            user_id: Some(0),
            status: Some(0),
            timestamp: Some(0),
            ip: Some(DEFAULT_IP.to_string()),
            input_prefix: Some(0),
            share_diff: Some(0),
            block_bits: Some(0),
            height: Some(0),
            nonce: Some(0),
            session_id: Some(0),
            output_hash: None,
            bits_reached: None,
            ext_user_id: None,
        }
    }

    /// Decode a version-prefixed record.
    pub fn decode(bytes: &[u8]) -> Result<Self, ShareError> {
        if bytes.is_empty() {
            return Err(ShareError::EmptyInput);
        }

        let (tag, payload) =
            bytes
                .split_first_chunk::<PREFIX_LEN>()
                .ok_or_else(|| ShareError::MalformedPayload {
                    reason: format!("{} bytes is shorter than the version tag", bytes.len()),
                })?;

        let version = u32::from_le_bytes(*tag);
        if version != CURRENT_VERSION {
            return Err(ShareError::UnsupportedVersion { found: version });
        }

        Self::decode_payload(payload)
    }

    /// Decode a bare protobuf payload (the body of a length-prefixed frame).
    pub fn decode_payload(payload: &[u8]) -> Result<Self, ShareError> {
        let share =
            <Self as Message>::decode(payload).map_err(|e| ShareError::MalformedPayload {
                reason: e.to_string(),
            })?;

        if let Some(field) = share.missing_required_field() {
            return Err(ShareError::MalformedPayload {
                reason: format!("missing required field '{}'", field),
            });
        }

        Ok(share)
    }

    /// Serialize as `[payload length][payload]`.
    pub fn encode_length_prefixed(&self) -> Result<Vec<u8>, ShareError> {
        self.check_initialized()?;
        let len = u32::try_from(self.encoded_len()).map_err(|_| {
            ShareError::SerializationFailure {
                reason: "payload does not fit a 32-bit length".into(),
            }
        })?;
        self.encode_with_prefix(len)
    }

    /// Serialize as `[version][payload]`, using this record's own version.
    pub fn encode_version_prefixed(&self) -> Result<Vec<u8>, ShareError> {
        self.check_initialized()?;
        self.encode_with_prefix(self.version())
    }

    /// Payload size in bytes, or 0 if a required field is unset.
    pub fn encoded_payload_len(&self) -> usize {
        match self.missing_required_field() {
            None => self.encoded_len(),
            Some(_) => 0,
        }
    }

    /// Parse the IP text, accepting IPv4 and IPv4-mapped IPv6 addresses.
    pub fn parse_ipv4(&self) -> Option<Ipv4Addr> {
        match self.ip().trim().parse::<IpAddr>().ok()? {
            IpAddr::V4(addr) => Some(addr),
            IpAddr::V6(addr) => addr.to_ipv4_mapped(),
        }
    }

    /// Four-octet form of the IP; `0.0.0.0` when the text doesn't parse.
    pub fn ip_octets(&self) -> [u8; 4] {
        self.parse_ipv4()
            .unwrap_or(Ipv4Addr::UNSPECIFIED)
            .octets()
    }

    fn encode_with_prefix(&self, prefix: u32) -> Result<Vec<u8>, ShareError> {
        let mut buf = Vec::with_capacity(PREFIX_LEN + self.encoded_len());
        buf.extend_from_slice(&prefix.to_le_bytes());
        self.encode(&mut buf)
            .map_err(|e| ShareError::SerializationFailure {
                reason: e.to_string(),
            })?;
        Ok(buf)
    }

    fn check_initialized(&self) -> Result<(), ShareError> {
        match self.missing_required_field() {
            None => Ok(()),
            Some(field) => Err(ShareError::SerializationFailure {
                reason: format!("required field '{}' is not set", field),
            }),
        }
    }

    fn missing_required_field(&self) -> Option<&'static str> {
        let required = [
            ("version", self.version.is_some()),
            ("worker_hash_id", self.worker_hash_id.is_some()),
            ("user_id", self.user_id.is_some()),
            ("status", self.status.is_some()),
            ("timestamp", self.timestamp.is_some()),
            ("ip", self.ip.is_some()),
            ("input_prefix", self.input_prefix.is_some()),
            ("share_diff", self.share_diff.is_some()),
            ("block_bits", self.block_bits.is_some()),
            ("height", self.height.is_some()),
            ("nonce", self.nonce.is_some()),
            ("session_id", self.session_id.is_some()),
        ];
        required
            .iter()
            .find(|(_, set)| !set)
            .map(|(name, _)| *name)
    }
}
