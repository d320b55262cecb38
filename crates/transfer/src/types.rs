use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::TransferError;

/// Transport encoding of chunk bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Base64,
}

impl FromStr for Encoding {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base64" => Ok(Self::Base64),
            other => Err(TransferError::UnsupportedEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64 => f.write_str("base64"),
        }
    }
}

/// Compression applied to the file before base64 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
}

impl FromStr for Compression {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "gzip" => Ok(Self::Gzip),
            other => Err(TransferError::UnsupportedCompression(other.to_string())),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Gzip => f.write_str("gzip"),
        }
    }
}

/// Identifies a session: the same transfer id on two channels never collides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub channel: String,
    pub transfer_id: String,
}

impl SessionKey {
    pub fn new(channel: impl Into<String>, transfer_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            transfer_id: transfer_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.channel, self.transfer_id)
    }
}

/// Bookkeeping for one in-progress transfer.
///
/// `received` only ever holds indices in `1..=total_parts`.
#[derive(Debug, Clone)]
pub struct TransferSession {
    pub transfer_id: String,
    /// Untrusted relative path; validated only when writing.
    pub destination_path: String,
    pub total_parts: u32,
    pub encoding: Encoding,
    pub compression: Compression,
    pub expected_sha256: Option<String>,
    pub created_at: Instant,
    received: BTreeMap<u32, String>,
}

impl TransferSession {
    /// Creates an empty session.
    pub fn new(
        transfer_id: String,
        destination_path: String,
        total_parts: u32,
        encoding: Encoding,
        compression: Compression,
        expected_sha256: Option<String>,
        created_at: Instant,
    ) -> Self {
        Self {
            transfer_id,
            destination_path,
            total_parts,
            encoding,
            compression,
            expected_sha256,
            created_at,
            received: BTreeMap::new(),
        }
    }

    /// Stores a fragment, overwriting any earlier one at the same index.
    ///
    /// Returns the number of distinct indices received so far.
    pub fn insert_chunk(
        &mut self,
        index: u32,
        total: u32,
        data_b64: String,
    ) -> Result<usize, TransferError> {
        if total != self.total_parts {
            return Err(TransferError::TotalMismatch {
                expected: self.total_parts,
                actual: total,
            });
        }
        if index < 1 || index > self.total_parts {
            return Err(TransferError::IndexOutOfRange {
                index,
                total: self.total_parts,
            });
        }
        self.received.insert(index, data_b64);
        Ok(self.received.len())
    }

    /// Number of distinct indices received.
    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    /// Returns `true` once every index in `1..=total_parts` is present.
    pub fn is_complete(&self) -> bool {
        self.received.len() == self.total_parts as usize
    }

    /// Sorted 1-based indices not yet received.
    pub fn missing_indices(&self) -> Vec<u32> {
        (1..=self.total_parts)
            .filter(|i| !self.received.contains_key(i))
            .collect()
    }

    /// Fragments in index order (not arrival order).
    pub fn ordered_fragments(&self) -> impl Iterator<Item = &str> {
        self.received.values().map(String::as_str)
    }

    /// Returns `true` when the session is older than `ttl` at `now`.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) > ttl
    }
}
