//! Reassembly engine for files sent as chunked text messages.
//!
//! The [`Assembler`] receives raw inbound text plus a channel key, keeps one
//! [`TransferSession`] per `(channel, transfer id)`, and on `[FILE END]`
//! decodes, verifies and writes the file below a sandbox root. Every outcome
//! is returned as a [`TransferOutcome`] value; nothing here talks to the
//! chat transport.

mod assembler;
mod config;
mod outbound;
mod outcome;
mod pipeline;
mod sink;
mod store;
mod types;
mod validation;

pub use assembler::Assembler;
pub use config::{AssemblerConfig, RestartPolicy};
pub use outbound::{EncodeOptions, EncodedTransfer, encode_transfer};
pub use outcome::TransferOutcome;
pub use pipeline::{DecodedPayload, checksum_bytes, decode_payload};
pub use sink::SinkWriter;
pub use store::{SessionStore, Sessions};
pub use types::{Compression, Encoding, SessionKey, TransferSession};
pub use validation::resolve_within_root;

use saveme_protocol::ParseError;

/// Default session time-to-live: 15 minutes.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 900;

/// Default upper bound on `total_parts` accepted from a `[FILE START]`.
pub const DEFAULT_MAX_TOTAL_PARTS: u32 = 100_000;

/// Default size of one outbound base64 fragment, in characters.
///
/// Small enough that a chunk plus its header fits in a single chat message.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Errors produced by the transfer crate.
///
/// The display strings are part of the ack records sent back to callers.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("missing path")]
    MissingPath,

    #[error("unsupported encoding")]
    UnsupportedEncoding(String),

    #[error("unsupported compression")]
    UnsupportedCompression(String),

    #[error("session already exists")]
    SessionExists,

    #[error("no active session for id")]
    SessionNotFound,

    #[error("total mismatch")]
    TotalMismatch { expected: u32, actual: u32 },

    #[error("index out of range")]
    IndexOutOfRange { index: u32, total: u32 },

    #[error("missing chunks")]
    MissingChunks { missing: Vec<u32> },

    #[error("base64 decode failed")]
    Base64Decode(#[source] base64::DecodeError),

    #[error("gzip decompress failed")]
    GzipDecompress(#[source] std::io::Error),

    #[error("sha256 mismatch")]
    Sha256Mismatch { expected: String, actual: String },

    #[error("path traversal detected: {0}")]
    PathTraversal(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
