//! Sender side: turns a byte payload into the message sequence the
//! [`Assembler`](crate::Assembler) accepts.

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::write::GzEncoder;
use saveme_protocol::{StartMeta, format_chunk, format_end, format_start};

use crate::pipeline::checksum_bytes;
use crate::types::{Compression, Encoding};
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Options for [`encode_transfer`].
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Base64 characters per chunk. Must be non-zero.
    pub chunk_size: usize,
    /// Gzip the payload before encoding.
    pub gzip: bool,
    /// Fixed transfer id; a random UUID is used when `None`.
    pub transfer_id: Option<String>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            gzip: true,
            transfer_id: None,
        }
    }
}

/// An encoded transfer ready to be sent message by message.
#[derive(Debug, Clone)]
pub struct EncodedTransfer {
    pub transfer_id: String,
    /// Hex SHA-256 of the original, uncompressed bytes.
    pub sha256: String,
    pub total_parts: u32,
    /// `[FILE START]`, every `[FILE CHUNK]` in order, then `[FILE END]`.
    pub messages: Vec<String>,
}

/// Encodes `data` for delivery to `destination` below the receiver's root.
///
/// An empty payload still produces one (empty) chunk.
pub fn encode_transfer(
    data: &[u8],
    destination: &str,
    options: &EncodeOptions,
) -> Result<EncodedTransfer, TransferError> {
    if options.chunk_size == 0 {
        return Err(TransferError::InvalidConfig(
            "chunk_size must be greater than 0".into(),
        ));
    }

    let sha256 = checksum_bytes(data);
    let (payload, compression) = if options.gzip {
        (gzip(data)?, Compression::Gzip)
    } else {
        (data.to_vec(), Compression::None)
    };
    let encoded = STANDARD.encode(payload);

    // Base64 output is ASCII, so byte slicing never splits a character.
    let fragments: Vec<&str> = if encoded.is_empty() {
        vec![""]
    } else {
        encoded
            .as_bytes()
            .chunks(options.chunk_size)
            .filter_map(|c| std::str::from_utf8(c).ok())
            .collect()
    };
    let total_parts = u32::try_from(fragments.len()).map_err(|_| {
        TransferError::InvalidConfig(format!(
            "{} chunks exceed the protocol limit",
            fragments.len()
        ))
    })?;

    let transfer_id = options
        .transfer_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let meta = StartMeta {
        path: Some(destination.to_string()),
        total_parts,
        encoding: Encoding::Base64.to_string(),
        compression: compression.to_string(),
        sha256: Some(sha256.clone()),
    };

    let mut messages = Vec::with_capacity(fragments.len() + 2);
    messages.push(format_start(&transfer_id, &meta));
    for (i, fragment) in (1..=total_parts).zip(&fragments) {
        messages.push(format_chunk(&transfer_id, i, total_parts, fragment));
    }
    messages.push(format_end(&transfer_id));

    tracing::debug!(
        id = %transfer_id,
        bytes = data.len(),
        encoded_len = encoded.len(),
        total_parts,
        %compression,
        "transfer encoded"
    );

    Ok(EncodedTransfer {
        transfer_id,
        sha256,
        total_parts,
        messages,
    })
}

fn gzip(data: &[u8]) -> Result<Vec<u8>, TransferError> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
