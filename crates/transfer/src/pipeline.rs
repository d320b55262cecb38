//! Decode/verify pipeline run once every chunk of a transfer is present:
//! concatenate in index order, base64-decode, optionally gunzip, then
//! check the SHA-256 digest.

use std::io::Read;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use flate2::read::MultiGzDecoder;
use sha2::{Digest, Sha256};

use crate::TransferError;
use crate::types::{Compression, TransferSession};

/// Standard alphabet; senders may or may not pad the final fragment.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Final file contents plus their digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`.
    pub sha256: String,
}

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Runs the pipeline over a complete session.
///
/// Whitespace inside fragments (multi-line chunk bodies) is ignored. Nothing
/// is returned on a digest mismatch, so corrupted bytes never reach disk.
pub fn decode_payload(session: &TransferSession) -> Result<DecodedPayload, TransferError> {
    let joined: String = session
        .ordered_fragments()
        .flat_map(str::chars)
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let mut bytes = BASE64
        .decode(joined.as_bytes())
        .map_err(TransferError::Base64Decode)?;

    if session.compression == Compression::Gzip {
        bytes = gunzip(&bytes)?;
    }

    let sha256 = checksum_bytes(&bytes);
    if let Some(expected) = &session.expected_sha256 {
        if !expected.eq_ignore_ascii_case(&sha256) {
            return Err(TransferError::Sha256Mismatch {
                expected: expected.clone(),
                actual: sha256,
            });
        }
    }

    Ok(DecodedPayload { bytes, sha256 })
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>, TransferError> {
    let mut decoder = MultiGzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(TransferError::GzipDecompress)?;
    Ok(out)
}
