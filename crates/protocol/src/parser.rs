//! Classifies raw chat text into [`TransferMessage`]s.
//!
//! Parsing is pure: no I/O, no state. `None` means the text is not a
//! protocol message at all, [`TransferMessage::Error`] means it carried a
//! protocol keyword but was malformed.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::constants::{
    CANCEL_PREFIX, CHUNK_PREFIX, CODE_FENCE, DEFAULT_COMPRESSION, DEFAULT_ENCODING, END_PREFIX,
    START_HEADER, keys,
};
use crate::messages::{ParseError, StartMeta, TransferMessage};

/// Parses one raw inbound text blob.
///
/// A `[FILE CHUNK ...]` header with no body is accepted as an empty
/// fragment rather than rejected, so an empty file can be sent.
pub fn parse_message(raw: &str) -> Option<TransferMessage> {
    if raw.is_empty() {
        return None;
    }

    let normalized = normalize_newlines(raw);
    let text = strip_code_fences(&normalized).trim();

    if let Some(body) = text.strip_prefix(START_HEADER) {
        return Some(parse_start(body));
    }

    if text.starts_with(CHUNK_PREFIX) {
        return Some(parse_chunk(text).unwrap_or(TransferMessage::Error {
            reason: ParseError::InvalidChunkHeader,
        }));
    }

    if text.starts_with(END_PREFIX) {
        return Some(match parse_marker_id(text, END_PREFIX) {
            Some(transfer_id) => TransferMessage::End { transfer_id },
            None => TransferMessage::Error {
                reason: ParseError::InvalidEndHeader,
            },
        });
    }

    if text.starts_with(CANCEL_PREFIX) {
        return Some(match parse_marker_id(text, CANCEL_PREFIX) {
            Some(transfer_id) => TransferMessage::Cancel { transfer_id },
            None => TransferMessage::Error {
                reason: ParseError::InvalidCancelHeader,
            },
        });
    }

    None
}

/// Removes a surrounding fenced block, tolerating a language tag on the
/// opening fence. Text that is not fully fenced is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if text.len() < 2 * CODE_FENCE.len()
        || !text.starts_with(CODE_FENCE)
        || !text.ends_with(CODE_FENCE)
    {
        return text;
    }

    // The opening fence line (and its language tag) is dropped whole.
    let Some((_, body)) = text.split_once('\n') else {
        return text;
    };
    body.strip_suffix(CODE_FENCE).unwrap_or(body).trim()
}

/// Converts CRLF and lone CR line endings to LF.
pub fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Parses the `key=value` body following `[FILE START]`.
fn parse_start(body: &str) -> TransferMessage {
    let meta = parse_key_values(body);

    let Some(transfer_id) = non_empty(&meta, keys::ID) else {
        return TransferMessage::Error {
            reason: ParseError::MissingId,
        };
    };

    let total_parts = meta
        .get(keys::TOTAL_PARTS)
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    if total_parts == 0 {
        return TransferMessage::Error {
            reason: ParseError::InvalidTotalParts,
        };
    }

    let encoding = non_empty(&meta, keys::ENCODING)
        .unwrap_or(DEFAULT_ENCODING)
        .to_ascii_lowercase();
    let compression = non_empty(&meta, keys::COMPRESSION)
        .unwrap_or(DEFAULT_COMPRESSION)
        .to_ascii_lowercase();

    TransferMessage::Start {
        transfer_id: transfer_id.to_string(),
        meta: StartMeta {
            path: non_empty(&meta, keys::PATH).map(str::to_string),
            total_parts,
            encoding,
            compression,
            sha256: non_empty(&meta, keys::SHA256).map(str::to_string),
        },
    }
}

/// One `key=value` pair per line; lines without `=` are ignored and later
/// keys override earlier ones.
fn parse_key_values(body: &str) -> HashMap<&str, &str> {
    body.lines()
        .map(str::trim)
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect()
}

fn non_empty<'a>(meta: &HashMap<&str, &'a str>, key: &str) -> Option<&'a str> {
    meta.get(key).copied().filter(|v| !v.is_empty())
}

/// Parses `[FILE CHUNK <index>/<total> id=<id>]` plus its body.
///
/// A header without a body is accepted as an empty fragment.
fn parse_chunk(text: &str) -> Option<TransferMessage> {
    let (header_line, body) = text.split_once('\n').unwrap_or((text, ""));

    let header = header_line
        .trim_end()
        .strip_prefix(CHUNK_PREFIX)?
        .strip_suffix(']')?;
    if !header.starts_with(char::is_whitespace) {
        return None;
    }

    let (index, rest) = header.trim_start().split_once('/')?;
    let index = parse_decimal(index.trim_end())?;

    let rest = rest.trim_start();
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let total = parse_decimal(&rest[..digits_end])?;

    let rest = &rest[digits_end..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let transfer_id = parse_id_field(rest.trim_start())?;

    Some(TransferMessage::Chunk {
        transfer_id,
        index,
        total,
        data_b64: body.trim().to_string(),
    })
}

/// Parses `<prefix> id=<id>]` markers that carry no body.
fn parse_marker_id(text: &str, prefix: &str) -> Option<String> {
    let inner = text.strip_prefix(prefix)?.strip_suffix(']')?;
    if !inner.starts_with(char::is_whitespace) {
        return None;
    }
    parse_id_field(inner.trim_start())
}

/// Parses `id=<id>` where the id runs to the end of the header.
fn parse_id_field(field: &str) -> Option<String> {
    let id = field.strip_prefix("id=")?;
    if id.contains([']', '\n']) {
        return None;
    }
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

fn parse_decimal(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
