//! Renders outbound protocol messages in the exact inbound formats.

use crate::constants::{CANCEL_PREFIX, CHUNK_PREFIX, END_PREFIX, START_HEADER, keys};
use crate::messages::StartMeta;

/// Renders a `[FILE START]` message.
///
/// A missing path is rendered as an empty value so the receiver reports
/// it rather than silently defaulting.
pub fn format_start(transfer_id: &str, meta: &StartMeta) -> String {
    let mut out = format!("{START_HEADER}\n");
    push_field(&mut out, keys::ID, transfer_id);
    push_field(&mut out, keys::PATH, meta.path.as_deref().unwrap_or(""));
    push_field(&mut out, keys::TOTAL_PARTS, &meta.total_parts.to_string());
    push_field(&mut out, keys::ENCODING, &meta.encoding);
    push_field(&mut out, keys::COMPRESSION, &meta.compression);
    if let Some(sha256) = &meta.sha256 {
        push_field(&mut out, keys::SHA256, sha256);
    }
    out.truncate(out.trim_end().len());
    out
}

fn push_field(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push('=');
    out.push_str(value);
    out.push('\n');
}

/// Renders a `[FILE CHUNK i/N id=...]` message with its base64 body.
pub fn format_chunk(transfer_id: &str, index: u32, total: u32, data_b64: &str) -> String {
    format!("{CHUNK_PREFIX} {index}/{total} id={transfer_id}]\n{data_b64}")
}

/// Renders a `[FILE END id=...]` marker.
pub fn format_end(transfer_id: &str) -> String {
    format!("{END_PREFIX} id={transfer_id}]")
}

/// Renders a `[FILE CANCEL id=...]` marker.
pub fn format_cancel(transfer_id: &str) -> String {
    format!("{CANCEL_PREFIX} id={transfer_id}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::TransferMessage;
    use crate::parser::parse_message;

    fn sample_meta() -> StartMeta {
        StartMeta {
            path: Some("docs/report.pdf".into()),
            total_parts: 3,
            encoding: "base64".into(),
            compression: "gzip".into(),
            sha256: Some("ab".repeat(32)),
        }
    }

    #[test]
    fn start_layout() {
        let text = format_start("t1", &sample_meta());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[FILE START]");
        assert_eq!(lines[1], "id=t1");
        assert_eq!(lines[2], "path=docs/report.pdf");
        assert_eq!(lines[3], "total_parts=3");
        assert_eq!(lines[4], "encoding=base64");
        assert_eq!(lines[5], "compression=gzip");
        assert!(lines[6].starts_with("sha256="));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn start_omits_absent_sha256() {
        let meta = StartMeta {
            sha256: None,
            ..sample_meta()
        };
        let text = format_start("t1", &meta);
        assert!(!text.contains("sha256"));
        assert!(text.ends_with("compression=gzip"));
    }

    #[test]
    fn formatted_messages_parse_back() {
        let meta = sample_meta();
        assert_eq!(
            parse_message(&format_start("t1", &meta)),
            Some(TransferMessage::Start {
                transfer_id: "t1".into(),
                meta,
            })
        );
        assert_eq!(
            format_chunk("t1", 2, 3, "QUJD"),
            "[FILE CHUNK 2/3 id=t1]\nQUJD"
        );
        assert_eq!(format_end("t1"), "[FILE END id=t1]");
        assert_eq!(format_cancel("t1"), "[FILE CANCEL id=t1]");
        assert_eq!(
            parse_message(&format_cancel("t1")),
            Some(TransferMessage::Cancel {
                transfer_id: "t1".into()
            })
        );
    }
}
