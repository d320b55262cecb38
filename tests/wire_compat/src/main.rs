fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use saveme_protocol::{
        TransferMessage, format_cancel, format_chunk, format_end, format_start, parse_message,
    };
    use saveme_transfer::{Assembler, AssemblerConfig};
    use serde::Deserialize;
    use serde_json::Value;

    /// A recorded conversation with the ack the reference bot sent for each message.
    #[derive(Debug, Deserialize)]
    struct Transcript {
        description: String,
        steps: Vec<Step>,
        /// Files expected below the root afterwards, relative path -> UTF-8 content.
        #[serde(default)]
        files: serde_json::Map<String, Value>,
    }

    #[derive(Debug, Deserialize)]
    struct Step {
        channel: String,
        message: String,
        ack: Value,
    }

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture(name: &str) -> Transcript {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Rewrites an absolute write path as `<root>/relative` with `/` separators.
    fn normalize_path(value: &mut Value, root: &Path) {
        let Some(path) = value.get("path").and_then(Value::as_str) else {
            return;
        };
        let Ok(relative) = Path::new(path).strip_prefix(root) else {
            return;
        };
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        value["path"] = Value::String(format!("<root>/{}", parts.join("/")));
    }

    /// Every key the reference ack carries must match. The only extra key
    /// allowed on our side is the digest reported on completion.
    fn assert_ack_matches(expected: &Value, actual: &Value, context: &str) {
        if expected.is_null() {
            assert!(actual.is_null(), "{context}: expected no ack, got {actual}");
            return;
        }
        let (Some(expected_map), Some(actual_map)) = (expected.as_object(), actual.as_object())
        else {
            panic!("{context}: expected {expected}, got {actual}");
        };
        for (key, want) in expected_map {
            assert_eq!(
                actual_map.get(key),
                Some(want),
                "{context}: field {key:?} differs\n  reference: {expected}\n  ours:      {actual}"
            );
        }
        for key in actual_map.keys() {
            assert!(
                expected_map.contains_key(key) || (key == "sha256" && actual["stage"] == "end"),
                "{context}: unexpected field {key:?} in {actual}"
            );
        }
    }

    fn replay(name: &str) {
        let transcript = load_fixture(name);
        let tmp = tempfile::tempdir().unwrap();
        let assembler = Assembler::new(&AssemblerConfig::new(tmp.path().join("root"))).unwrap();
        let root = assembler.root().to_path_buf();

        for (i, step) in transcript.steps.iter().enumerate() {
            let outcome = assembler.on_message(&step.message, &step.channel);
            let mut actual = serde_json::to_value(&outcome).unwrap();
            normalize_path(&mut actual, &root);
            let context = format!("{name} step {i} ({})", transcript.description);
            assert_ack_matches(&step.ack, &actual, &context);
        }

        for (relative, content) in &transcript.files {
            let written = fs::read_to_string(root.join(relative))
                .unwrap_or_else(|e| panic!("{name}: {relative} not written: {e}"));
            assert_eq!(Some(written.as_str()), content.as_str(), "{name}: {relative}");
        }
    }

    #[test]
    fn fixture_hello_world() {
        replay("hello_world.json");
    }

    #[test]
    fn fixture_gzip_out_of_order() {
        replay("gzip_out_of_order.json");
    }

    #[test]
    fn fixture_failures() {
        replay("failures.json");
    }

    #[test]
    fn fixture_channel_isolation() {
        replay("channel_isolation.json");
    }

    #[test]
    fn completion_digest_matches_written_bytes() {
        let transcript = load_fixture("hello_world.json");
        let tmp = tempfile::tempdir().unwrap();
        let assembler = Assembler::new(&AssemblerConfig::new(tmp.path())).unwrap();
        let last = transcript
            .steps
            .iter()
            .map(|s| assembler.on_message(&s.message, &s.channel))
            .last()
            .flatten()
            .unwrap();
        let value = serde_json::to_value(&last).unwrap();
        assert_eq!(
            value["sha256"],
            "315f5bdb76d078c43b8ac0064e4a0164612b1fce77c869345bfc94c75894edd3"
        );
    }

    /// Canonical messages re-render byte for byte through the formatters.
    #[test]
    fn canonical_messages_reformat_identically() {
        let transcript = load_fixture("hello_world.json");
        for step in &transcript.steps {
            let rendered = match parse_message(&step.message).unwrap() {
                TransferMessage::Start { transfer_id, meta } => format_start(&transfer_id, &meta),
                TransferMessage::Chunk {
                    transfer_id,
                    index,
                    total,
                    data_b64,
                } => format_chunk(&transfer_id, index, total, &data_b64),
                TransferMessage::End { transfer_id } => format_end(&transfer_id),
                TransferMessage::Cancel { transfer_id } => format_cancel(&transfer_id),
                TransferMessage::Error { reason } => panic!("unexpected parse error: {reason}"),
            };
            assert_eq!(rendered, step.message);
        }
    }
}
