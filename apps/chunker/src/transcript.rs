//! Splits a saved chat transcript into individual messages.

use saveme_protocol::constants::{CANCEL_PREFIX, CHUNK_PREFIX, CODE_FENCE, END_PREFIX, START_HEADER};
use saveme_protocol::normalize_newlines;

/// Splits `text` into message blocks.
///
/// A new block starts at every line beginning with a protocol header; blank
/// lines do not split. An unmatched code fence right before a header opens
/// the new block instead of closing the previous one. Blocks are trimmed and
/// empty ones dropped.
pub fn split_messages(text: &str) -> Vec<String> {
    let text = normalize_newlines(text);
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if is_header(line) {
            let opening_fence = take_opening_fence(&mut current);
            flush(&mut blocks, &mut current);
            current.extend(opening_fence);
        }
        current.push(line);
    }
    flush(&mut blocks, &mut current);

    blocks
}

fn is_header(line: &str) -> bool {
    [START_HEADER, CHUNK_PREFIX, END_PREFIX, CANCEL_PREFIX]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with(CODE_FENCE)
}

/// Removes and returns the last non-blank line if it is a fence that opens
/// rather than closes one.
fn take_opening_fence<'a>(current: &mut Vec<&'a str>) -> Option<&'a str> {
    let fences = current.iter().filter(|l| is_fence(l)).count();
    let last = current.iter().rposition(|l| !l.trim().is_empty())?;
    if fences % 2 == 1 && is_fence(current[last]) {
        let fence = current.remove(last);
        current.truncate(last);
        Some(fence)
    } else {
        None
    }
}

fn flush(blocks: &mut Vec<String>, current: &mut Vec<&str>) {
    let block = current.join("\n");
    let block = block.trim();
    if !block.is_empty() {
        blocks.push(block.to_string());
    }
    current.clear();
}
