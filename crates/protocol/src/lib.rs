//! Chunked file-transfer protocol: message types, parser and formatters.
//!
//! Files travel as a sequence of tagged text messages so they fit through
//! chat channels that only carry text and cap message size:
//!
//! ```text
//! [FILE START]
//! id=<opaque-string>
//! path=<relative/path/to/file>
//! total_parts=<positive integer>
//! encoding=base64
//! compression=none|gzip
//! sha256=<64-hex-chars>
//!
//! [FILE CHUNK <index>/<total> id=<id>]
//! <base64 fragment>
//!
//! [FILE END id=<id>]
//!
//! [FILE CANCEL id=<id>]
//! ```

pub mod constants;
pub mod format;
pub mod messages;
pub mod parser;

// Re-export primary types for convenience.
pub use format::{format_cancel, format_chunk, format_end, format_start};
pub use messages::{ParseError, StartMeta, TransferMessage};
pub use parser::{normalize_newlines, parse_message, strip_code_fences};
