/// Header line that opens a transfer.
pub const START_HEADER: &str = "[FILE START]";

/// Prefix of a chunk marker: `[FILE CHUNK <index>/<total> id=<id>]`.
pub const CHUNK_PREFIX: &str = "[FILE CHUNK";

/// Prefix of an end marker: `[FILE END id=<id>]`.
pub const END_PREFIX: &str = "[FILE END";

/// Prefix of a cancel marker: `[FILE CANCEL id=<id>]`.
pub const CANCEL_PREFIX: &str = "[FILE CANCEL";

/// Code fence that chat clients wrap messages in.
pub const CODE_FENCE: &str = "```";

/// Encoding assumed when a START omits `encoding`.
pub const DEFAULT_ENCODING: &str = "base64";

/// Compression assumed when a START omits `compression`.
pub const DEFAULT_COMPRESSION: &str = "none";

/// Metadata keys understood in a START body.
pub mod keys {
    pub const ID: &str = "id";
    pub const PATH: &str = "path";
    pub const TOTAL_PARTS: &str = "total_parts";
    pub const ENCODING: &str = "encoding";
    pub const COMPRESSION: &str = "compression";
    pub const SHA256: &str = "sha256";
}
