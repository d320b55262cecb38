/// Why a text that looked like a protocol message could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("missing id in START")]
    MissingId,

    #[error("invalid total_parts")]
    InvalidTotalParts,

    #[error("invalid CHUNK header")]
    InvalidChunkHeader,

    #[error("invalid END header")]
    InvalidEndHeader,

    #[error("invalid CANCEL header")]
    InvalidCancelHeader,
}

/// Metadata announced by a `[FILE START]` message.
///
/// `encoding` and `compression` are lowercased but not validated here;
/// deciding what is supported belongs to the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartMeta {
    pub path: Option<String>,
    pub total_parts: u32,
    pub encoding: String,
    pub compression: String,
    pub sha256: Option<String>,
}

/// One classified protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferMessage {
    Start {
        transfer_id: String,
        meta: StartMeta,
    },
    Chunk {
        transfer_id: String,
        /// 1-based position of this fragment.
        index: u32,
        total: u32,
        data_b64: String,
    },
    End {
        transfer_id: String,
    },
    Cancel {
        transfer_id: String,
    },
    /// Local parse failure, not an error reported by the peer.
    Error {
        reason: ParseError,
    },
}

impl TransferMessage {
    /// Transfer id the message refers to (`None` for parse errors).
    pub fn transfer_id(&self) -> Option<&str> {
        match self {
            Self::Start { transfer_id, .. }
            | Self::Chunk { transfer_id, .. }
            | Self::End { transfer_id }
            | Self::Cancel { transfer_id } => Some(transfer_id),
            Self::Error { .. } => None,
        }
    }

    /// Short lowercase name of the message kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Chunk { .. } => "chunk",
            Self::End { .. } => "end",
            Self::Cancel { .. } => "cancel",
            Self::Error { .. } => "error",
        }
    }
}
