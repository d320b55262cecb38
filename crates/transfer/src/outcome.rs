use std::path::PathBuf;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::TransferError;

/// Result of feeding one protocol message to the [`Assembler`](crate::Assembler).
///
/// Serializes to the flat ack record callers turn into chat replies:
///
/// ```json
/// {"ok":true,"stage":"chunk","id":"t1","index":1,"receivedCount":1,"total":2}
/// {"ok":false,"error":"missing chunks","missing":[2,3]}
/// ```
#[derive(Debug)]
pub enum TransferOutcome {
    Started {
        id: String,
        total: u32,
    },
    ChunkAccepted {
        id: String,
        index: u32,
        received_count: usize,
        total: u32,
    },
    Completed {
        id: String,
        path: PathBuf,
        bytes: usize,
        sha256: String,
    },
    Cancelled {
        id: String,
        existed: bool,
    },
    Failed(TransferError),
}

impl TransferOutcome {
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Stage name of a successful outcome.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::Started { .. } => Some("start"),
            Self::ChunkAccepted { .. } => Some("chunk"),
            Self::Completed { .. } => Some("end"),
            Self::Cancelled { .. } => Some("cancel"),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&TransferError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransferError> for TransferOutcome {
    fn from(err: TransferError) -> Self {
        Self::Failed(err)
    }
}

impl Serialize for TransferOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("ok", &self.is_ok())?;
        if let Some(stage) = self.stage() {
            map.serialize_entry("stage", stage)?;
        }

        match self {
            Self::Started { id, total } => {
                map.serialize_entry("id", id)?;
                map.serialize_entry("total", total)?;
            }
            Self::ChunkAccepted {
                id,
                index,
                received_count,
                total,
            } => {
                map.serialize_entry("id", id)?;
                map.serialize_entry("index", index)?;
                map.serialize_entry("receivedCount", received_count)?;
                map.serialize_entry("total", total)?;
            }
            Self::Completed {
                id,
                path,
                bytes,
                sha256,
            } => {
                map.serialize_entry("id", id)?;
                map.serialize_entry("path", &path.to_string_lossy())?;
                map.serialize_entry("bytes", bytes)?;
                map.serialize_entry("sha256", sha256)?;
            }
            Self::Cancelled { id, existed } => {
                map.serialize_entry("id", id)?;
                map.serialize_entry("existed", existed)?;
            }
            Self::Failed(err) => {
                map.serialize_entry("error", &err.to_string())?;
                match err {
                    TransferError::MissingChunks { missing } => {
                        map.serialize_entry("missing", missing)?;
                    }
                    TransferError::Sha256Mismatch { expected, actual } => {
                        map.serialize_entry("expected", expected)?;
                        map.serialize_entry("actual", actual)?;
                    }
                    _ => {}
                }
            }
        }

        map.end()
    }
}
