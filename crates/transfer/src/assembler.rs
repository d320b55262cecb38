//! Public entry point: one call per inbound chat message.

use std::path::Path;
use std::time::{Duration, Instant};

use saveme_protocol::{ParseError, StartMeta, TransferMessage, parse_message};

use crate::config::{AssemblerConfig, RestartPolicy};
use crate::outcome::TransferOutcome;
use crate::pipeline::{DecodedPayload, decode_payload};
use crate::sink::SinkWriter;
use crate::store::{SessionStore, Sessions};
use crate::types::{Compression, Encoding, SessionKey, TransferSession};
use crate::TransferError;

/// Reassembles chunked transfers arriving as text messages.
///
/// State machine per `(channel, id)`:
/// `NONE -> STARTED -> RECEIVING -> {COMPLETE | CANCELLED | EXPIRED}`.
/// Expiry is lazy: every call first sweeps sessions older than the TTL.
///
/// Session bookkeeping and payload verification for one message happen
/// inside a single store critical section, so concurrent callers never
/// interleave check-then-act steps on a session. The file write of a
/// completed transfer runs after its session is removed and the lock is
/// released.
pub struct Assembler {
    store: SessionStore,
    sink: SinkWriter,
    ttl: Duration,
    restart_policy: RestartPolicy,
    max_total_parts: u32,
}

/// What the locked part of a call produced.
enum Handled {
    Done(TransferOutcome),
    /// Verified payload of a finished transfer, still to be written.
    Write {
        transfer_id: String,
        destination: String,
        payload: DecodedPayload,
    },
}

impl Assembler {
    /// Builds an assembler with an empty session store.
    ///
    /// Fails if the root directory cannot be created or resolved.
    pub fn new(config: &AssemblerConfig) -> Result<Self, TransferError> {
        Self::with_store(config, SessionStore::new())
    }

    /// Builds an assembler around an existing store.
    pub fn with_store(config: &AssemblerConfig, store: SessionStore) -> Result<Self, TransferError> {
        let sink = SinkWriter::new(&config.root_dir)?;
        tracing::info!(
            root = %sink.root().display(),
            ttl_secs = config.session_ttl_secs,
            restart_policy = ?config.restart_policy,
            max_total_parts = config.max_total_parts,
            "transfer assembler ready"
        );
        Ok(Self {
            store,
            sink,
            ttl: config.session_ttl(),
            restart_policy: config.restart_policy,
            max_total_parts: config.max_total_parts,
        })
    }

    /// Canonical sandbox root.
    pub fn root(&self) -> &Path {
        self.sink.root()
    }

    /// Number of sessions currently held (expired ones included until the
    /// next sweep).
    pub fn active_sessions(&self) -> usize {
        self.store.len()
    }

    /// Handles one raw inbound message from `channel`.
    ///
    /// Returns `None` when the text is not a protocol message.
    pub fn on_message(&self, raw: &str, channel: &str) -> Option<TransferOutcome> {
        self.on_message_at(raw, channel, Instant::now())
    }

    /// Like [`on_message`](Self::on_message) with an explicit clock reading.
    pub fn on_message_at(&self, raw: &str, channel: &str, now: Instant) -> Option<TransferOutcome> {
        let handled = self.store.with_sessions(|sessions| {
            for key in sessions.sweep_expired(now, self.ttl) {
                tracing::info!(
                    channel = %key.channel,
                    id = %key.transfer_id,
                    "transfer session expired"
                );
            }

            let msg = parse_message(raw)?;
            tracing::debug!(channel, kind = msg.kind(), id = ?msg.transfer_id(), "protocol message");

            Some(match msg {
                TransferMessage::Error { reason } => Err(TransferError::from(reason)),
                TransferMessage::Start { transfer_id, meta } => self
                    .handle_start(sessions, channel, transfer_id, meta, now)
                    .map(Handled::Done),
                TransferMessage::Chunk {
                    transfer_id,
                    index,
                    total,
                    data_b64,
                } => self
                    .handle_chunk(sessions, channel, transfer_id, index, total, data_b64)
                    .map(Handled::Done),
                TransferMessage::End { transfer_id } => {
                    self.handle_end(sessions, channel, transfer_id)
                }
                TransferMessage::Cancel { transfer_id } => Ok(Handled::Done(
                    self.handle_cancel(sessions, channel, transfer_id),
                )),
            })
        })?;

        let result = handled.and_then(|handled| match handled {
            Handled::Done(outcome) => Ok(outcome),
            Handled::Write {
                transfer_id,
                destination,
                payload,
            } => self.write_completed(channel, transfer_id, &destination, payload),
        });

        Some(result.unwrap_or_else(|err| {
            tracing::warn!(channel, error = %err, "transfer message rejected");
            TransferOutcome::Failed(err)
        }))
    }

    fn handle_start(
        &self,
        sessions: &mut Sessions,
        channel: &str,
        transfer_id: String,
        meta: StartMeta,
        now: Instant,
    ) -> Result<TransferOutcome, TransferError> {
        if meta.total_parts > self.max_total_parts {
            tracing::warn!(
                channel,
                id = %transfer_id,
                total = meta.total_parts,
                max = self.max_total_parts,
                "transfer announces too many parts"
            );
            return Err(ParseError::InvalidTotalParts.into());
        }
        let path = meta.path.ok_or(TransferError::MissingPath)?;
        let encoding: Encoding = meta.encoding.parse()?;
        let compression: Compression = meta.compression.parse()?;

        let key = SessionKey::new(channel, transfer_id.as_str());
        if self.restart_policy == RestartPolicy::Reject && sessions.contains(&key) {
            return Err(TransferError::SessionExists);
        }

        let total = meta.total_parts;
        let session = TransferSession::new(
            transfer_id.clone(),
            path,
            total,
            encoding,
            compression,
            meta.sha256,
            now,
        );
        if let Some(previous) = sessions.put(key, session) {
            tracing::warn!(
                channel,
                id = %transfer_id,
                discarded_chunks = previous.received_count(),
                "transfer restarted, previous session replaced"
            );
        }

        tracing::info!(channel, id = %transfer_id, total, %compression, "transfer started");
        Ok(TransferOutcome::Started {
            id: transfer_id,
            total,
        })
    }

    fn handle_chunk(
        &self,
        sessions: &mut Sessions,
        channel: &str,
        transfer_id: String,
        index: u32,
        total: u32,
        data_b64: String,
    ) -> Result<TransferOutcome, TransferError> {
        let key = SessionKey::new(channel, transfer_id.as_str());
        let session = sessions
            .get_mut(&key)
            .ok_or(TransferError::SessionNotFound)?;
        let received_count = session.insert_chunk(index, total, data_b64)?;

        tracing::debug!(channel, id = %transfer_id, index, received_count, total, "chunk stored");
        Ok(TransferOutcome::ChunkAccepted {
            id: transfer_id,
            index,
            received_count,
            total: session.total_parts,
        })
    }

    fn handle_end(
        &self,
        sessions: &mut Sessions,
        channel: &str,
        transfer_id: String,
    ) -> Result<Handled, TransferError> {
        let key = SessionKey::new(channel, transfer_id.as_str());
        let session = sessions.get(&key).ok_or(TransferError::SessionNotFound)?;

        // Incomplete or undecodable transfers stay open for late chunks or
        // an explicit cancel.
        if !session.is_complete() {
            return Err(TransferError::MissingChunks {
                missing: session.missing_indices(),
            });
        }
        let payload = decode_payload(session)?;

        // From here on the transfer is terminal whether or not the write
        // succeeds.
        let destination = session.destination_path.clone();
        sessions.remove(&key);
        Ok(Handled::Write {
            transfer_id,
            destination,
            payload,
        })
    }

    fn write_completed(
        &self,
        channel: &str,
        transfer_id: String,
        destination: &str,
        payload: DecodedPayload,
    ) -> Result<TransferOutcome, TransferError> {
        let path = self.sink.write(destination, &payload.bytes)?;

        tracing::info!(
            channel,
            id = %transfer_id,
            path = %path.display(),
            bytes = payload.bytes.len(),
            "transfer completed"
        );
        Ok(TransferOutcome::Completed {
            id: transfer_id,
            path,
            bytes: payload.bytes.len(),
            sha256: payload.sha256,
        })
    }

    fn handle_cancel(
        &self,
        sessions: &mut Sessions,
        channel: &str,
        transfer_id: String,
    ) -> TransferOutcome {
        let key = SessionKey::new(channel, transfer_id.as_str());
        let existed = sessions.remove(&key).is_some();
        tracing::info!(channel, id = %transfer_id, existed, "transfer cancelled");
        TransferOutcome::Cancelled {
            id: transfer_id,
            existed,
        }
    }
}
