//! File-backed bridge: published payloads are appended as JSON lines for the
//! external relayer to pick up once the ledger that produced them is stored.

use anyhow::{Context, Result};
use ecovault_execution::bridge::{BridgeError, MessageBridge};
use ecovault_execution::message::OutboundMessage;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutboxRecord {
    pub sequence: u64,
    pub nonce: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_chain: Option<u16>,
    /// Hex-encoded payload bytes.
    pub payload: String,
}

/// Published records are held in memory until [`OutboxBridge::flush`], so the
/// caller can persist the ledger first and only then release the messages.
pub struct OutboxBridge {
    path: PathBuf,
    next_sequence: u64,
    pending: Vec<OutboxRecord>,
}

impl OutboxBridge {
    /// Sequences continue after the last record already in the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let next_sequence = match fs::read_to_string(&path) {
            Ok(content) => match content.lines().filter(|l| !l.trim().is_empty()).last() {
                Some(line) => {
                    let last: OutboxRecord = serde_json::from_str(line)
                        .with_context(|| format!("Corrupt outbox {}", path.display()))?;
                    last.sequence + 1
                }
                None => 0,
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read outbox {}", path.display()))
            }
        };
        Ok(Self {
            path,
            next_sequence,
            pending: Vec::new(),
        })
    }

    /// Appends every staged record with a single write and returns how many
    /// were released.
    pub fn flush(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let mut buf = Vec::new();
        for record in &self.pending {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open outbox {}", self.path.display()))?;
        file.write_all(&buf)
            .with_context(|| format!("Failed to append to outbox {}", self.path.display()))?;
        Ok(std::mem::take(&mut self.pending).len())
    }

    fn stage(&mut self, records: Vec<OutboxRecord>) -> Vec<u64> {
        let sequences = records.iter().map(|r| r.sequence).collect();
        self.next_sequence += records.len() as u64;
        self.pending.extend(records);
        sequences
    }
}

impl MessageBridge for OutboxBridge {
    fn publish(&mut self, payload: &[u8], nonce: u32) -> Result<u64, BridgeError> {
        let sequence = self.next_sequence;
        self.stage(vec![OutboxRecord {
            sequence,
            nonce,
            target_chain: None,
            payload: hex::encode(payload),
        }]);
        Ok(sequence)
    }

    fn publish_all(&mut self, messages: &[OutboundMessage]) -> Result<Vec<u64>, BridgeError> {
        let first = self.next_sequence;
        let records = messages
            .iter()
            .zip(first..)
            .map(|(msg, sequence)| OutboxRecord {
                sequence,
                nonce: msg.nonce,
                target_chain: Some(msg.target_chain),
                payload: hex::encode(msg.payload.as_bytes()),
            })
            .collect();
        Ok(self.stage(records))
    }
}
