//! Boundary to the external cross-chain messaging layer.

use thiserror::Error;

use crate::message::OutboundMessage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("payload rejected: {0}")]
    Rejected(String),
    #[error("bridge unavailable: {0}")]
    Unavailable(String),
}

/// Accepts opaque payloads tagged with a nonce and returns a sequence id.
/// Delivery, attestation and relay are the bridge's concern.
pub trait MessageBridge {
    fn publish(&mut self, payload: &[u8], nonce: u32) -> Result<u64, BridgeError>;

    /// Publishes a committed batch's messages in order.
    ///
    /// Implementations that can stage writes should override this so a
    /// failure leaves nothing published.
    fn publish_all(&mut self, messages: &[OutboundMessage]) -> Result<Vec<u64>, BridgeError> {
        messages
            .iter()
            .map(|msg| self.publish(msg.payload.as_ref(), msg.nonce))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub sequence: u64,
    pub nonce: u32,
    pub payload: Vec<u8>,
}

/// In-process bridge that records what was published.
#[derive(Debug, Default)]
pub struct MemoryBridge {
    pub published: Vec<PublishedMessage>,
    next_sequence: u64,
    capacity: Option<usize>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects any publish that would take the log past `capacity` messages.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    fn has_room_for(&self, count: usize) -> bool {
        self.capacity
            .map_or(true, |cap| self.published.len() + count <= cap)
    }
}

impl MessageBridge for MemoryBridge {
    fn publish(&mut self, payload: &[u8], nonce: u32) -> Result<u64, BridgeError> {
        if !self.has_room_for(1) {
            return Err(BridgeError::Rejected("outbox full".into()));
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.published.push(PublishedMessage {
            sequence,
            nonce,
            payload: payload.to_vec(),
        });
        Ok(sequence)
    }

    fn publish_all(&mut self, messages: &[OutboundMessage]) -> Result<Vec<u64>, BridgeError> {
        if !self.has_room_for(messages.len()) {
            return Err(BridgeError::Rejected(format!(
                "outbox cannot take {} more messages",
                messages.len()
            )));
        }
        messages
            .iter()
            .map(|msg| self.publish(msg.payload.as_ref(), msg.nonce))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::encode_payload;
    use ecovault_types::EsgMetrics;

    fn message(nonce: u32) -> OutboundMessage {
        OutboundMessage {
            target_chain: 2,
            nonce,
            payload: encode_payload(&[1; 32], &[2; 32], &EsgMetrics::default()),
        }
    }

    #[test]
    fn sequences_increase() {
        let mut bridge = MemoryBridge::new();
        let seqs = bridge.publish_all(&[message(0), message(1)]).unwrap();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(bridge.publish(&[0xFF], 9).unwrap(), 2);
        assert_eq!(bridge.published[1].nonce, 1);
    }

    #[test]
    fn capacity_limit_rejects_whole_batch() {
        let mut bridge = MemoryBridge::with_capacity_limit(1);
        let err = bridge.publish_all(&[message(0), message(1)]).unwrap_err();
        assert!(matches!(err, BridgeError::Rejected(_)));
        assert!(bridge.published.is_empty());
    }
}
