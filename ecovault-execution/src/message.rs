//! Fixed-layout cross-chain payload.
//!
//! The destination decoder reads by fixed offsets, so the length and
//! discriminator below are protocol constants:
//!
//! | bytes     | field                        |
//! |-----------|------------------------------|
//! | `[0,2)`   | discriminator `00 01`        |
//! | `[2,34)`  | asset identifier             |
//! | `[34,66)` | recipient                    |
//! | `[66,74)` | carbon offset, u64 LE        |
//! | `[74,82)` | recyclability, u64 LE        |

use ecovault_types::EsgMetrics;
use thiserror::Error;

pub const PAYLOAD_LEN: usize = 82;
pub const PAYLOAD_DISCRIMINATOR: [u8; 2] = [0x00, 0x01];

const ASSET_ID_DOMAIN: &[u8] = b"ecovault-credential";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossChainPayload([u8; PAYLOAD_LEN]);

impl CrossChainPayload {
    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for CrossChainPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPayload {
    pub asset_id: [u8; 32],
    pub recipient: [u8; 32],
    pub esg_metrics: EsgMetrics,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload must be {PAYLOAD_LEN} bytes, got {0}")]
    Length(usize),
    #[error("unknown payload discriminator {0:02x?}")]
    Discriminator([u8; 2]),
}

/// A payload addressed for publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Informational only; not encoded.
    pub target_chain: u16,
    pub nonce: u32,
    pub payload: CrossChainPayload,
}

pub fn encode_payload(
    asset_id: &[u8; 32],
    recipient: &[u8; 32],
    esg: &EsgMetrics,
) -> CrossChainPayload {
    let mut out = [0u8; PAYLOAD_LEN];
    out[0..2].copy_from_slice(&PAYLOAD_DISCRIMINATOR);
    out[2..34].copy_from_slice(asset_id);
    out[34..66].copy_from_slice(recipient);
    out[66..74].copy_from_slice(&esg.carbon_offset.to_le_bytes());
    out[74..82].copy_from_slice(&esg.recyclability.to_le_bytes());
    CrossChainPayload(out)
}

pub fn decode_payload(bytes: &[u8]) -> Result<DecodedPayload, PayloadError> {
    if bytes.len() != PAYLOAD_LEN {
        return Err(PayloadError::Length(bytes.len()));
    }
    let discriminator = [bytes[0], bytes[1]];
    if discriminator != PAYLOAD_DISCRIMINATOR {
        return Err(PayloadError::Discriminator(discriminator));
    }

    let mut asset_id = [0u8; 32];
    asset_id.copy_from_slice(&bytes[2..34]);
    let mut recipient = [0u8; 32];
    recipient.copy_from_slice(&bytes[34..66]);
    let mut carbon = [0u8; 8];
    carbon.copy_from_slice(&bytes[66..74]);
    let mut recyclability = [0u8; 8];
    recyclability.copy_from_slice(&bytes[74..82]);

    Ok(DecodedPayload {
        asset_id,
        recipient,
        esg_metrics: EsgMetrics {
            carbon_offset: u64::from_le_bytes(carbon),
            recyclability: u64::from_le_bytes(recyclability),
        },
    })
}

/// Credential identifier for the `sequence`-th issuance under `authority`.
pub fn derive_asset_id(authority: &[u8; 32], sequence: u64) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ASSET_ID_DOMAIN);
    hasher.update(authority);
    hasher.update(&sequence.to_le_bytes());
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_offsets() {
        let esg = EsgMetrics {
            carbon_offset: 0x0102,
            recyclability: 8000,
        };
        let payload = encode_payload(&[0x11; 32], &[0x22; 32], &esg);
        let bytes = payload.as_bytes();
        assert_eq!(bytes.len(), 82);
        assert_eq!(&bytes[0..2], &[0x00, 0x01]);
        assert!(bytes[2..34].iter().all(|b| *b == 0x11));
        assert!(bytes[34..66].iter().all(|b| *b == 0x22));
        assert_eq!(&bytes[66..74], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[74..82], &8000u64.to_le_bytes());
    }

    #[test]
    fn decode_inverts_encode() {
        let asset_id = derive_asset_id(&[5; 32], 17);
        let mut recipient = [0u8; 32];
        for (i, b) in recipient.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37).wrapping_add(3);
        }
        let esg = EsgMetrics {
            carbon_offset: 123_457,
            recyclability: 7_321,
        };
        let decoded = decode_payload(encode_payload(&asset_id, &recipient, &esg).as_ref()).unwrap();
        assert_eq!(decoded.asset_id, asset_id);
        assert_eq!(decoded.recipient, recipient);
        assert_eq!(decoded.esg_metrics, esg);
    }

    #[test]
    fn decode_rejects_foreign_layouts() {
        assert_eq!(decode_payload(&[0u8; 90]), Err(PayloadError::Length(90)));
        let mut bytes = *encode_payload(&[1; 32], &[2; 32], &EsgMetrics::default()).as_bytes();
        bytes[1] = 0x02;
        assert_eq!(
            decode_payload(&bytes),
            Err(PayloadError::Discriminator([0x00, 0x02]))
        );
    }

    #[test]
    fn asset_ids_are_unique_per_sequence() {
        let authority = [9; 32];
        assert_ne!(derive_asset_id(&authority, 0), derive_asset_id(&authority, 1));
        assert_eq!(derive_asset_id(&authority, 4), derive_asset_id(&authority, 4));
        assert_ne!(derive_asset_id(&authority, 0), derive_asset_id(&[8; 32], 0));
    }
}
