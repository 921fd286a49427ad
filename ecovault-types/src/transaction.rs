use serde::{Deserialize, Serialize};

use crate::instruction::VaultInstruction;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    pub signer: [u8; 32],
    pub nonce: u64,
    pub instruction: VaultInstruction,
    pub signature: Vec<u8>,
}

impl Transaction {
    pub fn signing_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct SigningTx<'a> {
            signer: &'a [u8; 32],
            nonce: u64,
            instruction: &'a VaultInstruction,
        }

        let signing = SigningTx {
            signer: &self.signer,
            nonce: self.nonce,
            instruction: &self.instruction,
        };

        bincode::serialize(&signing).expect("tx signing serialization")
    }

    pub fn id(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.signing_bytes());
        hasher.update(&self.signature);
        *hasher.finalize().as_bytes()
    }
}
