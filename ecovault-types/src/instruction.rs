use serde::{Deserialize, Serialize};

use crate::deposit::Deposit;

/// Native vault instructions. Each is one atomic state transition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum VaultInstruction {
    /// Creates the vault with the signer as authority.
    InitializeVault { bump: u8 },
    /// Records one admin approval toward the mint quorum.
    ApproveMint,
    /// Scores and rewards an ordered batch. Deposit `i` mints into
    /// `destinations[3i..3i + 3]` (ply, carb, ewaste).
    ProcessBatch {
        deposits: Vec<Deposit>,
        destinations: Vec<[u8; 32]>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    Ply,
    Carb,
    Ewaste,
}

impl TokenKind {
    /// Slot order inside a deposit's destination triple.
    pub const ORDER: [TokenKind; 3] = [TokenKind::Ply, TokenKind::Carb, TokenKind::Ewaste];
}
