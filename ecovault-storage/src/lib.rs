//! Persistence for the ledger, the vault record and the audit log.
//!
//! The vault is stored in its fixed on-ledger byte layout; the rest of the
//! ledger is bincode. Audit events are JSON lines, one record per event.

pub mod file;

#[cfg(feature = "rocksdb")]
pub mod db;

use anyhow::{anyhow, Result};
use ecovault_execution::AuditEvent;
use ecovault_types::{LedgerState, Vault};

pub use file::FileStore;

pub trait StateStore {
    fn save_state(&mut self, state: &LedgerState) -> Result<()>;

    /// Returns the default (empty) ledger when nothing has been saved.
    fn load_state(&self) -> Result<LedgerState>;

    fn save_vault_record(&mut self, vault: &Vault) -> Result<()>;

    fn load_vault_record(&self) -> Result<Option<Vault>>;

    fn append_events(&mut self, events: &[AuditEvent]) -> Result<()>;

    fn load_events(&self) -> Result<Vec<AuditEvent>>;

    /// Persists a committed ledger together with the events that produced it.
    ///
    /// The default writes each piece in turn; stores that can group the
    /// writes override it.
    fn commit(&mut self, state: &LedgerState, events: &[AuditEvent]) -> Result<()> {
        self.save_state(state)?;
        if let Some(vault) = &state.vault {
            self.save_vault_record(vault)?;
        }
        self.append_events(events)?;
        tracing::debug!(events = events.len(), "ledger persisted");
        Ok(())
    }
}

pub(crate) fn encode_state(state: &LedgerState) -> Result<Vec<u8>> {
    bincode::serialize(state).map_err(|e| anyhow!("Serialization error: {}", e))
}

pub(crate) fn decode_state(bytes: &[u8]) -> Result<LedgerState> {
    bincode::deserialize(bytes).map_err(|e| anyhow!("Deserialization error: {}", e))
}

pub(crate) fn decode_vault(bytes: &[u8]) -> Result<Vault> {
    Vault::from_bytes(bytes).map_err(|e| anyhow!("Corrupt vault record: {}", e))
}

/// Keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Option<Vec<u8>>,
    vault: Option<Vec<u8>>,
    events: Vec<AuditEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn save_state(&mut self, state: &LedgerState) -> Result<()> {
        self.state = Some(encode_state(state)?);
        Ok(())
    }

    fn load_state(&self) -> Result<LedgerState> {
        match &self.state {
            Some(bytes) => decode_state(bytes),
            None => Ok(LedgerState::default()),
        }
    }

    fn save_vault_record(&mut self, vault: &Vault) -> Result<()> {
        self.vault = Some(vault.to_bytes().to_vec());
        Ok(())
    }

    fn load_vault_record(&self) -> Result<Option<Vault>> {
        self.vault.as_deref().map(decode_vault).transpose()
    }

    fn append_events(&mut self, events: &[AuditEvent]) -> Result<()> {
        self.events.extend_from_slice(events);
        Ok(())
    }

    fn load_events(&self) -> Result<Vec<AuditEvent>> {
        Ok(self.events.clone())
    }
}
