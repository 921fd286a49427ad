use anyhow::{anyhow, Result};
use ecovault_execution::AuditEvent;
use ecovault_types::{LedgerState, Vault};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};

use crate::{decode_state, decode_vault, encode_state, StateStore};

const STATE_KEY: &[u8] = b"ledger_state";
const VAULT_KEY: &[u8] = b"vault_record";
const EVENT_COUNT_KEY: &[u8] = b"events_total";
const EVENT_PREFIX: &str = "event_";

pub struct Storage {
    pub db: DB,
}

impl Storage {
    pub fn new(path: &str) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path).map_err(|e| anyhow!("Failed to open DB: {}", e))?;
        Ok(Self { db })
    }

    fn event_count(&self) -> Result<u64> {
        match self.db.get(EVENT_COUNT_KEY)? {
            Some(raw) => {
                let bytes: [u8; 8] = raw
                    .as_slice()
                    .try_into()
                    .map_err(|_| anyhow!("Corrupt event counter"))?;
                Ok(u64::from_le_bytes(bytes))
            }
            None => Ok(0),
        }
    }

    fn event_key(n: u64) -> String {
        // zero padded so lexical order is insertion order
        format!("{EVENT_PREFIX}{n:020}")
    }

    fn stage_events(&self, batch: &mut WriteBatch, events: &[AuditEvent]) -> Result<()> {
        let mut next = self.event_count()?;
        for event in events {
            batch.put(Self::event_key(next).as_bytes(), serde_json::to_vec(event)?);
            next += 1;
        }
        batch.put(EVENT_COUNT_KEY, next.to_le_bytes());
        Ok(())
    }
}

impl StateStore for Storage {
    fn save_state(&mut self, state: &LedgerState) -> Result<()> {
        self.db
            .put(STATE_KEY, encode_state(state)?)
            .map_err(|e| anyhow!("DB write error: {}", e))
    }

    fn load_state(&self) -> Result<LedgerState> {
        match self.db.get(STATE_KEY) {
            Ok(Some(value)) => decode_state(&value),
            Ok(None) => Ok(LedgerState::default()),
            Err(e) => Err(anyhow!("DB read error: {}", e)),
        }
    }

    fn save_vault_record(&mut self, vault: &Vault) -> Result<()> {
        self.db
            .put(VAULT_KEY, vault.to_bytes())
            .map_err(|e| anyhow!("DB write error: {}", e))
    }

    fn load_vault_record(&self) -> Result<Option<Vault>> {
        self.db
            .get(VAULT_KEY)?
            .map(|bytes| decode_vault(&bytes))
            .transpose()
    }

    fn append_events(&mut self, events: &[AuditEvent]) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_events(&mut batch, events)?;
        self.db
            .write(batch)
            .map_err(|e| anyhow!("DB event-log error: {}", e))
    }

    fn load_events(&self) -> Result<Vec<AuditEvent>> {
        let mode = IteratorMode::From(EVENT_PREFIX.as_bytes(), Direction::Forward);
        let mut events = Vec::new();
        for item in self.db.iterator(mode) {
            let (key, value) = item?;
            if !key.starts_with(EVENT_PREFIX.as_bytes()) {
                break;
            }
            events.push(serde_json::from_slice(&value)?);
        }
        Ok(events)
    }

    /// State, vault record and events land in one RocksDB write batch.
    fn commit(&mut self, state: &LedgerState, events: &[AuditEvent]) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.put(STATE_KEY, encode_state(state)?);
        if let Some(vault) = &state.vault {
            batch.put(VAULT_KEY, vault.to_bytes());
        }
        self.stage_events(&mut batch, events)?;
        self.db
            .write(batch)
            .map_err(|e| anyhow!("DB commit error: {}", e))
    }
}
