use anyhow::{Context, Result};
use ecovault_execution::AuditEvent;
use ecovault_types::{LedgerState, Vault};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{decode_state, decode_vault, encode_state, StateStore};

const STATE_FILE: &str = "ledger_state.bin";
const VAULT_FILE: &str = "vault.bin";
const EVENTS_FILE: &str = "events.jsonl";

/// Flat files under a data directory.
///
/// Snapshots are written to a sibling temp file and renamed into place. A
/// commit stages every file before replacing any of them; the renames and the
/// event append that follow are separate operations, not one atomic write.
/// `ledger_state.bin` is the source of truth and is replaced after `vault.bin`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `bytes` next to `name` without replacing it yet.
    fn stage(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let staging = self.dir.join(format!("{name}.tmp"));
        fs::write(&staging, bytes)
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        Ok(staging)
    }

    fn replace(&self, name: &str, staging: &Path) -> Result<()> {
        let target = self.dir.join(name);
        fs::rename(staging, &target)
            .with_context(|| format!("Failed to replace {}", target.display()))
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let staging = self.stage(name, bytes)?;
        self.replace(name, &staging)
    }

    fn append_raw(&self, buf: &[u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let path = self.dir.join(EVENTS_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(buf)
            .with_context(|| format!("Failed to append to {}", path.display()))
    }

    fn read_optional(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(bytes))
    }
}

impl StateStore for FileStore {
    fn save_state(&mut self, state: &LedgerState) -> Result<()> {
        self.write_atomic(STATE_FILE, &encode_state(state)?)
    }

    fn load_state(&self) -> Result<LedgerState> {
        match self.read_optional(STATE_FILE)? {
            Some(bytes) => decode_state(&bytes),
            None => Ok(LedgerState::default()),
        }
    }

    fn save_vault_record(&mut self, vault: &Vault) -> Result<()> {
        self.write_atomic(VAULT_FILE, &vault.to_bytes())
    }

    fn load_vault_record(&self) -> Result<Option<Vault>> {
        self.read_optional(VAULT_FILE)?
            .map(|bytes| decode_vault(&bytes))
            .transpose()
    }

    fn append_events(&mut self, events: &[AuditEvent]) -> Result<()> {
        self.append_raw(&encode_events(events)?)
    }

    /// A failed staging write leaves the previous commit untouched.
    fn commit(&mut self, state: &LedgerState, events: &[AuditEvent]) -> Result<()> {
        let mut staged = Vec::new();
        if let Some(vault) = &state.vault {
            staged.push((VAULT_FILE, self.stage(VAULT_FILE, &vault.to_bytes())?));
        }
        staged.push((STATE_FILE, self.stage(STATE_FILE, &encode_state(state)?)?));
        let log = encode_events(events)?;

        for (name, staging) in &staged {
            self.replace(name, staging)?;
        }
        self.append_raw(&log)?;
        tracing::debug!(events = events.len(), "ledger persisted");
        Ok(())
    }

    fn load_events(&self) -> Result<Vec<AuditEvent>> {
        let Some(bytes) = self.read_optional(EVENTS_FILE)? else {
            return Ok(Vec::new());
        };
        let text = String::from_utf8(bytes).context("events log is not UTF-8")?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(n, line)| {
                serde_json::from_str::<AuditEvent>(line).with_context(|| format!("Bad event on line {}", n + 1))
            })
            .collect()
    }
}

fn encode_events(events: &[AuditEvent]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for event in events {
        serde_json::to_writer(&mut buf, event)?;
        buf.push(b'\n');
    }
    Ok(buf)
}
