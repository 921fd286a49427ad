use anyhow::{anyhow, Context, Result};
use ecovault_crypto::{generate_keypair, keypair_from_hex, SigningKey};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Serialize, Deserialize)]
pub struct Wallet {
    pub secret_key: String,
    pub public_key: String,
}

impl Wallet {
    pub fn generate() -> Self {
        let kp = generate_keypair();
        Self {
            secret_key: hex::encode(kp.to_bytes()),
            public_key: hex::encode(kp.verifying_key().as_bytes()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read wallet {}", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn to_keypair(&self) -> Result<SigningKey> {
        let kp = keypair_from_hex(&self.secret_key)?;
        if hex::encode(kp.verifying_key().as_bytes()) != self.public_key.trim_start_matches("0x") {
            return Err(anyhow!("wallet public key does not match its secret key"));
        }
        Ok(kp)
    }
}

pub fn parse_key(hex_key: &str) -> Result<[u8; 32]> {
    let mut out = [0u8; 32];
    hex::decode_to_slice(hex_key.trim_start_matches("0x"), &mut out)
        .with_context(|| format!("invalid 32-byte hex key {hex_key}"))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_wallet_restores_its_keypair() {
        let wallet = Wallet::generate();
        let kp = wallet.to_keypair().unwrap();
        assert_eq!(hex::encode(kp.verifying_key().as_bytes()), wallet.public_key);
    }

    #[test]
    fn mismatched_public_key_is_refused() {
        let mut wallet = Wallet::generate();
        wallet.public_key = "00".repeat(32);
        assert!(wallet.to_keypair().is_err());
    }

    #[test]
    fn keys_parse_with_or_without_prefix() {
        let hex_key = "ab".repeat(32);
        assert_eq!(parse_key(&hex_key).unwrap(), [0xAB; 32]);
        assert_eq!(parse_key(&format!("0x{hex_key}")).unwrap(), [0xAB; 32]);
        assert!(parse_key("abcd").is_err());
    }
}
