pub use ed25519_dalek::{SigningKey, VerifyingKey};
use anyhow::{anyhow, bail, Result};
use ed25519_dalek::{Signature, Signer, Verifier};
use rand::rngs::OsRng;

pub fn generate_keypair() -> SigningKey {
    let mut csprng = OsRng;
    SigningKey::generate(&mut csprng)
}

pub fn sign(key: &SigningKey, message: &[u8]) -> Vec<u8> {
    let sig: Signature = key.sign(message);
    sig.to_bytes().to_vec()
}

pub fn verify_signature(pubkey_bytes: &[u8; 32], message: &[u8], signature_bytes: &[u8]) -> Result<()> {
    let pubkey = VerifyingKey::from_bytes(pubkey_bytes).map_err(|_| anyhow!("Invalid public key"))?;

    let signature_bytes: &[u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| anyhow!("Invalid signature length: {}", signature_bytes.len()))?;
    let signature = Signature::from_bytes(signature_bytes);

    if pubkey.verify(message, &signature).is_err() {
        bail!("Signature verification failed for {}", hex::encode(pubkey_bytes));
    }
    Ok(())
}

/// Restores a signing key from its hex-encoded 32-byte secret.
pub fn keypair_from_hex(secret_hex: &str) -> Result<SigningKey> {
    let secret = hex::decode(secret_hex.trim_start_matches("0x"))?;
    let secret: [u8; 32] = secret
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("secret key must be 32 bytes, got {}", secret.len()))?;
    Ok(SigningKey::from_bytes(&secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify() {
        let kp = generate_keypair();
        let pubkey = kp.verifying_key().to_bytes();
        let sig = sign(&kp, b"approve");
        assert!(verify_signature(&pubkey, b"approve", &sig).is_ok());
        assert!(verify_signature(&pubkey, b"approve twice", &sig).is_err());
    }

    #[test]
    fn short_signatures_are_rejected() {
        let kp = generate_keypair();
        let pubkey = kp.verifying_key().to_bytes();
        let err = verify_signature(&pubkey, b"m", &[0u8; 10]).unwrap_err();
        assert!(err.to_string().contains("length"));
    }

    #[test]
    fn keypair_round_trips_through_hex() {
        let kp = generate_keypair();
        let restored = keypair_from_hex(&hex::encode(kp.to_bytes())).unwrap();
        assert_eq!(restored.verifying_key(), kp.verifying_key());
        assert!(keypair_from_hex("abcd").is_err());
    }
}
