pub mod signatures;

pub use signatures::{generate_keypair, keypair_from_hex, sign, verify_signature, SigningKey, VerifyingKey};
