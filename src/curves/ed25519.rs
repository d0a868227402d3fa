//! Raw ed25519 signing and Solana base58 address formatting.

use ed25519_dalek::{Signer, SigningKey};

pub fn sign(key: &SigningKey, message: &[u8]) -> [u8; 64] {
    key.sign(message).to_bytes()
}

pub fn public_key_bytes(key: &SigningKey) -> [u8; 32] {
    key.verifying_key().to_bytes()
}

/// Base58 of the raw 32-byte ed25519 public key.
pub fn solana_address(pubkey: &[u8; 32]) -> String {
    bs58::encode(pubkey).into_string()
}
