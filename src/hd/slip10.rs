//! SLIP-0010 ed25519 derivation: master = HMAC-SHA512("ed25519 seed", seed),
//! every segment forced hardened.

use ed25519_dalek::SigningKey;
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::Error;
use crate::types::DerivationPath;

type HmacSha512 = Hmac<Sha512>;

const HARDENED_OFFSET: u32 = 0x8000_0000;

pub fn derive_ed25519(seed: &[u8; 64], path: &DerivationPath) -> Result<SigningKey, Error> {
    let mut mac = HmacSha512::new_from_slice(b"ed25519 seed").map_err(|_| Error::Internal("hmac init"))?;
    mac.update(seed);
    let i = mac.finalize().into_bytes();
    let (mut key, mut chain_code) = split_il_ir(&i);

    for &segment in path.as_slice() {
        let hardened_index = segment | HARDENED_OFFSET;
        let mut mac = HmacSha512::new_from_slice(&chain_code).map_err(|_| Error::Internal("hmac init"))?;
        mac.update(&[0u8]);
        mac.update(&key);
        mac.update(&hardened_index.to_be_bytes());
        let i = mac.finalize().into_bytes();
        let (new_key, new_chain_code) = split_il_ir(&i);
        key = new_key;
        chain_code = new_chain_code;
    }

    Ok(SigningKey::from_bytes(&key))
}

fn split_il_ir(i: &[u8]) -> ([u8; 32], [u8; 32]) {
    let mut key = [0u8; 32];
    let mut chain_code = [0u8; 32];
    key.copy_from_slice(&i[0..32]);
    chain_code.copy_from_slice(&i[32..64]);
    (key, chain_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_hardened_derivation_is_deterministic() {
        let seed = [0x5au8; 64];
        let path = DerivationPath::from_slice(&[44, 501, 0, 0]);
        let k1 = derive_ed25519(&seed, &path).unwrap();
        let k2 = derive_ed25519(&seed, &path).unwrap();
        assert_eq!(k1.to_bytes(), k2.to_bytes());
    }
}
