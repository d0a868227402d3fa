//! EIP-2333 BLS12-381 tree-based key derivation.
//!
//! `IKM -> SK` uses the HKDF construction from the EIP; child derivation
//! hashes the parent key and index through HKDF again. Both steps use
//! `hmac`+`sha2` since no pack crate implements EIP-2333 directly.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::Error;
use crate::types::DerivationPath;

type HmacSha256 = Hmac<Sha256>;

// Order of the BLS12-381 scalar field, big-endian.
const R: [u8; 32] = [
    0x73, 0xed, 0xa7, 0x53, 0x29, 0x9d, 0x7d, 0x48, 0x33, 0x39, 0xd8, 0x08, 0x09, 0xa1, 0xd8,
    0x05, 0x53, 0xbd, 0xa4, 0x02, 0xff, 0xfe, 0x5b, 0xfe, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00,
    0x00, 0x01,
];

fn hkdf_mod_r(ikm: &[u8], salt: &[u8]) -> [u8; 32] {
    let mut input = ikm.to_vec();
    input.push(0x00);

    let prk = hmac_once(salt, &input);
    let mut okm = [0u8; 48];
    let info_len = [0u8, 48u8];
    let mut t_block: Vec<u8> = Vec::new();
    let mut generated = 0usize;
    let mut counter = 1u8;
    while generated < 48 {
        let mut mac = HmacSha256::new_from_slice(&prk).expect("hmac key");
        mac.update(&t_block);
        mac.update(&info_len);
        mac.update(&[counter]);
        t_block = mac.finalize().into_bytes().to_vec();
        let take = t_block.len().min(48 - generated);
        okm[generated..generated + take].copy_from_slice(&t_block[..take]);
        generated += take;
        counter += 1;
    }
    mod_r(&okm)
}

fn hmac_once(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac key");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Reduce a 48-byte big-endian integer mod `r`, returning a 32-byte scalar.
fn mod_r(bytes48: &[u8; 48]) -> [u8; 32] {
    let mut value = [0u8; 48];
    value.copy_from_slice(bytes48);
    let modulus = {
        let mut m = [0u8; 48];
        m[16..].copy_from_slice(&R);
        m
    };
    while ge(&value, &modulus) {
        value = sub(&value, &modulus);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&value[16..]);
    out
}

fn ge(a: &[u8; 48], b: &[u8; 48]) -> bool {
    a >= b
}

fn sub(a: &[u8; 48], b: &[u8; 48]) -> [u8; 48] {
    let mut out = [0u8; 48];
    let mut borrow = 0i16;
    for i in (0..48).rev() {
        let mut diff = a[i] as i16 - b[i] as i16 - borrow;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[i] = diff as u8;
    }
    out
}

fn derive_child_sk(parent_sk: &[u8; 32], index: u32) -> [u8; 32] {
    let mut compressed_lamport = Vec::with_capacity(32 + 4);
    compressed_lamport.extend_from_slice(parent_sk);
    compressed_lamport.extend_from_slice(&index.to_be_bytes());
    hkdf_mod_r(&compressed_lamport, b"BLS-SIG-KEYGEN-SALT-")
}

/// Derive the BLS12-381 secret key scalar at `path` from the 64-byte seed.
pub fn derive_bls(seed: &[u8; 64], path: &DerivationPath) -> Result<[u8; 32], Error> {
    let mut sk = hkdf_mod_r(seed, b"BLS-SIG-KEYGEN-SALT-");
    for &segment in path.as_slice() {
        sk = derive_child_sk(&sk, segment);
    }
    Ok(sk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic_and_nonzero() {
        let seed = [0x11u8; 64];
        let path = DerivationPath::from_slice(&[12381, 3600, 0, 0]);
        let sk1 = derive_bls(&seed, &path).unwrap();
        let sk2 = derive_bls(&seed, &path).unwrap();
        assert_eq!(sk1, sk2);
        assert_ne!(sk1, [0u8; 32]);
    }
}
