//! Standard BIP-32 secp256k1 derivation from a master seed.

use bip32::{DerivationPath as Bip32Path, XPrv};
use k256::ecdsa::SigningKey;

use crate::error::Error;
use crate::types::DerivationPath;

/// Derive a secp256k1 signing key at `path` from the 64-byte master seed.
///
/// `path` segments follow the wire convention: values `>= 2^31` are already
/// hardened indices.
pub fn derive_secp256k1(seed: &[u8; 64], path: &DerivationPath) -> Result<SigningKey, Error> {
    let root = XPrv::new(seed).map_err(|_| Error::Internal("bip32 master key"))?;
    let path_str = to_bip32_path_string(path);
    let derivation: Bip32Path = path_str.parse().map_err(|_| Error::InvalidMsg)?;
    let mut node = root;
    for child in derivation.iter() {
        node = node.derive_child(child).map_err(|_| Error::Internal("bip32 derive child"))?;
    }
    Ok(node.private_key().clone())
}

fn to_bip32_path_string(path: &DerivationPath) -> String {
    let mut s = String::from("m");
    for &segment in path.as_slice() {
        if segment >= 0x8000_0000 {
            s.push_str(&format!("/{}'", segment - 0x8000_0000));
        } else {
            s.push_str(&format!("/{segment}"));
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_deterministically() {
        let seed = [0x42u8; 64];
        let path = DerivationPath::from_slice(&[0x8000_002c, 0x8000_003c, 0x8000_0000, 0, 0]);
        let k1 = derive_secp256k1(&seed, &path).unwrap();
        let k2 = derive_secp256k1(&seed, &path).unwrap();
        assert_eq!(k1.to_bytes(), k2.to_bytes());
    }
}
