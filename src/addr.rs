//! Address encodings shared across the signing schemas.

use bitcoin::base58;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

/// Last 20 bytes of Keccak-256 of the uncompressed pubkey, dropping the
/// leading `0x04` prefix byte.
pub fn ethereum_address_bytes(uncompressed_pubkey: &[u8; 65]) -> [u8; 20] {
    let mut keccak = Keccak::v256();
    let mut hash = [0u8; 32];
    keccak.update(&uncompressed_pubkey[1..]);
    keccak.finalize(&mut hash);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    out
}

pub fn ethereum_address_lowercase(addr: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(addr))
}

/// EIP-55 mixed-case checksum formatting.
pub fn ethereum_address_eip55(addr: &[u8; 20]) -> String {
    let hex_lower = hex::encode(addr);
    let mut keccak = Keccak::v256();
    let mut hash = [0u8; 32];
    keccak.update(hex_lower.as_bytes());
    keccak.finalize(&mut hash);

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in hex_lower.chars().enumerate() {
        if c.is_ascii_digit() {
            out.push(c);
            continue;
        }
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub fn hash160(compressed_pubkey: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(compressed_pubkey);
    let ripemd = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripemd);
    out
}

/// P2PKH base58check address.
pub fn bitcoin_p2pkh(pubkey_hash: &[u8; 20], testnet: bool) -> String {
    let version = if testnet { 0x6f } else { 0x00 };
    let mut payload = vec![version];
    payload.extend_from_slice(pubkey_hash);
    base58::encode_check(&payload)
}

/// P2SH-P2WPKH base58check address of the witness-script hash.
pub fn bitcoin_p2sh_p2wpkh(pubkey_hash: &[u8; 20], testnet: bool) -> String {
    // witness script: OP_0 <20-byte hash>
    let mut witness_script = vec![0x00, 0x14];
    witness_script.extend_from_slice(pubkey_hash);
    let script_hash = hash160(&witness_script);
    let version = if testnet { 0xc4 } else { 0x05 };
    let mut payload = vec![version];
    payload.extend_from_slice(&script_hash);
    base58::encode_check(&payload)
}

/// P2WPKH bech32 address, hrp "bc" mainnet / "tb" testnet.
pub fn bitcoin_p2wpkh(pubkey_hash: &[u8; 20], testnet: bool) -> String {
    use bech32::{u5, ToBase32, Variant};
    let hrp = if testnet { "tb" } else { "bc" };
    let mut data = vec![u5::try_from_u8(0).unwrap()];
    data.extend(pubkey_hash.to_base32());
    bech32::encode(hrp, data, Variant::Bech32).expect("valid bech32 input")
}

/// Cosmos bech32 address over RIPEMD-160(SHA-256(compressed_pubkey)).
pub fn cosmos_address(compressed_pubkey: &[u8], hrp: &str) -> String {
    use bech32::ToBase32;
    let hash = hash160(compressed_pubkey);
    bech32::encode(hrp, hash.to_base32(), bech32::Variant::Bech32).expect("valid bech32 input")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eip55_checksum_known_vector() {
        let addr_bytes: [u8; 20] = hex::decode("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed")
            .unwrap()
            .try_into()
            .unwrap();
        let checksummed = ethereum_address_eip55(&addr_bytes);
        assert_eq!(checksummed, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn p2wpkh_has_bc1q_prefix() {
        let hash = [0u8; 20];
        let addr = bitcoin_p2wpkh(&hash, false);
        assert!(addr.starts_with("bc1q"));
    }
}
