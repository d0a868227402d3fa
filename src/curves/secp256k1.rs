//! secp256k1 ECDSA signing, DER encoding, and BIP32 extended-key formatting.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::error::Error;

/// Sign a 32-byte prehash, returning `(r, s, recovery_id)` with `s` already
/// normalized to the lower half of the curve order (canonical-S).
pub fn sign_canonical(key: &SigningKey, hash: &[u8; 32]) -> Result<([u8; 32], [u8; 32], u8), Error> {
    let (signature, _rec): (Signature, RecoveryId) = key
        .sign_prehash_recoverable(hash)
        .map_err(|_| Error::Internal("ecdsa sign"))?;
    let signature = signature.normalize_s().unwrap_or(signature);

    let expected_pubkey = VerifyingKey::from(key);
    let recovery_id = (0u8..4)
        .find(|&id| {
            let rec = match RecoveryId::from_byte(id) {
                Some(r) => r,
                None => return false,
            };
            VerifyingKey::recover_from_prehash(hash, &signature, rec)
                .map(|pk| pk == expected_pubkey)
                .unwrap_or(false)
        })
        .ok_or(Error::Internal("recovery id not found"))?;

    let r_bytes = signature.r().to_bytes();
    let s_bytes = signature.s().to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&r_bytes);
    s.copy_from_slice(&s_bytes);
    Ok((r, s, recovery_id))
}

/// DER-encode `(r, s)` with leading-zero trimming and a high-bit guard byte
/// per component.
pub fn der_encode(r: &[u8; 32], s: &[u8; 32]) -> Vec<u8> {
    let r_enc = der_encode_integer(r);
    let s_enc = der_encode_integer(s);
    let mut body = Vec::with_capacity(r_enc.len() + s_enc.len());
    body.extend_from_slice(&r_enc);
    body.extend_from_slice(&s_enc);
    let mut out = vec![0x30, body.len() as u8];
    out.extend_from_slice(&body);
    out
}

fn der_encode_integer(component: &[u8; 32]) -> Vec<u8> {
    let mut trimmed: &[u8] = component;
    while trimmed.len() > 1 && trimmed[0] == 0 {
        trimmed = &trimmed[1..];
    }
    let mut value = Vec::with_capacity(trimmed.len() + 1);
    if trimmed[0] & 0x80 != 0 {
        value.push(0x00);
    }
    value.extend_from_slice(trimmed);
    let mut out = vec![0x02, value.len() as u8];
    out.extend_from_slice(&value);
    out
}

/// Pad a DER signature out to the fixed 74-byte wire slot with trailing zeros.
pub fn pad_der_74(der: &[u8]) -> [u8; 74] {
    let mut out = [0u8; 74];
    let n = der.len().min(74);
    out[..n].copy_from_slice(&der[..n]);
    out
}

pub fn public_key_uncompressed(key: &SigningKey) -> [u8; 65] {
    let point = VerifyingKey::from(key).to_encoded_point(false);
    let mut out = [0u8; 65];
    out.copy_from_slice(point.as_bytes());
    out
}

pub fn public_key_compressed(key: &SigningKey) -> [u8; 33] {
    let point = VerifyingKey::from(key).to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(point.as_bytes());
    out
}

/// BIP-44 purpose selecting the extended-key version prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bip44Purpose {
    Legacy44,
    P2shP2wpkh49,
    P2wpkh84,
}

/// Extended-key version bytes for `(purpose, testnet)`.
pub fn xpub_version_bytes(purpose: Bip44Purpose, testnet: bool) -> [u8; 4] {
    match (purpose, testnet) {
        (Bip44Purpose::Legacy44, false) => [0x04, 0x88, 0xb2, 0x1e], // xpub
        (Bip44Purpose::Legacy44, true) => [0x04, 0x35, 0x87, 0xcf],  // tpub (used as upub base)
        (Bip44Purpose::P2shP2wpkh49, false) => [0x04, 0x9d, 0x7c, 0xb2], // ypub
        (Bip44Purpose::P2shP2wpkh49, true) => [0x04, 0x4a, 0x52, 0x62],  // upub
        (Bip44Purpose::P2wpkh84, false) => [0x04, 0xb2, 0x47, 0x46], // zpub
        (Bip44Purpose::P2wpkh84, true) => [0x04, 0x5f, 0x1c, 0xf6],  // vpub
    }
}
