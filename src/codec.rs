//! Frame codec & session crypto.
//!
//! AES-256-CBC with a zero IV is cryptographically weak but is preserved
//! verbatim for wire compatibility with the counterparty device.

use std::collections::HashMap;

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::FromEncodedPoint;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{EncodedPoint, PublicKey};
use sha2::{Digest, Sha256};

use crate::constants::{RequestType, FRAME_SIZE};
use crate::error::Error;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const ZERO_IV: [u8; 16] = [0u8; 16];

/// Live session state: one device ephemeral keypair, the peer's public key,
/// and the derived shared secret.
pub struct Session {
    ephemeral_secret: EphemeralSecret,
    ephemeral_public: [u8; 65],
    pub client_pub: Option<[u8; 65]>,
    pub shared_secret: Option<[u8; 32]>,
}

impl Session {
    pub fn new() -> Self {
        let ephemeral_secret = EphemeralSecret::random(&mut rand::thread_rng());
        let ephemeral_public = encode_public(&ephemeral_secret);
        Self { ephemeral_secret, ephemeral_public, client_pub: None, shared_secret: None }
    }

    pub fn ephemeral_public(&self) -> [u8; 65] {
        self.ephemeral_public
    }

    /// Accept a client public key, deriving `shared_secret` as the
    /// big-endian X-coordinate of P-256 ECDH.
    pub fn connect(&mut self, client_pub: [u8; 65]) -> Result<(), Error> {
        let point = EncodedPoint::from_bytes(client_pub).map_err(|_| Error::InvalidMsg)?;
        let public_key = PublicKey::from_encoded_point(&point);
        let public_key = Option::<PublicKey>::from(public_key).ok_or(Error::InvalidMsg)?;
        let shared = self.ephemeral_secret.diffie_hellman(&public_key);
        let x_coord = shared.raw_secret_bytes();
        let mut secret = [0u8; 32];
        secret.copy_from_slice(x_coord.as_slice());
        self.client_pub = Some(client_pub);
        self.shared_secret = Some(secret);
        Ok(())
    }

    /// Replace the device ephemeral with a fresh one, as happens once per
    /// request/response pair when the client rotates its own ephemeral.
    pub fn rotate_ephemeral(&mut self) {
        self.ephemeral_secret = EphemeralSecret::random(&mut rand::thread_rng());
        self.ephemeral_public = encode_public(&self.ephemeral_secret);
    }
}

fn encode_public(secret: &EphemeralSecret) -> [u8; 65] {
    let point = secret.public_key().to_encoded_point(false);
    let mut out = [0u8; 65];
    out.copy_from_slice(point.as_bytes());
    out
}

/// `ephemeral_id = SHA-256(shared_secret)[0..4]` as a big-endian `u32`
///.
pub fn ephemeral_id(shared_secret: &[u8; 32]) -> u32 {
    let digest = Sha256::digest(shared_secret);
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Cache of `ephemeral_id -> shared_secret`, populated on every successful
/// decrypt.
#[derive(Default)]
pub struct SecretCache {
    secrets: HashMap<u32, [u8; 32]>,
}

impl SecretCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u32) -> Option<[u8; 32]> {
        self.secrets.get(&id).copied()
    }

    pub fn insert(&mut self, secret: [u8; 32]) {
        self.secrets.insert(ephemeral_id(&secret), secret);
    }

    pub fn clear(&mut self) {
        self.secrets.clear();
    }
}

fn aes_cbc_decrypt(key: &[u8; 32], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
    let mut buf = ciphertext.to_vec();
    let decryptor = Aes256CbcDec::new(key.into(), &ZERO_IV.into());
    decryptor
        .decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
        .map_err(|_| Error::InvalidMsg)?;
    Ok(buf)
}

fn aes_cbc_encrypt(key: &[u8; 32], plaintext: &[u8]) -> Vec<u8> {
    let encryptor = Aes256CbcEnc::new(key.into(), &ZERO_IV.into());
    let mut buf = plaintext.to_vec();
    // Caller guarantees block-aligned length (FRAME_SIZE is a multiple of 16).
    encryptor
        .encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf, plaintext.len())
        .expect("block-aligned plaintext")
        .to_vec()
}

fn crc32_iso_hdlc(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Try each candidate secret in order (cached-by-hint, then current), return
/// the decrypted `(req_data, secret_used)` once the embedded CRC matches.
pub fn inbound_decrypt(
    req_type: RequestType,
    ciphertext: &[u8],
    ephemeral_id_hint: Option<u32>,
    cache: &SecretCache,
    current_secret: Option<[u8; 32]>,
) -> Result<(Vec<u8>, [u8; 32]), Error> {
    let mut candidates = Vec::new();
    if let Some(hint) = ephemeral_id_hint {
        if let Some(secret) = cache.get(hint) {
            candidates.push(secret);
        }
    }
    if let Some(secret) = current_secret {
        candidates.push(secret);
    }

    let n = req_type.max_body_len();
    for secret in candidates {
        let cleartext = match aes_cbc_decrypt(&secret, ciphertext) {
            Ok(c) => c,
            Err(_) => continue,
        };
        if cleartext.len() < 1 + n + 4 {
            continue;
        }
        let crc_region = &cleartext[0..1 + n];
        let embedded = u32::from_le_bytes(cleartext[1 + n..1 + n + 4].try_into().unwrap());
        if crc32_iso_hdlc(crc_region) != embedded {
            continue;
        }
        let req_data = cleartext[1..1 + n].to_vec();
        return Ok((req_data, secret));
    }
    Err(Error::PairFailed)
}

/// Build the full 1728-byte encrypted outbound frame.
pub fn outbound_encrypt(
    new_ephemeral_pub: &[u8; 65],
    payload: &[u8],
    fixed_len: usize,
    shared_secret: &[u8; 32],
) -> Vec<u8> {
    let mut padded_payload = payload.to_vec();
    padded_payload.resize(fixed_len, 0);

    let mut crc_region = Vec::with_capacity(65 + fixed_len);
    crc_region.extend_from_slice(new_ephemeral_pub);
    crc_region.extend_from_slice(&padded_payload);
    let crc = crc32_iso_hdlc(&crc_region);

    let mut frame = Vec::with_capacity(FRAME_SIZE);
    frame.extend_from_slice(&crc_region);
    frame.extend_from_slice(&crc.to_be_bytes());
    frame.resize(FRAME_SIZE, 0);

    aes_cbc_encrypt(shared_secret, &frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_id_is_first_four_bytes_of_sha256() {
        let secret = [0x42u8; 32];
        let digest = Sha256::digest(secret);
        let expected = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        assert_eq!(ephemeral_id(&secret), expected);
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let secret = [0x07u8; 32];
        let req_type = RequestType::GetWallets;
        let n = req_type.max_body_len();
        let mut cleartext = vec![req_type as u8];
        cleartext.extend(std::iter::repeat(0u8).take(n));
        let crc = crc32_iso_hdlc(&cleartext);
        cleartext.extend_from_slice(&crc.to_le_bytes());
        cleartext.resize(FRAME_SIZE, 0);

        let ciphertext = aes_cbc_encrypt(&secret, &cleartext);
        let plain_again = aes_cbc_decrypt(&secret, &ciphertext).unwrap();
        assert_eq!(plain_again, cleartext);
    }

    #[test]
    fn outbound_frame_is_exactly_frame_size() {
        let secret = [0x09u8; 32];
        let pubkey = [0x04u8; 65];
        let frame = outbound_encrypt(&pubkey, &[1, 2, 3], 64, &secret);
        assert_eq!(frame.len(), FRAME_SIZE);
    }
}
