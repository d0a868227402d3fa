//! Signing state machine: schema dispatch, multipart session manager, and
//! the synchronous HD-derive -> hash -> sign -> compose pipeline.

pub mod eth_preimage;

use rand::RngCore;
use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

use crate::constants::{Curve, Encoding, HashType, Schema};
use crate::error::Error;
use crate::hd;
use crate::curves;
use crate::requests::sign_eth_tx::EthTxSignPayload;
use crate::responses::sign::SignResponseBody;
use crate::types::DerivationPath;

/// Tracks an in-progress multipart signing request across extra-data frames.
pub struct MultipartSession {
    pub schema: Schema,
    pub curve: Curve,
    pub encoding: Encoding,
    pub hash_type: HashType,
    pub omit_pubkey: bool,
    pub path: DerivationPath,
    pub expected_length: usize,
    pub message_chunks: Vec<Vec<u8>>,
    pub decoder_suffix_chunks: Vec<Vec<u8>>,
    pub next_code: [u8; 8],
    pub eth_meta: Option<EthTxSignPayload>,
}

impl MultipartSession {
    pub fn collected_len(&self) -> usize {
        self.message_chunks.iter().map(|c| c.len()).sum()
    }

    /// Split an incoming frame into message bytes (up to the remaining
    /// expected length) and decoder-suffix bytes.
    pub fn absorb(&mut self, frame: &[u8]) {
        let remaining = self.expected_length.saturating_sub(self.collected_len());
        let take = remaining.min(frame.len());
        self.message_chunks.push(frame[..take].to_vec());
        if take < frame.len() {
            self.decoder_suffix_chunks.push(frame[take..].to_vec());
        }
    }

    pub fn full_data(&self) -> Vec<u8> {
        let mut out: Vec<u8> = self.message_chunks.iter().flatten().copied().collect();
        out.truncate(self.expected_length);
        out
    }
}

pub fn generate_next_code() -> [u8; 8] {
    let mut code = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut code);
    code
}

fn apply_hash(hash_type: HashType, data: &[u8]) -> Vec<u8> {
    match hash_type {
        HashType::None => data.to_vec(),
        HashType::Keccak256 => {
            let mut keccak = Keccak::v256();
            let mut out = [0u8; 32];
            keccak.update(data);
            keccak.finalize(&mut out);
            out.to_vec()
        }
        HashType::Sha256 => Sha256::digest(data).to_vec(),
    }
}

fn hash_for_signing(hash_type: HashType, data: &[u8]) -> Result<[u8; 32], Error> {
    let hashed = apply_hash(hash_type, data);
    hashed.try_into().map_err(|_| Error::InvalidMsg)
}

/// The synchronous signer pipeline.
pub struct SigningEngine<'a> {
    pub seed: &'a [u8; 64],
}

impl<'a> SigningEngine<'a> {
    pub fn new(seed: &'a [u8; 64]) -> Self {
        Self { seed }
    }

    /// Schema BITCOIN, ETHEREUM_TRANSACTION/ERC20, or ETHEREUM_MESSAGE —
    /// these always sign with secp256k1 and embed a DER signature.
    pub fn sign_secp256k1(&self, path: &DerivationPath, hash_type: HashType, data: &[u8]) -> Result<(Vec<u8>, k256::ecdsa::SigningKey), Error> {
        let key = hd::bip32_derive::derive_secp256k1(self.seed, path)?;
        let hash = hash_for_signing(hash_type, data)?;
        let (r, s, _recovery_id) = curves::secp256k1::sign_canonical(&key, &hash)?;
        Ok((curves::secp256k1::der_encode(&r, &s), key))
    }

    pub fn sign_generic(
        &self,
        curve: Curve,
        hash_type: HashType,
        path: &DerivationPath,
        omit_pubkey: bool,
        data: &[u8],
    ) -> Result<SignResponseBody, Error> {
        match curve {
            Curve::Secp256k1 => {
                let (der, key) = self.sign_secp256k1(path, hash_type, data)?;
                let pubkey = if omit_pubkey {
                    None
                } else {
                    Some(curves::secp256k1::public_key_uncompressed(&key))
                };
                let prehash = if hash_type != HashType::None {
                    Some(hash_for_signing(hash_type, data)?)
                } else {
                    None
                };
                Ok(SignResponseBody::GenericSecp256k1 { pubkey, der_signature: der, prehash })
            }
            Curve::Ed25519 => {
                let key = hd::slip10::derive_ed25519(self.seed, path)?;
                let hashed = apply_hash(hash_type, data);
                let signature = curves::ed25519::sign(&key, &hashed);
                let pubkey = curves::ed25519::public_key_bytes(&key);
                Ok(SignResponseBody::GenericEd25519 { pubkey, signature })
            }
            Curve::Bls12_381 => {
                let scalar = hd::eip2333::derive_bls(self.seed, path)?;
                let sk = curves::bls::secret_key_from_scalar(&scalar)?;
                let hashed = apply_hash(hash_type, data);
                let signature = curves::bls::sign(&sk, &hashed);
                let pubkey = curves::bls::public_key_compressed(&sk);
                Ok(SignResponseBody::GenericBls { pubkey, signature })
            }
        }
    }

    pub fn sign_ethereum_like(
        &self,
        path: &DerivationPath,
        hash_type: HashType,
        preimage: &[u8],
    ) -> Result<SignResponseBody, Error> {
        let (der, key) = self.sign_secp256k1(path, hash_type, preimage)?;
        let pubkey = curves::secp256k1::public_key_uncompressed(&key);
        let signer_address = crate::addr::ethereum_address_bytes(&pubkey);
        Ok(SignResponseBody::EthereumLike { der_signature: der, signer_address })
    }

    pub fn sign_bitcoin_single_input(
        &self,
        signer_path: &DerivationPath,
        change_path: &DerivationPath,
        sighash: &[u8; 32],
    ) -> Result<SignResponseBody, Error> {
        let key = hd::bip32_derive::derive_secp256k1(self.seed, signer_path)?;
        let (r, s, _rec) = curves::secp256k1::sign_canonical(&key, sighash)?;
        let der_signature = curves::secp256k1::der_encode(&r, &s);
        let compressed_pubkey = curves::secp256k1::public_key_compressed(&key);

        let change_key = hd::bip32_derive::derive_secp256k1(self.seed, change_path)?;
        let change_pkh = crate::addr::hash160(&curves::secp256k1::public_key_compressed(&change_key));

        Ok(SignResponseBody::Bitcoin { change_pkh, der_signature, compressed_pubkey })
    }
}
