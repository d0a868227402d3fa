//! Shared domain types: wallets, paths, sessions, signatures.

use crate::constants::{Curve, Encoding, HashType, MAX_BIP32_PATH_DEPTH, Schema};

/// A BIP32-style derivation path: always 5 `u32` big-endian segments on the
/// wire, with `depth` marking how many of them are meaningful
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivationPath {
    pub segments: [u32; MAX_BIP32_PATH_DEPTH],
    pub depth: u8,
}

impl DerivationPath {
    pub fn new(segments: [u32; MAX_BIP32_PATH_DEPTH], depth: u8) -> Self {
        Self { segments, depth }
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.segments[..self.depth as usize]
    }

    pub fn from_slice(path: &[u32]) -> Self {
        let mut segments = [0u32; MAX_BIP32_PATH_DEPTH];
        let depth = path.len().min(MAX_BIP32_PATH_DEPTH);
        segments[..depth].copy_from_slice(&path[..depth]);
        Self { segments, depth: depth as u8 }
    }
}

/// Wallet descriptor: `(uid, capabilities, name)`.
#[derive(Debug, Clone)]
pub struct WalletDescriptor {
    pub uid: [u8; 32],
    pub capabilities: u32,
    pub name: [u8; 35],
    pub is_external: bool,
}

impl WalletDescriptor {
    pub fn new(uid: [u8; 32], capabilities: u32, name: &str, is_external: bool) -> Self {
        let mut name_buf = [0u8; 35];
        let bytes = name.as_bytes();
        let n = bytes.len().min(35);
        name_buf[..n].copy_from_slice(&bytes[..n]);
        Self { uid, capabilities, name: name_buf, is_external }
    }

    /// 71-byte `uid(32) | capabilities(u32 BE) | name(35)` encoding.
    pub fn encode(&self) -> [u8; 71] {
        let mut out = [0u8; 71];
        out[0..32].copy_from_slice(&self.uid);
        out[32..36].copy_from_slice(&self.capabilities.to_be_bytes());
        out[36..71].copy_from_slice(&self.name);
        out
    }
}

/// secp256k1 ECDSA signature in the `(v, r, s)` representation used by the
/// Ethereum sign paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcdsaSignature {
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

/// A parsed `Sign` envelope shared by every schema.
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub has_extra_payloads: bool,
    pub schema: Schema,
    pub body: SignBody,
}

#[derive(Debug, Clone)]
pub enum SignBody {
    Bitcoin(crate::requests::sign_bitcoin::BitcoinSignPayload),
    EthereumTransaction(crate::requests::sign_eth_tx::EthTxSignPayload),
    EthereumMessage(crate::requests::sign_eth_msg::EthMessageSignPayload),
    ExtraData(ExtraDataFrame),
    Generic(GenericSignPayload),
}

#[derive(Debug, Clone)]
pub struct ExtraDataFrame {
    pub next_code: [u8; 8],
    pub frame: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct GenericSignPayload {
    pub encoding: Encoding,
    pub hash_type: HashType,
    pub curve: Curve,
    pub path: DerivationPath,
    pub omit_pubkey: bool,
    pub declared_length: u16,
    pub chunk: Vec<u8>,
}
