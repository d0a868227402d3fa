//! GetWallets response: two 71-byte wallet descriptors.

use crate::types::WalletDescriptor;

pub fn serialize(internal: &WalletDescriptor, external: &WalletDescriptor) -> Vec<u8> {
    let mut out = Vec::with_capacity(142);
    out.extend_from_slice(&internal.encode());
    out.extend_from_slice(&external.encode());
    out
}
