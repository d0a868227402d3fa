//! GetAddresses response.

use crate::constants::AddressFlag;

pub enum AddressSlot {
    Ascii(String),
    Secp256k1Pubkey([u8; 65]),
    Ed25519Pubkey([u8; 32]),
    Bls12_381Pubkey([u8; 48]),
}

pub fn serialize(flag: AddressFlag, slots: &[AddressSlot]) -> Vec<u8> {
    match flag {
        AddressFlag::Address | AddressFlag::Secp256k1Xpub => {
            let mut out = Vec::with_capacity(slots.len() * 129);
            for slot in slots {
                let mut field = [0u8; 129];
                if let AddressSlot::Ascii(s) = slot {
                    let bytes = s.as_bytes();
                    let n = bytes.len().min(128);
                    field[..n].copy_from_slice(&bytes[..n]);
                }
                out.extend_from_slice(&field);
            }
            out
        }
        _ => {
            let mut out = vec![flag as u8];
            for slot in slots {
                let mut field = [0u8; 65];
                match slot {
                    AddressSlot::Secp256k1Pubkey(pk) => field.copy_from_slice(pk),
                    AddressSlot::Ed25519Pubkey(pk) => field[..32].copy_from_slice(pk),
                    AddressSlot::Bls12_381Pubkey(pk) => field[..48].copy_from_slice(pk),
                    AddressSlot::Ascii(_) => {}
                }
                out.extend_from_slice(&field);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_slots_are_null_terminated_within_129_bytes() {
        let slots = vec![AddressSlot::Ascii("bc1qtest".into())];
        let out = serialize(AddressFlag::Address, &slots);
        assert_eq!(out.len(), 129);
        assert!(out.starts_with(b"bc1qtest"));
        assert_eq!(out[8], 0);
    }
}
