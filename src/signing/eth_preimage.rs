//! Ethereum RLP preimage reconstruction for multipart transactions.

use crate::constants::EthTxType;
use crate::requests::sign_eth_tx::EthTxSignPayload;
use crate::rlp;

/// Build the RLP signing preimage for `meta` (sans signature fields) with
/// `data` as the transaction's data payload. `auth_list_rlp` is a distinct
/// RLP buffer consulted only for EIP-7702 (`type_byte == 4`), where the
/// wire carries the authorization list as its own item rather than folding
/// it into `data`.
pub fn build_preimage(meta: &EthTxSignPayload, data: &[u8], auth_list_rlp: &[u8]) -> Vec<u8> {
    match meta.tx_type {
        EthTxType::Legacy => legacy_preimage(meta, data),
        EthTxType::Eip2930 => typed_preimage(1, meta, data, &[]),
        EthTxType::Eip1559 => typed_preimage(2, meta, data, &[]),
        EthTxType::Eip7702 => typed_preimage(4, meta, data, &parse_authorization_list(auth_list_rlp)),
    }
}

fn legacy_preimage(meta: &EthTxSignPayload, data: &[u8]) -> Vec<u8> {
    let mut items = vec![
        rlp::encode_u64(meta.nonce),
        rlp::encode_u64(meta.gas_price),
        rlp::encode_u64(meta.gas_limit),
        rlp::encode_bytes(&meta.to),
        rlp::encode_bytes(trim_leading_zeros(&meta.value)),
        rlp::encode_bytes(data),
    ];
    if meta.eip155 {
        items.push(rlp::encode_u64(meta.chain_id));
        items.push(rlp::encode_bytes(&[]));
        items.push(rlp::encode_bytes(&[]));
    }
    rlp::encode_list(&items)
}

fn typed_preimage(type_byte: u8, meta: &EthTxSignPayload, data: &[u8], extra_list: &[Vec<u8>]) -> Vec<u8> {
    let mut items = vec![
        rlp::encode_u64(meta.chain_id),
        rlp::encode_u64(meta.nonce),
    ];
    if matches!(meta.tx_type, EthTxType::Eip1559 | EthTxType::Eip7702) {
        items.push(rlp::encode_u64(meta.max_priority_fee_per_gas));
        items.push(rlp::encode_u64(meta.gas_price));
    } else {
        items.push(rlp::encode_u64(meta.gas_price));
    }
    items.push(rlp::encode_u64(meta.gas_limit));
    items.push(rlp::encode_bytes(&meta.to));
    items.push(rlp::encode_bytes(trim_leading_zeros(&meta.value)));
    items.push(rlp::encode_bytes(data));
    items.push(rlp::encode_list(&[])); // access list, unused by this emulator
    if !extra_list.is_empty() || matches!(meta.tx_type, EthTxType::Eip7702) {
        items.push(rlp::encode_list(extra_list));
    }

    let mut out = vec![type_byte];
    out.extend_from_slice(&rlp::encode_list(&items));
    out
}

fn trim_leading_zeros(bytes: &[u8; 32]) -> &[u8] {
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(31);
    &bytes[first_nonzero..]
}

/// Best-effort EIP-7702 authorization-list parsing: accept any
/// RLP-decodable list and skip malformed entries.
fn parse_authorization_list(data: &[u8]) -> Vec<Vec<u8>> {
    let decoded = match rlp::decode_exact(data) {
        Ok(item) => item,
        Err(_) => return Vec::new(),
    };
    let list = match decoded.as_list() {
        Ok(list) => list,
        Err(_) => return Vec::new(),
    };
    let mut out = Vec::new();
    for entry in list {
        if entry.as_list().is_ok() {
            let mut buf = Vec::new();
            if let Ok(items) = entry.as_list() {
                for item in items {
                    if let Ok(s) = item.as_string() {
                        buf.push(rlp::encode_bytes(s));
                    }
                }
            }
            out.push(rlp::encode_list(&buf));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DerivationPath;

    fn sample_meta() -> EthTxSignPayload {
        EthTxSignPayload {
            eip155: true,
            chain_id: 1,
            path: DerivationPath::from_slice(&[0x8000_002c, 0x8000_003c, 0x8000_0000, 0, 0]),
            nonce: 0,
            gas_price: 1,
            gas_limit: 21000,
            to: [0x11u8; 20],
            value: [0u8; 32],
            prehash: false,
            tx_type: EthTxType::Legacy,
            max_priority_fee_per_gas: 0,
            declared_data_len: 0,
            chunk: Vec::new(),
        }
    }

    #[test]
    fn legacy_preimage_is_an_rlp_list() {
        let meta = sample_meta();
        let preimage = legacy_preimage(&meta, &[]);
        let decoded = rlp::decode_exact(&preimage).unwrap();
        assert_eq!(decoded.as_list().unwrap().len(), 9);
    }
}
