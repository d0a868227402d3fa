//! ETHEREUM_TRANSACTION sign sub-schema: fixed-offset
//! transaction metadata followed by a (possibly partial) RLP data chunk.

use crate::constants::EthTxType;
use crate::error::Error;
use crate::types::DerivationPath;

/// Sentinel chain-id value signalling that an 8-byte extended chain id
/// follows the fixed header (chain ids wider than fit the base field).
const EXTENDED_CHAIN_ID_SENTINEL: u64 = u64::MAX;

#[derive(Debug, Clone)]
pub struct EthTxSignPayload {
    pub eip155: bool,
    pub chain_id: u64,
    pub path: DerivationPath,
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_limit: u64,
    pub to: [u8; 20],
    pub value: [u8; 32],
    pub prehash: bool,
    pub tx_type: EthTxType,
    pub max_priority_fee_per_gas: u64,
    pub declared_data_len: u32,
    pub chunk: Vec<u8>,
}

const FIXED_HEADER_LEN: usize = 1 + 8 + 21 + 8 + 8 + 8 + 20 + 32 + 1 + 1 + 8 + 4;

pub fn parse(body: &[u8], has_extra_payloads: bool) -> Result<EthTxSignPayload, Error> {
    if body.len() < FIXED_HEADER_LEN {
        return Err(Error::InvalidMsg);
    }
    let mut offset = 0;
    let eip155 = body[offset] != 0;
    offset += 1;
    let mut chain_id = u64::from_be_bytes(body[offset..offset + 8].try_into().unwrap());
    offset += 8;

    let depth = body[offset];
    let mut segments = [0u32; 5];
    for (i, chunk) in body[offset + 1..offset + 21].chunks_exact(4).enumerate() {
        segments[i] = u32::from_be_bytes(chunk.try_into().unwrap());
    }
    let path = DerivationPath::new(segments, depth.min(5));
    offset += 21;

    let nonce = u64::from_be_bytes(body[offset..offset + 8].try_into().unwrap());
    offset += 8;
    let gas_price = u64::from_be_bytes(body[offset..offset + 8].try_into().unwrap());
    offset += 8;
    let gas_limit = u64::from_be_bytes(body[offset..offset + 8].try_into().unwrap());
    offset += 8;

    let mut to = [0u8; 20];
    to.copy_from_slice(&body[offset..offset + 20]);
    offset += 20;

    let mut value = [0u8; 32];
    value.copy_from_slice(&body[offset..offset + 32]);
    offset += 32;

    let prehash = body[offset] != 0;
    offset += 1;
    let tx_type = EthTxType::from_u8(body[offset]);
    offset += 1;

    let max_priority_fee_per_gas = u64::from_be_bytes(body[offset..offset + 8].try_into().unwrap());
    offset += 8;

    let declared_data_len = u32::from_be_bytes(body[offset..offset + 4].try_into().unwrap());
    offset += 4;

    if chain_id == EXTENDED_CHAIN_ID_SENTINEL {
        let ext = body.get(offset..offset + 8).ok_or(Error::InvalidMsg)?;
        chain_id = u64::from_be_bytes(ext.try_into().unwrap());
        offset += 8;
    }

    let chunk = body[offset..].to_vec();

    // Prehash rule: declared length exceeds the chunk and no more frames are
    // coming.
    let prehash = prehash || (declared_data_len as usize > chunk.len() && !has_extra_payloads);

    Ok(EthTxSignPayload {
        eip155,
        chain_id,
        path,
        nonce,
        gas_price,
        gas_limit,
        to,
        value,
        prehash,
        tx_type,
        max_priority_fee_per_gas,
        declared_data_len,
        chunk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_body_is_invalid() {
        assert!(parse(&[0u8; 4], false).is_err());
    }

    #[test]
    fn minimal_legacy_tx_parses() {
        let mut body = vec![0u8; FIXED_HEADER_LEN];
        // gas_price = 1 at its offset (1 + 8 + 21 + 8 = 38)
        body[38 + 7] = 1;
        let parsed = parse(&body, false).unwrap();
        assert_eq!(parsed.gas_price, 1);
        assert_eq!(parsed.tx_type, EthTxType::Legacy);
    }
}
