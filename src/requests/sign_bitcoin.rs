//! BITCOIN sign sub-schema: UTXO payload with a change path and one or more
//! signer inputs. This lays out a self-consistent encoding that the response
//! path (single-input signature) agrees with.

use crate::error::Error;
use crate::types::DerivationPath;

#[derive(Debug, Clone)]
pub struct BitcoinInput {
    pub signer_path: DerivationPath,
    pub prev_txid: [u8; 32],
    pub prev_vout: u32,
    pub value_sats: u64,
}

#[derive(Debug, Clone)]
pub struct BitcoinSignPayload {
    pub change_path: DerivationPath,
    pub inputs: Vec<BitcoinInput>,
}

fn parse_path(body: &[u8]) -> Result<(DerivationPath, usize), Error> {
    if body.len() < 21 {
        return Err(Error::InvalidMsg);
    }
    let depth = body[0];
    let mut segments = [0u32; 5];
    for (i, chunk) in body[1..21].chunks_exact(4).enumerate() {
        segments[i] = u32::from_be_bytes(chunk.try_into().unwrap());
    }
    Ok((DerivationPath::new(segments, depth.min(5)), 21))
}

pub fn parse(body: &[u8]) -> Result<BitcoinSignPayload, Error> {
    if body.is_empty() {
        return Err(Error::InvalidMsg);
    }
    let (change_path, mut offset) = parse_path(body)?;
    let input_count = *body.get(offset).ok_or(Error::InvalidMsg)? as usize;
    offset += 1;

    let mut inputs = Vec::with_capacity(input_count);
    for _ in 0..input_count {
        let (signer_path, path_len) = parse_path(body.get(offset..).ok_or(Error::InvalidMsg)?)?;
        offset += path_len;
        let rest = body.get(offset..offset + 44).ok_or(Error::InvalidMsg)?;
        let mut prev_txid = [0u8; 32];
        prev_txid.copy_from_slice(&rest[0..32]);
        let prev_vout = u32::from_be_bytes(rest[32..36].try_into().unwrap());
        let value_sats = u64::from_be_bytes(rest[36..44].try_into().unwrap());
        offset += 44;
        inputs.push(BitcoinInput { signer_path, prev_txid, prev_vout, value_sats });
    }

    Ok(BitcoinSignPayload { change_path, inputs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_body() {
        assert!(parse(&[]).is_err());
    }
}
