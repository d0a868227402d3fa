//! GENERIC sign sub-schema: `encoding | hash_type | curve |
//! path | omit_pubkey | length | chunk`. Also the fallback for any
//! unrecognized schema tag.

use crate::constants::{Curve, Encoding, HashType};
use crate::error::Error;
use crate::types::{DerivationPath, GenericSignPayload};

pub fn parse(body: &[u8]) -> Result<GenericSignPayload, Error> {
    if body.len() < 4 + 1 + 1 + 21 + 1 + 2 {
        return Err(Error::InvalidMsg);
    }
    let mut offset = 0;
    let encoding = Encoding::from_u32(u32::from_be_bytes(body[0..4].try_into().unwrap()))
        .ok_or(Error::InvalidMsg)?;
    offset += 4;

    let hash_type = HashType::from_u8(body[offset]).ok_or(Error::InvalidMsg)?;
    offset += 1;
    let curve = Curve::from_u8(body[offset]).ok_or(Error::InvalidMsg)?;
    offset += 1;

    let depth = body[offset];
    let mut segments = [0u32; 5];
    for (i, chunk) in body[offset + 1..offset + 21].chunks_exact(4).enumerate() {
        segments[i] = u32::from_be_bytes(chunk.try_into().unwrap());
    }
    let path = DerivationPath::new(segments, depth.min(5));
    offset += 21;

    let omit_pubkey = body[offset] != 0;
    offset += 1;

    let declared_length = u16::from_le_bytes(body[offset..offset + 2].try_into().unwrap());
    offset += 2;

    let chunk = body[offset..].to_vec();

    Ok(GenericSignPayload { encoding, hash_type, curve, path, omit_pubkey, declared_length, chunk })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_body() {
        assert!(parse(&[0u8; 10]).is_err());
    }
}
