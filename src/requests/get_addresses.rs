//! GetAddresses body: 54 bytes.

use crate::error::Error;
use crate::types::DerivationPath;

pub struct GetAddressesRequest {
    pub wallet_uid: [u8; 32],
    pub path_depth: u8,
    pub iter_idx: u8,
    pub path: DerivationPath,
    pub count: u8,
    pub flag: u8,
}

pub fn parse(body: &[u8]) -> Result<GetAddressesRequest, Error> {
    if body.len() != 54 {
        return Err(Error::InvalidMsg);
    }
    let mut wallet_uid = [0u8; 32];
    wallet_uid.copy_from_slice(&body[0..32]);

    let packed_depth = body[32];
    let path_depth = packed_depth >> 4;
    let iter_idx = packed_depth & 0x0f;

    let mut segments = [0u32; 5];
    for (i, chunk) in body[33..53].chunks_exact(4).enumerate() {
        segments[i] = u32::from_be_bytes(chunk.try_into().unwrap());
    }
    let path = DerivationPath::new(segments, path_depth.min(5));

    let packed_count = body[53];
    let count = packed_count >> 4;
    let flag = packed_count & 0x0f;

    Ok(GetAddressesRequest { wallet_uid, path_depth, iter_idx, path, count, flag })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_length_is_invalid() {
        assert!(parse(&[0u8; 53]).is_err());
    }

    #[test]
    fn packs_fields_correctly() {
        let mut body = [0u8; 54];
        body[32] = 0x43; // depth=4, iter=3
        body[53] = 0x21; // count=2, flag=1
        let req = parse(&body).unwrap();
        assert_eq!(req.path_depth, 4);
        assert_eq!(req.iter_idx, 3);
        assert_eq!(req.count, 2);
        assert_eq!(req.flag, 1);
    }
}
