//! FetchEncryptedData body: `schema(1) | wallet_uid(32) | path_depth(1) |
//! 5 x u32 BE path | params(>=4)`.

use crate::error::Error;
use crate::types::DerivationPath;

pub struct FetchEncryptedDataRequest {
    pub schema: u8,
    pub wallet_uid: [u8; 32],
    pub path: DerivationPath,
    pub params: Vec<u8>,
}

const FIXED_HEADER_LEN: usize = 1 + 32 + 1 + 20;

pub fn parse(body: &[u8]) -> Result<FetchEncryptedDataRequest, Error> {
    if body.len() < FIXED_HEADER_LEN + 4 {
        return Err(Error::InvalidMsg);
    }
    let schema = body[0];
    let mut wallet_uid = [0u8; 32];
    wallet_uid.copy_from_slice(&body[1..33]);

    let depth = body[33];
    if depth > 5 {
        return Err(Error::InvalidMsg);
    }
    let mut segments = [0u32; 5];
    for (i, chunk) in body[34..54].chunks_exact(4).enumerate() {
        segments[i] = u32::from_be_bytes(chunk.try_into().unwrap());
    }
    let path = DerivationPath::new(segments, depth);
    let params = body[54..].to_vec();

    Ok(FetchEncryptedDataRequest { schema, wallet_uid, path, params })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_body() {
        assert!(parse(&[0u8; 40]).is_err());
    }

    #[test]
    fn parses_fixed_header_and_trailing_params() {
        let mut body = vec![7u8]; // schema
        body.extend_from_slice(&[0u8; 32]); // wallet_uid
        body.push(2); // depth
        body.extend_from_slice(&(44u32 | 0x8000_0000).to_be_bytes());
        body.extend_from_slice(&(60u32 | 0x8000_0000).to_be_bytes());
        body.extend_from_slice(&[0u8; 12]);
        body.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);

        let request = parse(&body).unwrap();
        assert_eq!(request.schema, 7);
        assert_eq!(request.path.depth, 2);
        assert_eq!(request.params, vec![0xaa, 0xbb, 0xcc, 0xdd]);
    }
}
