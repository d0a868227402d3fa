//! ETHEREUM_MESSAGE sign sub-schema: personal_sign or
//! typed-data, with a prehash rule analogous to the transaction sub-parser.

use crate::error::Error;
use crate::types::DerivationPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageProtocol {
    PersonalSign,
    TypedData,
}

#[derive(Debug, Clone)]
pub struct EthMessageSignPayload {
    pub protocol: MessageProtocol,
    pub path: DerivationPath,
    pub display_hex: bool,
    pub declared_length: u16,
    pub chunk: Vec<u8>,
    pub prehash: bool,
}

pub fn parse(body: &[u8], has_extra_payloads: bool) -> Result<EthMessageSignPayload, Error> {
    if body.len() < 1 + 21 + 2 {
        return Err(Error::InvalidMsg);
    }
    let mut offset = 0;
    let protocol = match body[offset] {
        0 => MessageProtocol::PersonalSign,
        1 => MessageProtocol::TypedData,
        _ => return Err(Error::InvalidMsg),
    };
    offset += 1;

    let depth = body[offset];
    let mut segments = [0u32; 5];
    for (i, chunk) in body[offset + 1..offset + 21].chunks_exact(4).enumerate() {
        segments[i] = u32::from_be_bytes(chunk.try_into().unwrap());
    }
    let path = DerivationPath::new(segments, depth.min(5));
    offset += 21;

    let display_hex = if protocol == MessageProtocol::PersonalSign {
        let b = *body.get(offset).ok_or(Error::InvalidMsg)? != 0;
        offset += 1;
        b
    } else {
        false
    };

    let declared_length = u16::from_le_bytes(
        body.get(offset..offset + 2).ok_or(Error::InvalidMsg)?.try_into().unwrap(),
    );
    offset += 2;

    let chunk = body[offset..].to_vec();
    let prehash = declared_length as usize > chunk.len() && !has_extra_payloads;

    Ok(EthMessageSignPayload { protocol, path, display_hex, declared_length, chunk, prehash })
}
