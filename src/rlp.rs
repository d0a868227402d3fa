//! Minimal RLP encode/decode, just enough for Ethereum transaction preimages.

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem {
    String(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    pub fn as_string(&self) -> Result<&[u8], Error> {
        match self {
            RlpItem::String(b) => Ok(b),
            RlpItem::List(_) => Err(Error::InvalidMsg),
        }
    }

    pub fn as_list(&self) -> Result<&[RlpItem], Error> {
        match self {
            RlpItem::List(items) => Ok(items),
            RlpItem::String(_) => Err(Error::InvalidMsg),
        }
    }

    pub fn as_u64(&self) -> Result<u64, Error> {
        let b = self.as_string()?;
        if b.len() > 8 {
            return Err(Error::InvalidMsg);
        }
        let mut buf = [0u8; 8];
        buf[8 - b.len()..].copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }

    pub fn as_bytes32(&self) -> Result<[u8; 32], Error> {
        let b = self.as_string()?;
        if b.len() > 32 {
            return Err(Error::InvalidMsg);
        }
        let mut buf = [0u8; 32];
        buf[32 - b.len()..].copy_from_slice(b);
        Ok(buf)
    }

    pub fn as_address(&self) -> Result<[u8; 20], Error> {
        let b = self.as_string()?;
        if b.len() != 20 {
            return Err(Error::InvalidMsg);
        }
        let mut buf = [0u8; 20];
        buf.copy_from_slice(b);
        Ok(buf)
    }
}

/// Decode a single RLP item, requiring the entire slice to be consumed.
pub fn decode_exact(data: &[u8]) -> Result<RlpItem, Error> {
    let (item, rest) = decode_one(data)?;
    if !rest.is_empty() {
        return Err(Error::InvalidMsg);
    }
    Ok(item)
}

fn decode_one(data: &[u8]) -> Result<(RlpItem, &[u8]), Error> {
    let first = *data.first().ok_or(Error::InvalidMsg)?;
    match first {
        0x00..=0x7f => Ok((RlpItem::String(vec![first]), &data[1..])),
        0x80..=0xb7 => {
            let len = (first - 0x80) as usize;
            let body = data.get(1..1 + len).ok_or(Error::InvalidMsg)?;
            Ok((RlpItem::String(body.to_vec()), &data[1 + len..]))
        }
        0xb8..=0xbf => {
            let len_of_len = (first - 0xb7) as usize;
            let len = read_be_len(data, 1, len_of_len)?;
            let start = 1 + len_of_len;
            let body = data.get(start..start + len).ok_or(Error::InvalidMsg)?;
            Ok((RlpItem::String(body.to_vec()), &data[start + len..]))
        }
        0xc0..=0xf7 => {
            let len = (first - 0xc0) as usize;
            let body = data.get(1..1 + len).ok_or(Error::InvalidMsg)?;
            Ok((RlpItem::List(decode_list_body(body)?), &data[1 + len..]))
        }
        0xf8..=0xff => {
            let len_of_len = (first - 0xf7) as usize;
            let len = read_be_len(data, 1, len_of_len)?;
            let start = 1 + len_of_len;
            let body = data.get(start..start + len).ok_or(Error::InvalidMsg)?;
            Ok((RlpItem::List(decode_list_body(body)?), &data[start + len..]))
        }
    }
}

fn read_be_len(data: &[u8], offset: usize, n: usize) -> Result<usize, Error> {
    let b = data.get(offset..offset + n).ok_or(Error::InvalidMsg)?;
    let mut v = 0usize;
    for &byte in b {
        v = v.checked_shl(8).ok_or(Error::InvalidMsg)? | byte as usize;
    }
    Ok(v)
}

fn decode_list_body(mut body: &[u8]) -> Result<Vec<RlpItem>, Error> {
    let mut items = Vec::new();
    while !body.is_empty() {
        let (item, rest) = decode_one(body)?;
        items.push(item);
        body = rest;
    }
    Ok(items)
}

pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return vec![data[0]];
    }
    let mut out = encode_len_prefix(0x80, 0xb7, data.len());
    out.extend_from_slice(data);
    out
}

pub fn encode_u64(v: u64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(8);
    encode_bytes(&bytes[first_nonzero..])
}

pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = items.iter().flat_map(|i| i.iter().copied()).collect();
    let mut out = encode_len_prefix(0xc0, 0xf7, body.len());
    out.extend_from_slice(&body);
    out
}

fn encode_len_prefix(short_base: u8, long_base: u8, len: usize) -> Vec<u8> {
    if len < 56 {
        vec![short_base + len as u8]
    } else {
        let len_bytes = len.to_be_bytes();
        let first_nonzero = len_bytes.iter().position(|&b| b != 0).unwrap_or(7);
        let trimmed = &len_bytes[first_nonzero..];
        let mut out = vec![long_base + trimmed.len() as u8];
        out.extend_from_slice(trimmed);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_u64() {
        let encoded = encode_u64(0x1234);
        let decoded = decode_exact(&encoded).unwrap();
        assert_eq!(decoded.as_u64().unwrap(), 0x1234);
    }

    #[test]
    fn empty_string_encodes_to_0x80() {
        assert_eq!(encode_bytes(&[]), vec![0x80]);
    }

    #[test]
    fn list_round_trip() {
        let items = vec![encode_u64(9), encode_bytes(b"hi")];
        let encoded = encode_list(&items);
        let decoded = decode_exact(&encoded).unwrap();
        let list = decoded.as_list().unwrap();
        assert_eq!(list[0].as_u64().unwrap(), 9);
        assert_eq!(list[1].as_string().unwrap(), b"hi");
    }
}
