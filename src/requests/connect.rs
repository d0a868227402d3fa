//! Unencrypted Connect message: 65-byte client P-256 public key.

use crate::error::Error;

pub fn parse(body: &[u8]) -> Result<[u8; 65], Error> {
    body.try_into().map_err(|_| Error::InvalidMsg)
}
