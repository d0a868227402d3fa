//! EXTRA_DATA sign sub-schema: follow-on chunks for a multipart session.

use crate::error::Error;
use crate::types::ExtraDataFrame;

pub fn parse(body: &[u8]) -> Result<ExtraDataFrame, Error> {
    if body.len() < 12 {
        return Err(Error::InvalidMsg);
    }
    let mut next_code = [0u8; 8];
    next_code.copy_from_slice(&body[0..8]);
    let frame_len = u32::from_le_bytes(body[8..12].try_into().unwrap()) as usize;
    let frame = body.get(12..12 + frame_len).ok_or(Error::InvalidMsg)?.to_vec();
    Ok(ExtraDataFrame { next_code, frame })
}
