//! Software emulation of an HSM-style signing device: session crypto, the
//! encrypted protocol engine, and the HD-derivation signing pipeline.

pub mod addr;
pub mod approval;
pub mod codec;
pub mod constants;
pub mod curves;
pub mod device;
pub mod error;
pub mod events;
pub mod hd;
pub mod kv;
pub mod requests;
pub mod responses;
pub mod rlp;
pub mod signing;
pub mod types;

pub use device::{Device, DeviceConfig};
pub use error::Error;

use constants::{ResponseCode, MSG_TYPE_RESPONSE};

/// Wrap a response payload (or an error) in the outer framing:
/// `msg_type(1) | response_code(1) | reserved(2) | data_length(u32 BE) | data`
///.
pub fn frame_response(result: Result<Vec<u8>, Error>) -> Vec<u8> {
    let (code, data) = match result {
        Ok(data) => (ResponseCode::Success, data),
        Err(e) => (e.to_response_code(), Vec::new()),
    };
    let mut out = Vec::with_capacity(8 + data.len());
    out.push(MSG_TYPE_RESPONSE);
    out.push(code as u8);
    out.extend_from_slice(&[0u8, 0u8]);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(&data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_response_success_carries_payload() {
        let framed = frame_response(Ok(vec![1, 2, 3]));
        assert_eq!(framed[0], 0x00);
        assert_eq!(framed[1], ResponseCode::Success as u8);
        assert_eq!(u32::from_be_bytes(framed[4..8].try_into().unwrap()), 3);
        assert_eq!(&framed[8..], &[1, 2, 3]);
    }

    #[test]
    fn frame_response_error_has_empty_payload() {
        let framed = frame_response(Err(Error::PairFailed));
        assert_eq!(framed[1], ResponseCode::PairFailed as u8);
        assert_eq!(u32::from_be_bytes(framed[4..8].try_into().unwrap()), 0);
    }
}
