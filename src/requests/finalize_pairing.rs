//! FinalizePairing body: 99 bytes exactly.

use crate::error::Error;

pub struct FinalizePairingRequest {
    pub app_name: [u8; 25],
    pub signature_der: [u8; 74],
}

pub fn parse(body: &[u8]) -> Result<FinalizePairingRequest, Error> {
    if body.len() != 99 {
        return Err(Error::InvalidMsg);
    }
    let mut app_name = [0u8; 25];
    let mut signature_der = [0u8; 74];
    app_name.copy_from_slice(&body[0..25]);
    signature_der.copy_from_slice(&body[25..99]);
    Ok(FinalizePairingRequest { app_name, signature_der })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_length_is_invalid() {
        assert!(parse(&[0u8; 98]).is_err());
        assert!(parse(&[0u8; 100]).is_err());
    }

    #[test]
    fn exact_length_parses() {
        let body = [0u8; 99];
        assert!(parse(&body).is_ok());
    }
}
