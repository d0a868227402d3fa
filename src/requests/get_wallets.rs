//! GetWallets: no payload.

use crate::error::Error;

pub fn parse(body: &[u8]) -> Result<(), Error> {
    if !body.is_empty() {
        return Err(Error::InvalidMsg);
    }
    Ok(())
}
