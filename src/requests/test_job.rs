//! Diagnostic `Test` wallet-job blob.

use crate::error::Error;

/// Opaque diagnostic payload; the core echoes it back unmodified.
pub struct TestRequest {
    pub payload: Vec<u8>,
}

pub fn parse(body: &[u8]) -> Result<TestRequest, Error> {
    Ok(TestRequest { payload: body.to_vec() })
}
