//! Sign envelope and schema dispatch.

use crate::constants::Schema;
use crate::error::Error;
use crate::types::{SignBody, SignRequest};

pub fn parse(body: &[u8]) -> Result<SignRequest, Error> {
    if body.len() < 1 + 1 + 32 {
        return Err(Error::InvalidMsg);
    }
    let has_extra_payloads = body[0] != 0;
    let schema = Schema::from_u8(body[1]);
    // wallet_uid at body[2..34] is discarded by the core.
    let payload = &body[34..];

    let sign_body = match schema {
        Schema::Bitcoin => SignBody::Bitcoin(super::sign_bitcoin::parse(payload)?),
        Schema::EthereumTransaction | Schema::Erc20 => {
            SignBody::EthereumTransaction(super::sign_eth_tx::parse(payload, has_extra_payloads)?)
        }
        Schema::EthereumMessage => {
            SignBody::EthereumMessage(super::sign_eth_msg::parse(payload, has_extra_payloads)?)
        }
        Schema::ExtraData => SignBody::ExtraData(super::extra_data::parse(payload)?),
        Schema::Generic => SignBody::Generic(super::sign_generic::parse(payload)?),
    };

    // ERC20 shares the Ethereum-transaction wire layout but is distinguished
    // as its own schema tag for the response serializer.
    let schema = if matches!(schema, Schema::Erc20) { Schema::Erc20 } else { schema };

    Ok(SignRequest { has_extra_payloads, schema, body: sign_body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_data_is_invalid() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn generic_schema_with_zero_declared_length_parses_but_is_empty() {
        // The envelope itself is well-formed; rejecting a zero-length
        // Generic sign is the device's job (`Device::sign`), not the
        // parser's — this just pins down that the parse succeeds with an
        // empty chunk so the device-level check has something to see.
        let mut body = vec![0u8, 5u8]; // has_extra_payloads=0, schema=GENERIC
        body.extend_from_slice(&[0u8; 32]);
        body.extend_from_slice(&0u32.to_be_bytes()); // encoding
        body.push(0); // hash_type
        body.push(0); // curve
        body.push(0); // path depth
        body.extend_from_slice(&[0u8; 20]); // path segments
        body.push(0); // omit_pubkey
        body.extend_from_slice(&0u16.to_le_bytes()); // declared_length = 0

        let parsed = parse(&body).unwrap();
        match parsed.body {
            crate::types::SignBody::Generic(payload) => {
                assert_eq!(payload.declared_length, 0);
                assert!(payload.chunk.is_empty());
            }
            _ => panic!("expected Generic"),
        }
    }
}
