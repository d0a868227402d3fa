//! Sign response bodies, schema-dependent.

pub enum SignResponseBody {
    /// Placeholder emitted while a multipart session awaits more data.
    MultipartPlaceholder { next_code: [u8; 8] },
    Bitcoin { change_pkh: [u8; 20], der_signature: Vec<u8>, compressed_pubkey: [u8; 33] },
    EthereumLike { der_signature: Vec<u8>, signer_address: [u8; 20] },
    GenericSecp256k1 { pubkey: Option<[u8; 65]>, der_signature: Vec<u8>, prehash: Option<[u8; 32]> },
    GenericEd25519 { pubkey: [u8; 32], signature: [u8; 64] },
    GenericBls { pubkey: [u8; 48], signature: [u8; 96] },
}

pub fn serialize(body: &SignResponseBody) -> Vec<u8> {
    match body {
        SignResponseBody::MultipartPlaceholder { next_code } => {
            let mut out = vec![0u8; 8];
            out[..8].copy_from_slice(next_code);
            out
        }
        SignResponseBody::Bitcoin { change_pkh, der_signature, compressed_pubkey } => {
            let mut out = Vec::with_capacity(20 + 760 + 33);
            out.extend_from_slice(change_pkh);
            let mut sig_section = [0u8; 760];
            let padded = crate::curves::secp256k1::pad_der_74(der_signature);
            sig_section[..74].copy_from_slice(&padded);
            out.extend_from_slice(&sig_section);
            out.extend_from_slice(compressed_pubkey);
            out
        }
        SignResponseBody::EthereumLike { der_signature, signer_address } => {
            let mut out = Vec::with_capacity(74 + 20);
            out.extend_from_slice(&crate::curves::secp256k1::pad_der_74(der_signature));
            out.extend_from_slice(signer_address);
            out
        }
        SignResponseBody::GenericSecp256k1 { pubkey, der_signature, prehash } => {
            let mut out = Vec::with_capacity(65 + 74 + 32);
            out.extend_from_slice(&pubkey.unwrap_or([0u8; 65]));
            out.extend_from_slice(&crate::curves::secp256k1::pad_der_74(der_signature));
            if let Some(p) = prehash {
                out.extend_from_slice(p);
            }
            out
        }
        SignResponseBody::GenericEd25519 { pubkey, signature } => {
            let mut out = Vec::with_capacity(96);
            out.extend_from_slice(pubkey);
            out.extend_from_slice(signature);
            out
        }
        SignResponseBody::GenericBls { pubkey, signature } => {
            let mut out = Vec::with_capacity(144);
            out.extend_from_slice(pubkey);
            out.extend_from_slice(signature);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitcoin_body_fills_only_first_slot() {
        let body = SignResponseBody::Bitcoin {
            change_pkh: [0u8; 20],
            der_signature: vec![0x30, 0x02, 0x02, 0x00, 0x02, 0x00],
            compressed_pubkey: [0x02u8; 33],
        };
        let out = serialize(&body);
        assert_eq!(out.len(), 20 + 760 + 33);
        assert!(out[20 + 74..20 + 760].iter().all(|&b| b == 0));
    }
}
