//! BLS12-381 minimal-pubkey-size (G2 signature) scheme via `blst`.

use blst::min_pk::{PublicKey, SecretKey, Signature};

use crate::error::Error;

const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

pub fn secret_key_from_scalar(scalar: &[u8; 32]) -> Result<SecretKey, Error> {
    SecretKey::key_gen(scalar, &[]).map_err(|_| Error::Internal("bls key_gen"))
}

pub fn sign(sk: &SecretKey, message: &[u8]) -> [u8; 96] {
    let sig = sk.sign(message, DST, &[]);
    sig.compress()
}

pub fn public_key_compressed(sk: &SecretKey) -> [u8; 48] {
    sk.sk_to_pk().compress()
}

pub fn verify(pk_bytes: &[u8; 48], message: &[u8], sig_bytes: &[u8; 96]) -> bool {
    let pk = match PublicKey::from_bytes(pk_bytes) {
        Ok(pk) => pk,
        Err(_) => return false,
    };
    let sig = match Signature::from_bytes(sig_bytes) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    sig.verify(true, message, DST, &[], &pk, true) == blst::BLST_ERROR::BLST_SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips() {
        let sk = secret_key_from_scalar(&[0x09u8; 32]).unwrap();
        let msg = b"bls test message";
        let sig = sign(&sk, msg);
        let pk = public_key_compressed(&sk);
        assert!(verify(&pk, msg, &sig));
    }
}
