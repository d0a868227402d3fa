//! Connect response: `status | is_paired | ephemeral_pub(65) |
//! firmware_version(4) | encrypted_wallet_blob(144)`.

use crate::types::WalletDescriptor;

pub fn serialize(
    is_paired: bool,
    ephemeral_pub: &[u8; 65],
    firmware_version: (u8, u8, u8),
    wallets: Option<(&WalletDescriptor, &WalletDescriptor)>,
    shared_secret: Option<&[u8; 32]>,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 1 + 65 + 4 + 144);
    out.push(1); // status = success
    out.push(is_paired as u8);
    out.extend_from_slice(ephemeral_pub);
    out.push(firmware_version.0);
    out.push(firmware_version.1);
    out.push(firmware_version.2);
    out.push(0); // reserved firmware byte

    if let (true, Some((internal, external)), Some(secret)) = (is_paired, wallets, shared_secret) {
        let mut plaintext = Vec::with_capacity(144);
        plaintext.extend_from_slice(&internal.encode());
        plaintext.extend_from_slice(&external.encode());
        plaintext.extend_from_slice(&[0u8; 2]);
        let plaintext: [u8; 144] = plaintext.try_into().expect("144 bytes");
        out.extend_from_slice(&codec_encrypt_blob(&plaintext, secret));
    } else {
        out.extend_from_slice(&[0u8; 144]);
    }
    out
}

fn codec_encrypt_blob(plaintext: &[u8; 144], secret: &[u8; 32]) -> [u8; 144] {
    // The wallet blob is its own fixed 144-byte AES-CBC block, independent
    // of the outer frame codec's padding-to-1728 step.
    use aes::Aes256;
    use cbc::cipher::{BlockEncryptMut, KeyIvInit};
    type Enc = cbc::Encryptor<Aes256>;
    let mut buf = plaintext.to_vec();
    let encryptor = Enc::new(secret.into(), &[0u8; 16].into());
    let out = encryptor
        .encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf, 144)
        .expect("144 is block-aligned");
    let mut fixed = [0u8; 144];
    fixed.copy_from_slice(out);
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpaired_response_has_zeroed_blob() {
        let pubkey = [0x04u8; 65];
        let out = serialize(false, &pubkey, (0, 15, 0), None, None);
        assert_eq!(out.len(), 1 + 1 + 65 + 4 + 144);
        assert!(out[71..].iter().all(|&b| b == 0));
    }
}
