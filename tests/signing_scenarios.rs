//! End-to-end scenarios: connect -> pair -> sign.

use hsm_core::approval::AutoApprove;
use hsm_core::device::{Device, DeviceConfig};
use hsm_core::events::NullEventSink;
use hsm_core::kv::InMemoryKvStore;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256};

fn test_seed() -> [u8; 64] {
    // Deterministic test seed; not a real BIP-39 mnemonic expansion, but
    // fixed and reproducible across runs.
    let mut seed = [0u8; 64];
    for (i, byte) in seed.iter_mut().enumerate() {
        *byte = i as u8;
    }
    seed
}

fn pair_device(device: &Device, pairing_code: &str, app_name: &str) -> [u8; 65] {
    let client_secret = SigningKey::random(&mut rand::thread_rng());
    let client_pub_point = client_secret.verifying_key().to_encoded_point(false);
    let mut client_pub = [0u8; 65];
    client_pub.copy_from_slice(client_pub_point.as_bytes());

    device.connect(client_pub).expect("connect succeeds");

    let mut app_name_padded = [0u8; 25];
    let bytes = app_name.as_bytes();
    app_name_padded[..bytes.len()].copy_from_slice(bytes);

    let mut preimage = Vec::new();
    preimage.extend_from_slice(&client_pub);
    preimage.extend_from_slice(&app_name_padded);
    preimage.extend_from_slice(pairing_code.as_bytes());
    let digest = Sha256::digest(&preimage);

    let signature: Signature = client_secret.sign(&digest);
    let der = signature.to_der();
    let mut der_padded = [0u8; 74];
    let der_bytes = der.as_bytes();
    der_padded[..der_bytes.len()].copy_from_slice(der_bytes);

    let mut body = Vec::with_capacity(99);
    body.extend_from_slice(&app_name_padded);
    body.extend_from_slice(&der_padded);
    device.finalize_pairing(&body).expect("finalize pairing succeeds");

    client_pub
}

fn new_paired_device(auto_approve: bool) -> Device {
    let config = DeviceConfig::new(test_seed()).auto_approve(auto_approve).pairing_code("12345678");
    let device = Device::new(
        config,
        Box::new(InMemoryKvStore::new()),
        Box::new(AutoApprove),
        Box::new(NullEventSink),
    );
    pair_device(&device, "12345678", "testapp");
    device
}

#[tokio::test]
async fn ethereum_legacy_transaction_sign_round_trips() {
    let device = new_paired_device(true);

    // has_extra_payloads(0) | schema(1=ETH_TX) | wallet_uid(32, zero)
    let mut body = vec![0u8, 1u8];
    body.extend_from_slice(&[0u8; 32]);

    // eip155(1) | chain_id(8, zero since eip155=false here for a minimal tx)
    body.push(0u8);
    body.extend_from_slice(&[0u8; 8]);
    // path depth(1) + 5 segments, m/44'/60'/0'/0/0
    body.push(5);
    body.extend_from_slice(&(44u32 | 0x8000_0000).to_be_bytes());
    body.extend_from_slice(&(60u32 | 0x8000_0000).to_be_bytes());
    body.extend_from_slice(&(0u32 | 0x8000_0000).to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    // nonce(8)=0, gas_price(8)=1, gas_limit(8)=21000
    body.extend_from_slice(&0u64.to_be_bytes());
    body.extend_from_slice(&1u64.to_be_bytes());
    body.extend_from_slice(&21000u64.to_be_bytes());
    // to(20)
    body.extend_from_slice(&[0x22u8; 20]);
    // value(32) = 0
    body.extend_from_slice(&[0u8; 32]);
    // prehash(1)=0, tx_type(1)=0 legacy
    body.push(0);
    body.push(0);
    // max_priority_fee_per_gas(8)
    body.extend_from_slice(&0u64.to_be_bytes());
    // declared_data_len(4) = 0, no data
    body.extend_from_slice(&0u32.to_be_bytes());

    let response = device.sign(&body).await.expect("sign succeeds");
    // 74-byte DER signature + 20-byte address
    assert_eq!(response.len(), 74 + 20);
}

#[tokio::test]
async fn generic_ed25519_signature_verifies() {
    let device = new_paired_device(true);

    let encoding = 1u32; // Solana
    let hash_type = 0u8; // NONE
    let curve = 1u8; // ed25519
    let path_depth = 4u8;

    let mut body = Vec::new();
    body.extend_from_slice(&encoding.to_be_bytes());
    body.push(hash_type);
    body.push(curve);
    body.push(path_depth);
    body.extend_from_slice(&(44u32 | 0x8000_0000).to_be_bytes());
    body.extend_from_slice(&(501u32 | 0x8000_0000).to_be_bytes());
    body.extend_from_slice(&(0u32 | 0x8000_0000).to_be_bytes());
    body.extend_from_slice(&(0u32 | 0x8000_0000).to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.push(0); // omit_pubkey = false

    let message = [0x5au8; 64];
    body.extend_from_slice(&(message.len() as u16).to_le_bytes());
    body.extend_from_slice(&message);

    let mut envelope = vec![0u8, 5u8]; // has_extra_payloads=0, schema=GENERIC
    envelope.extend_from_slice(&[0u8; 32]);
    envelope.extend_from_slice(&body);

    let response = device.sign(&envelope).await.expect("sign succeeds");
    assert_eq!(response.len(), 32 + 64);

    let pubkey_bytes: [u8; 32] = response[0..32].try_into().unwrap();
    let sig_bytes: [u8; 64] = response[32..96].try_into().unwrap();

    use ed25519_dalek::{Signature as EdSignature, Verifier, VerifyingKey};
    let verifying_key = VerifyingKey::from_bytes(&pubkey_bytes).unwrap();
    let signature = EdSignature::from_bytes(&sig_bytes);
    assert!(verifying_key.verify(&message, &signature).is_ok());
}

#[tokio::test]
async fn multipart_generic_session_ends_empty() {
    let device = new_paired_device(true);

    let full_message = vec![0x11u8; 4096];
    let initial_chunk = &full_message[..1519];

    let encoding = 0u32; // none
    let mut body = Vec::new();
    body.extend_from_slice(&encoding.to_be_bytes());
    body.push(0u8); // hash_type none
    body.push(0u8); // curve secp256k1
    body.push(4u8); // path depth
    body.extend_from_slice(&(44u32 | 0x8000_0000).to_be_bytes());
    body.extend_from_slice(&(0u32 | 0x8000_0000).to_be_bytes());
    body.extend_from_slice(&(0u32 | 0x8000_0000).to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.push(1u8); // omit_pubkey = true, to keep the response small
    body.extend_from_slice(&(full_message.len() as u16).to_le_bytes());
    body.extend_from_slice(initial_chunk);

    let mut envelope = vec![1u8, 5u8]; // has_extra_payloads=1
    envelope.extend_from_slice(&[0u8; 32]);
    envelope.extend_from_slice(&body);

    let response = device.sign(&envelope).await.expect("sign succeeds");
    assert_eq!(response.len(), 8); // next_code placeholder
    let next_code: [u8; 8] = response.clone().try_into().unwrap();

    let chunk2 = &full_message[1519..1519 + 1288];
    let mut extra1 = Vec::new();
    extra1.extend_from_slice(&next_code);
    extra1.extend_from_slice(&(chunk2.len() as u32).to_le_bytes());
    extra1.extend_from_slice(chunk2);
    let mut envelope1 = vec![1u8, 4u8]; // schema=EXTRA_DATA, more frames coming
    envelope1.extend_from_slice(&[0u8; 32]);
    envelope1.extend_from_slice(&extra1);
    let response1 = device.sign(&envelope1).await.expect("extra frame 1 succeeds");
    assert_eq!(response1.len(), 8);
    let next_code2: [u8; 8] = response1.try_into().unwrap();

    let chunk3 = &full_message[1519 + 1288..];
    let mut extra2 = Vec::new();
    extra2.extend_from_slice(&next_code2);
    extra2.extend_from_slice(&(chunk3.len() as u32).to_le_bytes());
    extra2.extend_from_slice(chunk3);
    let mut envelope2 = vec![0u8, 4u8]; // last frame
    envelope2.extend_from_slice(&[0u8; 32]);
    envelope2.extend_from_slice(&extra2);
    let response2 = device.sign(&envelope2).await.expect("final extra frame succeeds");
    assert_eq!(response2.len(), 65 + 74); // generic secp256k1, no prehash appended
}
