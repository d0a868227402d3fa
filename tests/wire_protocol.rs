//! Exercises `Device::handle_frame`, the single entry point that parses the
//! outer message-type prefix, decrypts/dispatches/re-encrypts encrypted
//! requests, and always returns the outer-framed response.

use hsm_core::approval::AutoApprove;
use hsm_core::constants::{ResponseCode, FRAME_SIZE};
use hsm_core::device::{Device, DeviceConfig};
use hsm_core::events::NullEventSink;
use hsm_core::kv::InMemoryKvStore;
use p256::elliptic_curve::sec1::ToEncodedPoint;

fn test_seed() -> [u8; 64] {
    [0x77u8; 64]
}

fn new_device() -> Device {
    Device::new(
        DeviceConfig::new(test_seed()),
        Box::new(InMemoryKvStore::new()),
        Box::new(AutoApprove),
        Box::new(NullEventSink),
    )
}

fn unpack_outer_frame(framed: &[u8]) -> (u8, &[u8]) {
    let response_code = framed[1];
    let data_len = u32::from_be_bytes(framed[4..8].try_into().unwrap()) as usize;
    (response_code, &framed[8..8 + data_len])
}

#[tokio::test]
async fn connect_over_the_wire_returns_a_full_size_encrypted_frame() {
    let device = new_device();
    let client_secret = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
    let client_pub_point = client_secret.verifying_key().to_encoded_point(false);

    let mut message = vec![0x01u8]; // MSG_TYPE_CONNECT
    message.extend_from_slice(client_pub_point.as_bytes());

    let framed = device.handle_frame(&message).await;
    let (response_code, data) = unpack_outer_frame(&framed);
    assert_eq!(response_code, ResponseCode::Success as u8);
    assert_eq!(data.len(), FRAME_SIZE);
}

#[tokio::test]
async fn malformed_connect_message_is_rejected_at_the_outer_framing() {
    let device = new_device();
    let message = vec![0x01u8, 0xaa, 0xbb]; // too short to be a 65-byte pubkey
    let framed = device.handle_frame(&message).await;
    let (response_code, data) = unpack_outer_frame(&framed);
    assert_eq!(response_code, ResponseCode::InvalidMsg as u8);
    assert!(data.is_empty());
}

#[tokio::test]
async fn encrypted_request_with_no_matching_secret_fails_pairing() {
    let device = new_device();
    let client_secret = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
    let client_pub_point = client_secret.verifying_key().to_encoded_point(false);
    let mut connect_message = vec![0x01u8];
    connect_message.extend_from_slice(client_pub_point.as_bytes());
    device.handle_frame(&connect_message).await;

    // request-type(GetWallets=0x04) | ephemeral_id hint(4, bogus) | ciphertext
    // encrypted under a secret the device never saw.
    let mut message = vec![0x02u8, 0x04];
    message.extend_from_slice(&0u32.to_be_bytes());
    message.extend_from_slice(&[0u8; FRAME_SIZE]);

    let framed = device.handle_frame(&message).await;
    let (response_code, data) = unpack_outer_frame(&framed);
    assert_eq!(response_code, ResponseCode::PairFailed as u8);
    assert!(data.is_empty());
}

#[tokio::test]
async fn unknown_outer_message_type_is_invalid() {
    let device = new_device();
    let framed = device.handle_frame(&[0xffu8, 0x00]).await;
    let (response_code, data) = unpack_outer_frame(&framed);
    assert_eq!(response_code, ResponseCode::InvalidMsg as u8);
    assert!(data.is_empty());
}
