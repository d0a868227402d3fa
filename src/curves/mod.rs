//! Curve-specific signing and address/key encodings.

pub mod bls;
pub mod ed25519;
pub mod secp256k1;
