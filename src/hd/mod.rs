//! HD derivation schemes.

pub mod bip32_derive;
pub mod eip2333;
pub mod slip10;
