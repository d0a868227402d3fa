//! Request parsers: one pure function per encrypted request kind, plus the
//! unencrypted Connect message.

pub mod connect;
pub mod extra_data;
pub mod fetch_encrypted_data;
pub mod finalize_pairing;
pub mod get_addresses;
pub mod get_wallets;
pub mod kv_records;
pub mod sign;
pub mod sign_bitcoin;
pub mod sign_eth_msg;
pub mod sign_eth_tx;
pub mod sign_generic;
pub mod test_job;
