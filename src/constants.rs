//! Wire constants for the encrypted signing protocol.
//!
//! Request-type tags, response codes, curve/hash/encoding enumerations and
//! the fixed frame-size tables. These values are self-consistent (the codec
//! round-trips against itself and the bundled test vectors) but where a
//! deployment needs to mirror a live counterparty SDK exactly, this is the
//! single place an implementer would plug in the real constants.

/// Total size of an encrypted wire frame, always.
pub const FRAME_SIZE: usize = 1728;

/// One-byte message-type prefix for the unencrypted Connect message.
pub const MSG_TYPE_CONNECT: u8 = 0x01;
/// One-byte message-type prefix for encrypted request messages.
pub const MSG_TYPE_ENCRYPTED: u8 = 0x02;
/// Message type used in outer response framing (always present).
pub const MSG_TYPE_RESPONSE: u8 = 0x00;

/// One-byte request-type tags for the ten encrypted request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestType {
    FinalizePairing = 0x01,
    GetAddresses = 0x02,
    Sign = 0x03,
    GetWallets = 0x04,
    GetKvRecords = 0x05,
    AddKvRecords = 0x06,
    RemoveKvRecords = 0x07,
    FetchEncryptedData = 0x08,
    Test = 0x09,
}

impl RequestType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x01 => Self::FinalizePairing,
            0x02 => Self::GetAddresses,
            0x03 => Self::Sign,
            0x04 => Self::GetWallets,
            0x05 => Self::GetKvRecords,
            0x06 => Self::AddKvRecords,
            0x07 => Self::RemoveKvRecords,
            0x08 => Self::FetchEncryptedData,
            0x09 => Self::Test,
            _ => return None,
        })
    }

    /// Fixed decrypted body size `N` for this request type, as consulted by
    /// the frame codec before the CRC. `Sign` and
    /// `GetKvRecords`/`AddKvRecords`/`RemoveKvRecords` bodies are
    /// variable-length in the underlying protocol; for those the codec
    /// treats the table value as the *maximum* cleartext region it CRCs and
    /// padding-strips, since the frame itself is always padded to
    /// `FRAME_SIZE` regardless.
    pub fn max_body_len(self) -> usize {
        match self {
            RequestType::FinalizePairing => 99,
            RequestType::GetAddresses => 54,
            RequestType::Sign => 1600,
            RequestType::GetWallets => 0,
            RequestType::GetKvRecords => 9,
            RequestType::AddKvRecords => 1 + 255 * (4 + 4 + 1 + 1 + 64 + 1 + 64),
            RequestType::RemoveKvRecords => 4 + 1 + 255 * 4,
            RequestType::FetchEncryptedData => 4 + 32 + 1 + 5 * 4 + 4,
            RequestType::Test => 1536,
        }
    }
    /// Fixed maximum response-body size for this request type, consulted by
    /// the codec when padding an outbound frame. Variable
    /// responses (GetAddresses, GetKvRecords) use the largest size they can
    /// take; the serializer itself produces the exact, shorter payload and
    /// the codec zero-pads the remainder.
    pub fn max_response_len(self) -> usize {
        match self {
            RequestType::FinalizePairing => 0,
            RequestType::GetAddresses => 1 + 10 * 129,
            RequestType::Sign => 20 + 760 + 33,
            RequestType::GetWallets => 71 * 2,
            RequestType::GetKvRecords => 4 + 1 + 255 * (4 + 4 + 1 + 1 + 64 + 1 + 64),
            RequestType::AddKvRecords => 0,
            RequestType::RemoveKvRecords => 0,
            RequestType::FetchEncryptedData => 1536,
            RequestType::Test => 1536,
        }
    }
}

/// Response codes carried in the outer framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseCode {
    Success = 0x00,
    InvalidMsg = 0x01,
    PairFailed = 0x02,
    DeviceLocked = 0x03,
    UnsupportedVersion = 0x04,
    Already = 0x05,
    UserDeclined = 0x06,
    InternalError = 0x07,
}

/// Flag values for `GetAddresses`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AddressFlag {
    Address = 0,
    Secp256k1Pubkey = 3,
    Ed25519Pubkey = 4,
    Bls12_381Pubkey = 5,
    Secp256k1Xpub = 6,
}

impl AddressFlag {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Address,
            3 => Self::Secp256k1Pubkey,
            4 => Self::Ed25519Pubkey,
            5 => Self::Bls12_381Pubkey,
            6 => Self::Secp256k1Xpub,
            _ => return None,
        })
    }
}

/// Signing curve selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Curve {
    Secp256k1 = 0,
    Ed25519 = 1,
    Bls12_381 = 2,
}

impl Curve {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Secp256k1,
            1 => Self::Ed25519,
            2 => Self::Bls12_381,
            _ => return None,
        })
    }
}

/// Pre-signing hash transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HashType {
    None = 0,
    Keccak256 = 1,
    Sha256 = 2,
}

impl HashType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::None,
            1 => Self::Keccak256,
            2 => Self::Sha256,
            _ => return None,
        })
    }
}

/// Encoding selector for the generic sign schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Encoding {
    None = 0,
    Solana = 1,
    Evm = 2,
    EthDeposit = 3,
    Eip7702Auth = 4,
    Eip7702AuthList = 5,
}

impl Encoding {
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::None,
            1 => Self::Solana,
            2 => Self::Evm,
            3 => Self::EthDeposit,
            4 => Self::Eip7702Auth,
            5 => Self::Eip7702AuthList,
            _ => return None,
        })
    }
}

/// Schema tag selecting a signing sub-parser / response layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Schema {
    Bitcoin = 0,
    EthereumTransaction = 1,
    Erc20 = 2,
    EthereumMessage = 3,
    ExtraData = 4,
    Generic = 5,
}

impl Schema {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Bitcoin,
            1 => Self::EthereumTransaction,
            2 => Self::Erc20,
            3 => Self::EthereumMessage,
            4 => Self::ExtraData,
            // anything else falls back to the generic parser
            _ => Self::Generic,
        }
    }
}

/// EIP-2718 transaction type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EthTxType {
    Legacy = 0,
    Eip2930 = 1,
    Eip1559 = 2,
    Eip7702 = 4,
}

impl EthTxType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Eip2930,
            2 => Self::Eip1559,
            4 => Self::Eip7702,
            _ => Self::Legacy,
        }
    }
}

/// Firmware feature gates.
pub const FW_MIN_KV: (u8, u8, u8) = (0, 12, 0);
pub const FW_MIN_BLS: (u8, u8, u8) = (0, 17, 0);

pub const MAX_BIP32_PATH_DEPTH: usize = 5;
pub const MAX_KV_FETCH: u8 = 10;
pub const MAX_KV_KEY_LEN: usize = 63;
pub const MAX_KV_VAL_LEN: usize = 63;

pub const PAIRING_TIMEOUT_MS_DEFAULT: u64 = 60_000;
pub const APPROVAL_TIMEOUT_MS_DEFAULT: u64 = 300_000;
pub const PAIRING_CODE_DEFAULT: &str = "12345678";
