//! Error taxonomy for the signing-device core.
//!
//! Each variant maps to a response code. Messages are
//! kept short and never carry key material or plaintext payloads.

use core::fmt;

use crate::constants::ResponseCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Length mismatch, sentinel violation, unknown request-type, malformed DER.
    InvalidMsg,
    /// No candidate secret decrypted with a valid CRC, or pairing signature failed.
    PairFailed,
    /// Operation attempted while the device is locked.
    DeviceLocked,
    /// FinalizePairing while already paired, or AddKv for an existing key.
    Already,
    /// Operation gated by firmware version below requirement.
    UnsupportedVersion,
    /// Approval rejected or timed out.
    UserDeclined,
    /// Unreachable paths, collaborator failures. Carries a cause for logs only.
    Internal(&'static str),
}

impl Error {
    pub fn to_response_code(&self) -> ResponseCode {
        match self {
            Error::InvalidMsg => ResponseCode::InvalidMsg,
            Error::PairFailed => ResponseCode::PairFailed,
            Error::DeviceLocked => ResponseCode::DeviceLocked,
            Error::Already => ResponseCode::Already,
            Error::UnsupportedVersion => ResponseCode::UnsupportedVersion,
            Error::UserDeclined => ResponseCode::UserDeclined,
            Error::Internal(_) => ResponseCode::InternalError,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidMsg => write!(f, "invalid message"),
            Error::PairFailed => write!(f, "pairing failed"),
            Error::DeviceLocked => write!(f, "device locked"),
            Error::Already => write!(f, "already"),
            Error::UnsupportedVersion => write!(f, "unsupported firmware version"),
            Error::UserDeclined => write!(f, "user declined"),
            Error::Internal(cause) => write!(f, "internal error: {cause}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_code_mapping() {
        assert_eq!(Error::InvalidMsg.to_response_code(), ResponseCode::InvalidMsg);
        assert_eq!(Error::PairFailed.to_response_code(), ResponseCode::PairFailed);
        assert_eq!(Error::Internal("x").to_response_code(), ResponseCode::InternalError);
    }
}
