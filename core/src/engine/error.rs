// Copyright (c) 2022-2023 The MobileCoin Foundation

use ledger_proto::ApduError;

use crate::apdu::status::StatusWord;

/// [Engine][super::Engine] errors
///
/// Any error returned by the engine aborts the signing session in progress.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
#[repr(u8)]
pub enum Error {
    /// Malformed, oversized or out-of-sequence input
    #[cfg_attr(feature = "thiserror", error("parse error"))]
    ParseError = 0x00,

    /// Invalid argument length
    #[cfg_attr(feature = "thiserror", error("invalid argument length"))]
    WrongLength = 0x01,

    /// Invalid packet control or parameter
    #[cfg_attr(feature = "thiserror", error("wrong parameter"))]
    WrongParameter = 0x02,

    /// Authorization or high-water mark check failed
    #[cfg_attr(feature = "thiserror", error("security condition not satisfied"))]
    SecurityError = 0x03,

    /// Internal memory bound violated
    #[cfg_attr(feature = "thiserror", error("memory error"))]
    MemoryError = 0x04,

    /// Unsupported or unknown curve
    #[cfg_attr(feature = "thiserror", error("unsupported curve"))]
    UnsupportedCurve = 0x05,

    /// Instruction unknown or not available in the configured mode
    #[cfg_attr(feature = "thiserror", error("invalid instruction"))]
    InvalidInstruction = 0x06,

    /// Invalid engine state
    #[cfg_attr(feature = "thiserror", error("invalid engine state"))]
    InvalidState = 0x07,

    /// Response encoding failed
    #[cfg_attr(feature = "thiserror", error("message encoding failed"))]
    EncodingFailed = 0x08,

    /// Persistent storage write failed
    #[cfg_attr(feature = "thiserror", error("storage write failed"))]
    Storage = 0x09,

    /// Unknown APDU class
    #[cfg_attr(feature = "thiserror", error("invalid class"))]
    InvalidClass = 0x0a,
}

impl Error {
    /// Map an [Error] to the status word returned to the host
    pub fn status(&self) -> StatusWord {
        match self {
            Error::ParseError => StatusWord::ParseError,
            Error::WrongLength => StatusWord::WrongLength,
            Error::WrongParameter => StatusWord::WrongParam,
            Error::SecurityError => StatusWord::Security,
            Error::MemoryError | Error::Storage => StatusWord::MemoryError,
            Error::UnsupportedCurve => StatusWord::WrongValues,
            Error::InvalidInstruction => StatusWord::InvalidIns,
            Error::InvalidState => StatusWord::NotAllowed,
            Error::EncodingFailed => StatusWord::EncodingFailed,
            Error::InvalidClass => StatusWord::InvalidClass,
        }
    }
}

/// Map wire decoding errors, short buffers to [Error::WrongLength]
/// and malformed content to [Error::ParseError]
impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        match e {
            ApduError::InvalidLength => Error::WrongLength,
            _ => Error::ParseError,
        }
    }
}
