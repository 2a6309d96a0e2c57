// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Response status words
//!

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};

/// Status words returned in the APDU trailer
#[derive(Copy, Clone, PartialEq, Eq, Debug, EnumString, Display, EnumIter, TryFromPrimitive)]
#[repr(u16)]
pub enum StatusWord {
    /// Success
    Ok = 0x9000,
    /// Operation rejected by the operator
    Rejected = 0x6985,
    /// Command not allowed in the current state
    NotAllowed = 0x6986,
    /// Security condition not satisfied
    Security = 0x6982,
    /// Invalid values (eg. unsupported curve)
    WrongValues = 0x6a80,
    /// Invalid packet sequencing / parameters
    WrongParam = 0x6b00,
    /// Invalid command length
    WrongLength = 0x6c00,
    /// Unknown or unsupported instruction
    InvalidIns = 0x6d00,
    /// Unknown class
    InvalidClass = 0x6e00,
    /// Response encoding failed
    EncodingFailed = 0x6700,
    /// Internal memory bound violated
    MemoryError = 0x9200,
    /// Malformed, oversized or out-of-sequence input
    ParseError = 0x9405,
}

impl From<StatusWord> for u16 {
    fn from(s: StatusWord) -> Self {
        s as u16
    }
}
