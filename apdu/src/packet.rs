// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Packet sequencing for multi-part signing requests
//!
//! Signing requests are split over a sequence of command packets, with the
//! packet kind and a `LAST` marker carried in the `P1` byte:
//!
//! ```text
//!  7 6 5 4 3 2 1 0
//! +-+-+-+-+-+-+-+-+
//! |L|    KIND     |
//! +-+-+-+-+-+-+-+-+
//! ```

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};

use crate::ApduError;

/// `LAST` marker bit in `P1`
pub const P1_LAST_MARKER: u8 = 0x80;

/// Packet kinds
#[derive(Copy, Clone, PartialEq, Eq, Debug, EnumString, Display, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum PacketKind {
    /// First packet, carries derivation path and curve
    First = 0x00,
    /// Subsequent packet carrying operation bytes
    Next = 0x01,
    /// Subsequent packet requesting hash-only output (wallet debug)
    HashOnlyNext = 0x03,
}

/// Decoded `P1` packet control byte
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PacketControl {
    /// Packet kind
    pub kind: PacketKind,
    /// Set on the final packet of a request
    pub last: bool,
}

impl PacketControl {
    /// Create a new packet control object
    pub const fn new(kind: PacketKind, last: bool) -> Self {
        Self { kind, last }
    }

    /// Parse packet control from the `P1` byte
    pub fn parse(p1: u8) -> Result<Self, ApduError> {
        let last = p1 & P1_LAST_MARKER != 0;
        let kind =
            PacketKind::try_from(p1 & !P1_LAST_MARKER).map_err(|_| ApduError::InvalidEncoding)?;

        Ok(Self { kind, last })
    }

    /// Encode packet control to a `P1` byte
    pub fn p1(&self) -> u8 {
        match self.last {
            true => self.kind as u8 | P1_LAST_MARKER,
            false => self.kind as u8,
        }
    }
}
