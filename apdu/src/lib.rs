// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / APDU definitions for Tezos wallet and baking app communication
//!
//! This module provides a protocol specification and reference implementation for
//! communication with Tezos hardware wallets, in both wallet and baking configurations.
//!
//! Operations are signed by streaming the operation bytes over a sequence of
//! [`Instruction::Sign`] packets, the first of which carries the derivation path
//! and curve (see [`path::KeyPath`]) and subsequent packets carry raw operation bytes.
//! Packet sequencing is encoded in the `P1` byte (see [`packet::PacketControl`]).
//!
//! Unlike the general APDU conventions used elsewhere, multi-byte integers on this
//! protocol are _big-endian_ to match the on-chain operation encoding.
//!

#![no_std]

pub use ledger_proto::{ApduError, ApduReq, ApduStatic};

pub mod baking;
pub mod packet;
pub mod path;
pub mod prelude;
pub mod sign;
pub mod status;

/// Tezos APDU Class
pub const TZ_APDU_CLA: u8 = 0x80;

/// Largest accepted command payload
pub const MAX_CHUNK_SIZE: usize = 235;

/// Tezos APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum Instruction {
    /// Authorize a baking key (baking mode)
    AuthorizeBaking = 0x01,

    /// Fetch a public key
    GetPublicKey = 0x02,

    /// Sign an operation, returning the signature
    Sign = 0x04,

    /// Sign raw (unhashed) bytes (wallet mode)
    SignUnsafe = 0x05,

    /// Reset the high-water mark (baking mode)
    ResetHighWaterMark = 0x06,

    /// Fetch the authorized baking key (baking mode)
    QueryAuthKey = 0x07,

    /// Fetch the high-water mark (baking mode)
    QueryHighWaterMark = 0x08,

    /// Sign an operation, returning the operation hash and signature
    SignWithHash = 0x0f,
}
