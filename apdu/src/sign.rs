// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Operation signing APDUs
//!
//! A signing request is a [`SignFirst`] packet (derivation path and curve)
//! followed by one or more [`SignNext`] packets carrying raw operation bytes,
//! the final packet having the `LAST` marker set (see [PacketControl]).
//!
//! The final packet returns a [`SignResp`], containing the 32-byte operation hash
//! for [`Instruction::SignWithHash`] requests, followed by the signature.

use encdec::{Decode, DecodeOwned, Encode};

use crate::{
    packet::{PacketControl, PacketKind},
    path::KeyPath,
    ApduError, ApduStatic, Instruction, TZ_APDU_CLA,
};

/// Size of the operation hash
pub const SIGN_HASH_SIZE: usize = 32;

/// Maximum signature length (DER encoded ECDSA signatures are variable length)
pub const MAX_SIGNATURE_SIZE: usize = 100;

/// First signing packet, carrying the signing key
///
/// The same encoding is used for `Sign`, `SignWithHash` and `SignUnsafe`
/// requests, only the instruction byte differs.
#[derive(Clone, PartialEq, Debug)]
pub struct SignFirst {
    /// Signing key
    pub key: KeyPath,
}

impl SignFirst {
    /// Create a new [`SignFirst`] packet
    pub fn new(key: KeyPath) -> Self {
        Self { key }
    }

    /// Packet control for `P1`
    pub fn control(&self) -> PacketControl {
        PacketControl::new(PacketKind::First, false)
    }
}

impl ApduStatic for SignFirst {
    const CLA: u8 = TZ_APDU_CLA;
    const INS: u8 = Instruction::Sign as u8;
}

impl Encode for SignFirst {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        self.key.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        self.key.encode(buff)
    }
}

/// Subsequent signing packet, carrying raw operation bytes
#[derive(Clone, PartialEq, Debug)]
pub struct SignNext<'a> {
    /// Packet control (kind and `LAST` marker)
    pub control: PacketControl,
    /// Operation bytes
    pub data: &'a [u8],
}

impl<'a> SignNext<'a> {
    /// Create a new [`SignNext`] packet
    pub fn new(last: bool, data: &'a [u8]) -> Self {
        Self {
            control: PacketControl::new(PacketKind::Next, last),
            data,
        }
    }

    /// Packet control for `P1`
    pub fn control(&self) -> PacketControl {
        self.control
    }
}

impl<'a> ApduStatic for SignNext<'a> {
    const CLA: u8 = TZ_APDU_CLA;
    const INS: u8 = Instruction::Sign as u8;
}

impl<'a> Encode for SignNext<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.data.len() {
            return Err(ApduError::InvalidLength);
        }

        buff[..self.data.len()].copy_from_slice(self.data);

        Ok(self.data.len())
    }
}

/// Signing response
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// /                         OPERATION_HASH                        /
/// /              (32-byte, only for `SignWithHash`)               /
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// /                           SIGNATURE                           /
/// /        (64-byte ed25519 or variable length DER ECDSA)         /
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct SignResp<'a> {
    /// Operation hash, if requested
    pub hash: Option<[u8; SIGN_HASH_SIZE]>,
    /// Signature bytes
    pub signature: &'a [u8],
}

impl<'a> SignResp<'a> {
    /// Decode a signing response, with or without the leading operation hash
    pub fn decode_with(buff: &'a [u8], with_hash: bool) -> Result<Self, ApduError> {
        if !with_hash {
            return Ok(Self {
                hash: None,
                signature: buff,
            });
        }

        if buff.len() < SIGN_HASH_SIZE {
            return Err(ApduError::InvalidLength);
        }

        let mut hash = [0u8; SIGN_HASH_SIZE];
        hash.copy_from_slice(&buff[..SIGN_HASH_SIZE]);

        Ok(Self {
            hash: Some(hash),
            signature: &buff[SIGN_HASH_SIZE..],
        })
    }
}

impl<'a> Encode for SignResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let h = self.hash.map(|_| SIGN_HASH_SIZE).unwrap_or(0);
        Ok(h + self.signature.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;

        if let Some(h) = &self.hash {
            buff[..SIGN_HASH_SIZE].copy_from_slice(h);
            index += SIGN_HASH_SIZE;
        }

        buff[index..][..self.signature.len()].copy_from_slice(self.signature);
        index += self.signature.len();

        Ok(index)
    }
}

impl<'a> Decode<'a> for SignResp<'a> {
    type Output = Self;
    type Error = ApduError;

    /// Decode a [`SignResp`] without hash, see [`SignResp::decode_with`]
    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        Self::decode_with(buff, false).map(|r| (r, buff.len()))
    }
}

/// Decode helper for the key carried in a [`SignFirst`] packet
pub fn decode_first(buff: &[u8]) -> Result<(KeyPath, usize), ApduError> {
    KeyPath::decode_owned(buff)
}
