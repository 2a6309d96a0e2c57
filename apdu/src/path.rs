// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Derivation path and curve encodings
//!

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};
use heapless::Vec;
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::ApduError;

/// Maximum derivation path depth
pub const MAX_BIP32_PATH: usize = 10;

/// Hardened derivation index bit
pub const HARDENED: u32 = 1 << 31;

/// Bounded BIP-0032 derivation path
pub type Bip32Path = Vec<u32, MAX_BIP32_PATH>;

/// Signing curve selector
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    EnumString,
    Display,
    EnumVariantNames,
    EnumIter,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum Curve {
    Ed25519 = 0x00,
    Secp256k1 = 0x01,
    Secp256r1 = 0x02,
}

impl Curve {
    /// ECDSA curves produce variable length signatures with a recovery parity bit
    pub fn is_ecdsa(&self) -> bool {
        matches!(self, Curve::Secp256k1 | Curve::Secp256r1)
    }
}

/// Key identifier, a curve and derivation path pair
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   PATH_LEN    |                                               |
/// +-+-+-+-+-+-+-+-+                                               +
/// /               PATH_LEN x 4-byte big-endian INDEX              /
/// +               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |               |     CURVE     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct KeyPath {
    /// Signing curve
    pub curve: Curve,
    /// Derivation path (1..=[MAX_BIP32_PATH] entries)
    pub path: Bip32Path,
}

impl KeyPath {
    /// Create a new [KeyPath], failing if the path is empty or too deep
    pub fn new(curve: Curve, path: &[u32]) -> Result<Self, ApduError> {
        if path.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let path = Vec::from_slice(path).map_err(|_| ApduError::InvalidLength)?;

        Ok(Self { curve, path })
    }

    /// Fetch derivation path
    pub fn path(&self) -> &[u32] {
        &self.path
    }
}

impl Encode for KeyPath {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(2 + self.path.len() * 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;

        buff[index] = self.path.len() as u8;
        index += 1;

        for p in self.path.iter() {
            BigEndian::write_u32(&mut buff[index..], *p);
            index += 4;
        }

        buff[index] = self.curve as u8;
        index += 1;

        Ok(index)
    }
}

impl DecodeOwned for KeyPath {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let mut index = 0;

        // Check header length
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        // Read and bound path length
        let path_len = buff[index] as usize;
        index += 1;

        if path_len == 0 || path_len > MAX_BIP32_PATH {
            return Err(ApduError::InvalidLength);
        }

        // Check full buffer length
        if buff.len() < 1 + path_len * 4 + 1 {
            return Err(ApduError::InvalidLength);
        }

        let mut path = Bip32Path::new();
        for _ in 0..path_len {
            // Cannot overflow, length is bounded above
            let _ = path.push(BigEndian::read_u32(&buff[index..]));
            index += 4;
        }

        let curve = Curve::try_from(buff[index]).map_err(|_| ApduError::InvalidEncoding)?;
        index += 1;

        Ok((Self { curve, path }, index))
    }
}

/// Display [KeyPath] as `curve:m/44'/1729'/...`
impl core::fmt::Display for KeyPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:m", self.curve)?;
        for p in self.path.iter() {
            match p & HARDENED != 0 {
                true => write!(f, "/{}'", p & !HARDENED)?,
                false => write!(f, "/{p}")?,
            }
        }
        Ok(())
    }
}
