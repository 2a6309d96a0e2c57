// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Public key, baking key authorization and high-water mark APDUs
//!

use byteorder::{BigEndian, ByteOrder};
use encdec::{Decode, DecodeOwned, Encode};

use crate::{path::KeyPath, ApduError, ApduStatic, Instruction, TZ_APDU_CLA};

/// Maximum public key length (uncompressed ECDSA points are 65 bytes)
pub const MAX_PUBLIC_KEY_SIZE: usize = 65;

/// Fetch the public key for a derivation path, following operator
/// confirmation where enabled. Returns a [`PublicKeyResp`].
///
/// Encoded as a [`KeyPath`], `P1` must be zero.
#[derive(Clone, PartialEq, Debug)]
pub struct GetPublicKeyReq {
    /// Key to be fetched
    pub key: KeyPath,
}

impl GetPublicKeyReq {
    /// Create a new [`GetPublicKeyReq`] APDU
    pub fn new(key: KeyPath) -> Self {
        Self { key }
    }
}

impl ApduStatic for GetPublicKeyReq {
    const CLA: u8 = TZ_APDU_CLA;
    const INS: u8 = Instruction::GetPublicKey as u8;
}

impl Encode for GetPublicKeyReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        self.key.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        self.key.encode(buff)
    }
}

impl DecodeOwned for GetPublicKeyReq {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self, usize), ApduError> {
        let (key, n) = KeyPath::decode_owned(buff)?;
        Ok((Self { key }, n))
    }
}

/// Authorize a key for baking, following operator confirmation
/// returns a [`PublicKeyResp`] for the authorized key.
///
/// Encoded as a [`KeyPath`].
#[derive(Clone, PartialEq, Debug)]
pub struct AuthorizeBakingReq {
    /// Key to be authorized
    pub key: KeyPath,
}

impl AuthorizeBakingReq {
    /// Create a new [`AuthorizeBakingReq`] APDU
    pub fn new(key: KeyPath) -> Self {
        Self { key }
    }
}

impl ApduStatic for AuthorizeBakingReq {
    const CLA: u8 = TZ_APDU_CLA;
    const INS: u8 = Instruction::AuthorizeBaking as u8;
}

impl Encode for AuthorizeBakingReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        self.key.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        self.key.encode(buff)
    }
}

impl DecodeOwned for AuthorizeBakingReq {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self, usize), ApduError> {
        let (key, n) = KeyPath::decode_owned(buff)?;
        Ok((Self { key }, n))
    }
}

/// Public key response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     KEY_LEN   |                                               |
/// +-+-+-+-+-+-+-+-+                                               +
/// /                          PUBLIC_KEY                           /
/// /                       (variable length)                       /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct PublicKeyResp<'a> {
    /// Encoded public key
    pub public_key: &'a [u8],
}

impl<'a> Encode for PublicKeyResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1 + self.public_key.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let d = self.public_key;

        if d.len() > MAX_PUBLIC_KEY_SIZE || buff.len() < d.len() + 1 {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = d.len() as u8;
        buff[1..][..d.len()].copy_from_slice(d);

        Ok(1 + d.len())
    }
}

impl<'a> Decode<'a> for PublicKeyResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let n = buff[0] as usize;
        if buff.len() < 1 + n {
            return Err(ApduError::InvalidLength);
        }

        Ok((
            Self {
                public_key: &buff[1..][..n],
            },
            1 + n,
        ))
    }
}

/// Reset the high-water mark to the provided level,
/// following operator confirmation.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     LEVEL (u32, big-endian)                   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ResetReq {
    /// New high-water mark level
    pub level: u32,
}

impl ApduStatic for ResetReq {
    const CLA: u8 = TZ_APDU_CLA;
    const INS: u8 = Instruction::ResetHighWaterMark as u8;
}

impl Encode for ResetReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u32(buff, self.level);

        Ok(4)
    }
}

impl DecodeOwned for ResetReq {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self, usize), ApduError> {
        // Level is the whole payload
        if buff.len() != 4 {
            return Err(ApduError::InvalidLength);
        }

        Ok((
            Self {
                level: BigEndian::read_u32(buff),
            },
            4,
        ))
    }
}

/// Fetch the authorized baking key, returns [`AuthKeyResp`]
#[derive(Copy, Clone, Debug, PartialEq, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct QueryAuthKeyReq;

impl ApduStatic for QueryAuthKeyReq {
    const CLA: u8 = TZ_APDU_CLA;
    const INS: u8 = Instruction::QueryAuthKey as u8;
}

/// Authorized baking key response
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     CURVE     |   PATH_LEN    |                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
/// /              PATH_LEN x 4-byte big-endian INDEX               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// `PATH_LEN` is zero (and `CURVE` ignored) where no key is authorized.
#[derive(Clone, PartialEq, Debug)]
pub struct AuthKeyResp {
    /// Authorized key, if set
    pub key: Option<KeyPath>,
}

impl Encode for AuthKeyResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(2 + self.key.as_ref().map(|k| k.path.len() * 4).unwrap_or(0))
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let key = match &self.key {
            Some(k) => k,
            None => {
                buff[..2].copy_from_slice(&[0, 0]);
                return Ok(2);
            }
        };

        let mut index = 0;

        buff[index] = key.curve as u8;
        index += 1;

        buff[index] = key.path.len() as u8;
        index += 1;

        for p in key.path.iter() {
            BigEndian::write_u32(&mut buff[index..], *p);
            index += 4;
        }

        Ok(index)
    }
}

impl DecodeOwned for AuthKeyResp {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self, usize), ApduError> {
        if buff.len() < 2 {
            return Err(ApduError::InvalidLength);
        }

        let path_len = buff[1] as usize;
        if path_len == 0 {
            return Ok((Self { key: None }, 2));
        }

        // Re-order into the `KeyPath` wire layout
        let mut b = [0u8; 2 + 4 * crate::path::MAX_BIP32_PATH];
        if path_len > crate::path::MAX_BIP32_PATH || buff.len() < 2 + path_len * 4 {
            return Err(ApduError::InvalidLength);
        }

        b[0] = buff[1];
        b[1..][..path_len * 4].copy_from_slice(&buff[2..][..path_len * 4]);
        b[1 + path_len * 4] = buff[0];

        let (key, _) = KeyPath::decode_owned(&b[..2 + path_len * 4])?;

        Ok((Self { key: Some(key) }, 2 + path_len * 4))
    }
}

/// Fetch the current high-water mark, returns [`HighWaterMarkResp`]
#[derive(Copy, Clone, Debug, PartialEq, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct QueryHighWaterMarkReq;

impl ApduStatic for QueryHighWaterMarkReq {
    const CLA: u8 = TZ_APDU_CLA;
    const INS: u8 = Instruction::QueryHighWaterMark as u8;
}

/// High-water mark response
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                 HIGHEST_LEVEL (u32, big-endian)               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | ENDORSEMENT   |
/// +-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct HighWaterMarkResp {
    /// Highest signed level
    pub level: u32,
    /// Whether an endorsement has been signed at `level`
    pub had_endorsement: bool,
}

impl Encode for HighWaterMarkResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(5)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 5 {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u32(buff, self.level);
        buff[4] = self.had_endorsement as u8;

        Ok(5)
    }
}

impl DecodeOwned for HighWaterMarkResp {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self, usize), ApduError> {
        if buff.len() < 5 {
            return Err(ApduError::InvalidLength);
        }

        Ok((
            Self {
                level: BigEndian::read_u32(buff),
                had_endorsement: buff[4] != 0,
            },
            5,
        ))
    }
}
