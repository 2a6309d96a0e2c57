// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::DecodeOwned;

use ledger_proto::ApduError;
use ledger_tz_apdu::{
    baking::ResetReq,
    packet::{PacketControl, PacketKind},
    path::KeyPath,
    sign::decode_first,
    Instruction, MAX_CHUNK_SIZE,
};

use super::{Error, Mode};

/// [`Engine`][super::Engine] input events, typically decoded from request [APDUs][crate::apdu]
#[derive(Clone, PartialEq, Debug)]
pub enum Event<'a> {
    None,

    /// Start a signing session
    SignFirst {
        ins: Instruction,
        key: KeyPath,
        control: PacketControl,
    },

    /// Append operation data to a signing session
    SignNext {
        ins: Instruction,
        control: PacketControl,
        data: &'a [u8],
    },

    /// Fetch a public key
    GetPublicKey { key: KeyPath },

    /// Authorize a baking key
    AuthorizeBaking { key: KeyPath },

    /// Reset the high-water mark
    ResetHighWaterMark { level: u32 },

    /// Fetch the authorized baking key
    QueryAuthKey,

    /// Fetch the high-water mark
    QueryHighWaterMark,
}

/// Decode a key path, mapping unknown curves to [Error::UnsupportedCurve]
fn decode_key(buff: &[u8]) -> Result<KeyPath, Error> {
    match decode_first(buff) {
        Ok((k, _n)) => Ok(k),
        Err(ApduError::InvalidEncoding) => Err(Error::UnsupportedCurve),
        Err(e) => Err(Error::from(e)),
    }
}

impl<'a> Event<'a> {
    /// Parse an incoming APDU (instruction, `P1` and payload) to an engine event
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn parse(ins: u8, p1: u8, buff: &'a [u8]) -> Result<Self, Error> {
        if buff.len() > MAX_CHUNK_SIZE {
            return Err(Error::WrongLength);
        }

        let ins = Instruction::try_from(ins).map_err(|_| Error::InvalidInstruction)?;

        let evt = match ins {
            Instruction::Sign | Instruction::SignWithHash | Instruction::SignUnsafe => {
                let control = PacketControl::parse(p1).map_err(|_| Error::WrongParameter)?;

                match control.kind {
                    PacketKind::First => Event::SignFirst {
                        ins,
                        key: decode_key(buff)?,
                        control,
                    },
                    PacketKind::Next | PacketKind::HashOnlyNext => Event::SignNext {
                        ins,
                        control,
                        data: buff,
                    },
                }
            }
            Instruction::GetPublicKey => {
                if p1 != 0 {
                    return Err(Error::WrongParameter);
                }
                Event::GetPublicKey {
                    key: decode_key(buff)?,
                }
            }
            Instruction::AuthorizeBaking => Event::AuthorizeBaking {
                key: decode_key(buff)?,
            },
            Instruction::ResetHighWaterMark => {
                let (r, _n) = ResetReq::decode_owned(buff)?;
                Event::ResetHighWaterMark { level: r.level }
            }
            Instruction::QueryAuthKey => Event::QueryAuthKey,
            Instruction::QueryHighWaterMark => Event::QueryHighWaterMark,
        };

        Ok(evt)
    }

    /// Check whether an event is available in the provided mode
    pub fn is_available(&self, mode: Mode) -> bool {
        match self {
            Event::None | Event::GetPublicKey { .. } => true,
            Event::SignFirst { ins, .. } | Event::SignNext { ins, .. } => {
                !(*ins == Instruction::SignUnsafe && mode == Mode::Baking)
            }
            Event::AuthorizeBaking { .. }
            | Event::ResetHighWaterMark { .. }
            | Event::QueryAuthKey
            | Event::QueryHighWaterMark => mode == Mode::Baking,
        }
    }

    /// Event name for logging (omits event data)
    pub fn name(&self) -> &'static str {
        match self {
            Event::None => "none",
            Event::SignFirst { .. } => "sign first",
            Event::SignNext { .. } => "sign next",
            Event::GetPublicKey { .. } => "get public key",
            Event::AuthorizeBaking { .. } => "authorize baking",
            Event::ResetHighWaterMark { .. } => "reset high-water mark",
            Event::QueryAuthKey => "query auth key",
            Event::QueryHighWaterMark => "query high-water mark",
        }
    }
}
