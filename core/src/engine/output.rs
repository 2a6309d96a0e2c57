// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::Encode;
use heapless::Vec;

use ledger_proto::ApduError;
use ledger_tz_apdu::{
    baking::{AuthKeyResp, HighWaterMarkResp, PublicKeyResp, MAX_PUBLIC_KEY_SIZE},
    path::KeyPath,
    sign::{SignResp, MAX_SIGNATURE_SIZE, SIGN_HASH_SIZE},
    status::StatusWord,
};

/// [`Engine`][super::Engine] outputs (in response to events), typically encoded to response [APDUs][crate::apdu]
#[derive(Clone, PartialEq, Debug)]
pub enum Output {
    /// Empty success response
    None,

    /// Operation signature, prefixed by the operation hash where requested
    Signature {
        hash: Option<[u8; SIGN_HASH_SIZE]>,
        signature: Vec<u8, MAX_SIGNATURE_SIZE>,
    },

    /// Operation hash only (signing skipped)
    Hash([u8; SIGN_HASH_SIZE]),

    /// Public key for an authorized baking key
    PublicKey(Vec<u8, MAX_PUBLIC_KEY_SIZE>),

    /// Authorized baking key
    AuthKey(Option<KeyPath>),

    /// High-water mark
    HighWaterMark { level: u32, had_endorsement: bool },

    /// Indicate the device is waiting for operator input,
    /// no response is sent until the operation is confirmed or rejected
    Pending,

    /// Operation rejected by the operator
    Rejected,
}

impl Output {
    /// Encode an [`Output`] object to a response [APDU][crate::apdu]
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        match self {
            Output::None | Output::Pending | Output::Rejected => Ok(0),
            Output::Signature { hash, signature } => SignResp {
                hash: *hash,
                signature,
            }
            .encode(buff),
            Output::Hash(hash) => SignResp {
                hash: Some(*hash),
                signature: &[],
            }
            .encode(buff),
            Output::PublicKey(public_key) => PublicKeyResp { public_key }.encode(buff),
            Output::AuthKey(key) => AuthKeyResp { key: key.clone() }.encode(buff),
            Output::HighWaterMark {
                level,
                had_endorsement,
            } => HighWaterMarkResp {
                level: *level,
                had_endorsement: *had_endorsement,
            }
            .encode(buff),
        }
    }

    /// Fetch the status word for this output
    pub fn status(&self) -> StatusWord {
        match self {
            Output::Rejected => StatusWord::Rejected,
            _ => StatusWord::Ok,
        }
    }
}
