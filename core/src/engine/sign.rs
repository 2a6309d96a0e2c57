// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signature finalisation

use heapless::Vec;

use crate::apdu::sign::MAX_SIGNATURE_SIZE;

use super::{Driver, Error, Output, SigningSession};

/// Sign a completed session, consuming (and zeroizing) the session.
///
/// Hashed sessions sign the operation hash, unhashed sessions the raw message.
/// Sessions flagged hash-only return the operation hash without signing.
#[cfg_attr(feature = "noinline", inline(never))]
pub(crate) fn finalize<DRV: Driver>(session: SigningSession, drv: &DRV) -> Result<Output, Error> {
    let hash = match (session.is_hashing(), session.final_hash()) {
        (true, Some(h)) => Some(*h),
        (true, None) => return Err(Error::MemoryError),
        (false, _) => None,
    };

    if let (Some(h), true) = (hash, session.hash_only()) {
        return Ok(Output::Hash(h));
    }

    let data = match &hash {
        Some(h) => &h[..],
        None => session.message(),
    };

    let mut signature = Vec::<u8, MAX_SIGNATURE_SIZE>::new();
    signature
        .resize(MAX_SIGNATURE_SIZE, 0)
        .map_err(|_| Error::MemoryError)?;

    let signed = drv.sign(session.key(), data, &mut signature)?;
    if signed.len == 0 || signed.len > MAX_SIGNATURE_SIZE {
        return Err(Error::MemoryError);
    }
    signature.truncate(signed.len);

    // Fold ECDSA parity into the leading signature byte
    if session.key().curve.is_ecdsa() && signed.parity_odd {
        signature[0] |= 0x01;
    }

    Ok(Output::Signature {
        hash: hash.filter(|_| session.emit_hash()),
        signature,
    })
}
