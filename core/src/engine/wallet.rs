// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wallet mode classification and confirmation policy
//!
//! Every wallet operation requires operator confirmation. Operations that
//! cannot be parsed (or span more than one packet) fall back to confirming
//! the operation hash.

use super::{
    operation::{operation_allow_list, MagicByte, ParseResult},
    Completion, Driver, Error, Mode, Pending, Prompt, SigningSession,
};

/// Classify and parse the operation header, carried in the first data packet
pub(crate) fn classify<DRV: Driver>(
    session: &mut SigningSession,
    index: u8,
    data: &[u8],
    drv: &DRV,
) -> Result<(), Error> {
    // Operations spanning multiple packets are not parsed
    if index != 1 {
        session.invalidate_parse();
        return Ok(());
    }

    let magic = MagicByte::classify(data);
    if !magic.is_allowed(Mode::Wallet) {
        #[cfg(feature = "log")]
        log::warn!("unsupported operation kind: {}", magic);

        return Err(Error::ParseError);
    }

    let allowed = operation_allow_list(Mode::Wallet);
    let parse = match drv.parse_operations(data, session.key(), allowed) {
        Some(ops) => ParseResult::Operations(ops),
        None => ParseResult::Invalid,
    };

    #[cfg(feature = "log")]
    log::debug!("classified {} (parsed: {})", magic, parse.is_valid());

    session.set_classification(magic, parse);

    Ok(())
}

/// Select the confirmation prompt for a completed session
#[cfg_attr(feature = "noinline", inline(never))]
pub(crate) fn complete(session: SigningSession) -> Result<Completion, Error> {
    // Raw signing confirms the message itself
    if !session.is_hashing() {
        return Ok(Completion::Confirm(Pending::sign(
            Prompt::pre_hashed(),
            session,
        )));
    }

    let hash = *session.final_hash().ok_or(Error::MemoryError)?;

    let prompt = match (session.magic(), session.parse()) {
        (MagicByte::UnsafeOp, ParseResult::Operations(ops)) => {
            Prompt::operation(ops).unwrap_or_else(|| Prompt::raw_hash(&hash))
        }
        (MagicByte::UnsafeOp | MagicByte::UnsafeOp2 | MagicByte::UnsafeOp3, _) => {
            Prompt::raw_hash(&hash)
        }
        _ => return Err(Error::ParseError),
    };

    Ok(Completion::Confirm(Pending::sign(prompt, session)))
}
