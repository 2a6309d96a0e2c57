// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Baking mode classification and signing policy
//!
//! Blocks and endorsements are signed without operator interaction, subject
//! to the [BakingAuth] guard. The only other operation a baking key may sign
//! is a confirmed self-delegation, used to register as a delegate.

use super::{
    auth::{BakingAuth, Nvram},
    operation::{operation_allow_list, parse_baking_data, MagicByte, ParseResult},
    sign, Completion, Driver, Error, Mode, Pending, Prompt, SigningSession,
};

/// Classify and parse a baking operation, which must fit in a single packet
pub(crate) fn classify<DRV: Driver>(
    session: &mut SigningSession,
    index: u8,
    data: &[u8],
    drv: &DRV,
) -> Result<(), Error> {
    if index != 1 {
        #[cfg(feature = "log")]
        log::warn!("baking operations must fit in one packet");

        return Err(Error::ParseError);
    }

    let magic = MagicByte::classify(data);
    if !magic.is_allowed(Mode::Baking) {
        #[cfg(feature = "log")]
        log::warn!("unsupported operation kind: {}", magic);

        return Err(Error::ParseError);
    }

    // Chain identifiers are not checked
    let parse = if magic.is_baking() {
        parse_baking_data(data).map(ParseResult::Baking)
    } else {
        drv.parse_operations(data, session.key(), operation_allow_list(Mode::Baking))
            .map(ParseResult::Operations)
    }
    .unwrap_or_default();

    #[cfg(feature = "log")]
    log::debug!("classified {} (parsed: {})", magic, parse.is_valid());

    session.set_classification(magic, parse);

    Ok(())
}

/// Guard and complete a baking session.
///
/// Blocks and endorsements are guarded, signed, then recorded against the
/// high-water mark. Self-delegations are guarded then await confirmation.
#[cfg_attr(feature = "noinline", inline(never))]
pub(crate) fn complete<DRV: Driver, NVM: Nvram>(
    session: SigningSession,
    auth: &mut BakingAuth<NVM>,
    drv: &DRV,
) -> Result<Completion, Error> {
    match session.magic() {
        m if m.is_baking() => {
            let data = match session.parse() {
                ParseResult::Baking(d) => Some(*d),
                _ => None,
            };

            auth.guard_baking(session.key(), data.as_ref())?;
            let data = data.ok_or(Error::SecurityError)?;

            // The mark only advances once a signature exists
            let out = sign::finalize(session, drv)?;
            auth.record_success(&data)?;

            Ok(Completion::Signed(out))
        }
        MagicByte::UnsafeOp => {
            let ops = match session.parse() {
                ParseResult::Operations(ops) => *ops,
                _ => return Err(Error::ParseError),
            };

            auth.guard_self_delegation(session.key(), &ops)?;

            Ok(Completion::Confirm(Pending::sign(
                Prompt::register_delegate(&ops),
                session,
            )))
        }
        _ => Err(Error::ParseError),
    }
}
