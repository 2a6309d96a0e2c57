// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Tezos hardware wallet / baking signing core
//!
//! This provides a common [Engine][engine] supporting operation signing for
//! execution on hardware wallets, in either [wallet][engine::Mode::Wallet] or
//! [baking][engine::Mode::Baking] configurations.
//!
//! Request APDUs are passed to [`Engine::handle_apdu`][engine::Engine::handle_apdu], which
//! decodes them to [Event][engine::Event]s and returns [Output][engine::Output]s,
//! see [ledger_tz_apdu] for APDU objects and wire encodings.
//!
//! ## Operations
//!
//! ### Signing an operation
//!
//! 1. Issue a [`SignFirst`][ledger_tz_apdu::sign::SignFirst] packet carrying the
//!    derivation path and curve for the signing key
//! 2. Stream operation bytes via [`SignNext`][ledger_tz_apdu::sign::SignNext] packets,
//!    setting the `LAST` marker on the final packet
//! 3. The final packet returns [`Output::Pending`][engine::Output::Pending] while the
//!    operator reviews the [`Prompt`][engine::Prompt], resolved via
//!    [`Engine::confirm`][engine::Engine::confirm] or [`Engine::reject`][engine::Engine::reject]
//! 4. On confirmation a [`SignResp`][ledger_tz_apdu::sign::SignResp] is returned
//!    containing the signature (and the operation hash for `SignWithHash` requests)
//!
//! In baking mode blocks and endorsements are signed without operator
//! interaction, subject to the authorized key and high-water mark checks
//! provided by [`BakingAuth`][engine::auth::BakingAuth].
//!
//! ### Public keys
//!
//! [`GetPublicKeyReq`][ledger_tz_apdu::baking::GetPublicKeyReq] returns the public key for
//! a derivation path in either mode, following operator confirmation unless disabled via
//! [`Config::without_public_key_prompt`][engine::Config::without_public_key_prompt].
//!
//! ### Baking key management
//!
//! - [`AuthorizeBakingReq`][ledger_tz_apdu::baking::AuthorizeBakingReq] binds a key for baking
//!   following operator confirmation
//! - [`ResetReq`][ledger_tz_apdu::baking::ResetReq] resets the high-water mark following
//!   operator confirmation
//! - [`QueryAuthKeyReq`][ledger_tz_apdu::baking::QueryAuthKeyReq] and
//!   [`QueryHighWaterMarkReq`][ledger_tz_apdu::baking::QueryHighWaterMarkReq]
//!   fetch the persisted baking state
//!

#![cfg_attr(not(feature = "std"), no_std)]

pub use ledger_tz_apdu::{self as apdu};

pub mod engine;
