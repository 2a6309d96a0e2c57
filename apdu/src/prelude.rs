// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    baking::{
        AuthKeyResp, AuthorizeBakingReq, GetPublicKeyReq, HighWaterMarkResp, PublicKeyResp,
        QueryAuthKeyReq, QueryHighWaterMarkReq, ResetReq,
    },
    packet::{PacketControl, PacketKind},
    path::{Curve, KeyPath},
    sign::{SignFirst, SignNext, SignResp},
    status::StatusWord,
    Instruction,
};
