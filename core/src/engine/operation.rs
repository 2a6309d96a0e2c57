// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Operation classification and parsed operation types
//!
//! Operations are classified by their leading magic byte, baking payloads
//! (blocks and endorsements) are parsed here, while structured operation
//! groups are parsed by the platform [Driver][super::Driver] under a tag
//! allow-list selected by the engine [Mode][super::Mode].

use byteorder::{BigEndian, ByteOrder};
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::apdu::path::Curve;

use super::Mode;

/// Operation magic byte (leading discriminator)
#[derive(Copy, Clone, PartialEq, Eq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
#[repr(u8)]
pub enum MagicByte {
    /// Empty or unrecognised payload
    Invalid = 0x00,
    /// Block header
    Block = 0x01,
    /// Consensus operation (endorsement)
    Endorsement = 0x02,
    /// Generic operation
    UnsafeOp = 0x03,
    /// Generic operation (second generation)
    UnsafeOp2 = 0x04,
    /// Generic operation (third generation)
    UnsafeOp3 = 0x05,
}

impl MagicByte {
    /// Classify a payload by its leading byte
    pub fn classify(buff: &[u8]) -> Self {
        match buff.first() {
            Some(0x01) => MagicByte::Block,
            Some(0x02) => MagicByte::Endorsement,
            Some(0x03) => MagicByte::UnsafeOp,
            Some(0x04) => MagicByte::UnsafeOp2,
            Some(0x05) => MagicByte::UnsafeOp3,
            _ => MagicByte::Invalid,
        }
    }

    /// Check whether a payload kind is accepted in the provided mode
    pub fn is_allowed(&self, mode: Mode) -> bool {
        use MagicByte::*;

        match mode {
            Mode::Baking => matches!(self, Block | Endorsement | UnsafeOp),
            Mode::Wallet => matches!(self, UnsafeOp | UnsafeOp2 | UnsafeOp3),
        }
    }

    /// Check whether this is a baking payload (block or endorsement)
    pub fn is_baking(&self) -> bool {
        matches!(self, MagicByte::Block | MagicByte::Endorsement)
    }
}

/// Operation tags, two protocol generations of manager operations
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
pub enum OperationTag {
    /// No operation beyond a reveal
    None = 0,
    Proposal = 5,
    Ballot = 6,
    AthensReveal = 7,
    AthensTransaction = 8,
    AthensOrigination = 9,
    AthensDelegation = 10,
    BabylonReveal = 107,
    BabylonTransaction = 108,
    BabylonOrigination = 109,
    BabylonDelegation = 110,
}

impl OperationTag {
    pub fn is_reveal(&self) -> bool {
        matches!(
            self,
            OperationTag::None | OperationTag::AthensReveal | OperationTag::BabylonReveal
        )
    }

    pub fn is_delegation(&self) -> bool {
        matches!(
            self,
            OperationTag::AthensDelegation | OperationTag::BabylonDelegation
        )
    }

    pub fn is_origination(&self) -> bool {
        matches!(
            self,
            OperationTag::AthensOrigination | OperationTag::BabylonOrigination
        )
    }

    pub fn is_transaction(&self) -> bool {
        matches!(
            self,
            OperationTag::AthensTransaction | OperationTag::BabylonTransaction
        )
    }
}

/// Operation allow-list for baking mode, reveals and delegations only
pub fn is_baking_operation_allowed(tag: OperationTag) -> bool {
    use OperationTag::*;

    matches!(
        tag,
        AthensReveal | AthensDelegation | BabylonReveal | BabylonDelegation
    )
}

/// Operation allow-list for wallet mode
pub fn is_wallet_operation_allowed(tag: OperationTag) -> bool {
    use OperationTag::*;

    is_baking_operation_allowed(tag)
        || matches!(
            tag,
            Proposal
                | Ballot
                | AthensOrigination
                | AthensTransaction
                | BabylonOrigination
                | BabylonTransaction
        )
}

/// Fetch the operation allow-list for a given mode
pub fn operation_allow_list(mode: Mode) -> fn(OperationTag) -> bool {
    match mode {
        Mode::Baking => is_baking_operation_allowed,
        Mode::Wallet => is_wallet_operation_allowed,
    }
}

/// Check a level is well formed (top two bits reserved)
pub const fn is_valid_level(level: u32) -> bool {
    level & 0xC000_0000 == 0
}

/// Block / endorsement data, parsed from baking payloads
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ParsedBakingData {
    /// Chain identifier (not validated)
    pub chain_id: [u8; 4],
    /// Block level
    pub level: u32,
    /// Set for endorsements
    pub is_endorsement: bool,
}

/// Block header prefix, `[magic][chain_id:4][level:4][proto:1]`
const BLOCK_MIN_LEN: usize = 10;

/// Endorsement, `[magic][chain_id:4][branch:32][tag:1][level:4]`,
/// the tag is not checked
const ENDORSEMENT_LEN: usize = 42;

/// Parse a block or endorsement payload, returning `None` for malformed input
pub fn parse_baking_data(buff: &[u8]) -> Option<ParsedBakingData> {
    let mut chain_id = [0u8; 4];

    match MagicByte::classify(buff) {
        MagicByte::Block if buff.len() >= BLOCK_MIN_LEN => {
            chain_id.copy_from_slice(&buff[1..5]);
            Some(ParsedBakingData {
                chain_id,
                level: BigEndian::read_u32(&buff[5..9]),
                is_endorsement: false,
            })
        }
        MagicByte::Endorsement if buff.len() == ENDORSEMENT_LEN => {
            chain_id.copy_from_slice(&buff[1..5]);
            Some(ParsedBakingData {
                chain_id,
                level: BigEndian::read_u32(&buff[38..42]),
                is_endorsement: true,
            })
        }
        _ => None,
    }
}

/// Contract (account) identifier
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ParsedContract {
    /// Set for originated (KT1) contracts
    pub originated: bool,
    /// Signature curve for implicit accounts
    pub curve: Option<Curve>,
    /// Public key or contract hash
    pub hash: [u8; 20],
}

bitflags::bitflags! {
    /// Origination flags
    pub struct OriginationFlags: u8 {
        /// Originated contract is spendable by the manager
        const SPENDABLE = 1 << 0;
        /// Originated contract delegate may be changed
        const DELEGATABLE = 1 << 1;
    }
}

/// Ballot vote
#[derive(Copy, Clone, PartialEq, Eq, Debug, EnumString, Display, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum Vote {
    Yea = 0,
    Nay = 1,
    Pass = 2,
}

/// Governance proposal / ballot fields
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Governance {
    pub voting_period: u32,
    pub protocol_hash: [u8; 32],
    /// Set for ballots
    pub vote: Option<Vote>,
}

/// Primary operation from an operation group
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ParsedOperation {
    pub tag: OperationTag,
    pub source: ParsedContract,
    /// Destination / delegate (`None` for withdrawals)
    pub destination: Option<ParsedContract>,
    /// Origination delegate
    pub delegate: Option<ParsedContract>,
    /// Amount in mutez
    pub amount: u64,
    pub flags: OriginationFlags,
    /// Operation generated by the `manager.tz` contract
    pub is_manager_tz_operation: bool,
    pub governance: Option<Governance>,
}

/// Parsed operation group
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ParsedOperationGroup {
    /// Identity derived from the signing key
    pub signing: ParsedContract,
    pub operation: ParsedOperation,
    /// Total fee in mutez
    pub total_fee: u64,
    pub total_storage_limit: u64,
}

impl ParsedOperationGroup {
    /// Check whether this is a delegation from the signing key to itself
    pub fn is_self_delegation(&self) -> bool {
        self.operation.tag.is_delegation()
            && self.operation.source == self.signing
            && self.operation.destination == Some(self.signing)
    }
}

/// Session parse result
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum ParseResult {
    /// No parse, or parse failed
    #[default]
    Invalid,
    /// Valid operation group
    Operations(ParsedOperationGroup),
    /// Valid block / endorsement
    Baking(ParsedBakingData),
}

impl ParseResult {
    pub fn is_valid(&self) -> bool {
        !matches!(self, ParseResult::Invalid)
    }
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;

    use super::*;

    fn block(level: u32) -> [u8; 12] {
        let mut b = [0u8; 12];
        b[0] = MagicByte::Block as u8;
        b[1..5].copy_from_slice(&[0x7a, 0x06, 0xa7, 0x70]);
        BigEndian::write_u32(&mut b[5..9], level);
        b
    }

    fn endorsement(level: u32) -> [u8; ENDORSEMENT_LEN] {
        let mut b = [0u8; ENDORSEMENT_LEN];
        b[0] = MagicByte::Endorsement as u8;
        BigEndian::write_u32(&mut b[38..], level);
        b
    }

    #[test]
    fn classify_magic_bytes() {
        assert_eq!(MagicByte::classify(&[]), MagicByte::Invalid);
        assert_eq!(MagicByte::classify(&[0x00, 0x01]), MagicByte::Invalid);
        assert_eq!(MagicByte::classify(&[0x06]), MagicByte::Invalid);

        for m in MagicByte::iter().filter(|m| *m != MagicByte::Invalid) {
            assert_eq!(MagicByte::classify(&[m as u8, 0xff]), m);
        }
    }

    #[test]
    fn magic_bytes_by_mode() {
        use MagicByte::*;

        let baking: std::vec::Vec<_> = MagicByte::iter()
            .filter(|m| m.is_allowed(Mode::Baking))
            .collect();
        assert_eq!(baking, &[Block, Endorsement, UnsafeOp]);

        let wallet: std::vec::Vec<_> = MagicByte::iter()
            .filter(|m| m.is_allowed(Mode::Wallet))
            .collect();
        assert_eq!(wallet, &[UnsafeOp, UnsafeOp2, UnsafeOp3]);

        let signed: std::vec::Vec<_> = MagicByte::iter().filter(|m| m.is_baking()).collect();
        assert_eq!(signed, &[Block, Endorsement]);
    }

    #[test]
    fn operation_allow_lists() {
        for t in OperationTag::iter() {
            let baking = t.is_delegation()
                || matches!(t, OperationTag::AthensReveal | OperationTag::BabylonReveal);
            assert_eq!(
                is_baking_operation_allowed(t),
                baking,
                "baking allow-list for {t}"
            );

            // Wallet allow-list is a superset of the baking allow-list
            let wallet = t != OperationTag::None;
            assert_eq!(is_wallet_operation_allowed(t), wallet, "wallet allow-list for {t}");

            assert_eq!(operation_allow_list(Mode::Baking)(t), baking);
            assert_eq!(operation_allow_list(Mode::Wallet)(t), wallet);
        }
    }

    #[test]
    fn parse_blocks() {
        let b = block(500);
        let d = parse_baking_data(&b).unwrap();
        assert_eq!(d.level, 500);
        assert!(!d.is_endorsement);
        assert_eq!(d.chain_id, [0x7a, 0x06, 0xa7, 0x70]);

        // Truncated header
        assert_eq!(parse_baking_data(&b[..9]), None);
    }

    #[test]
    fn parse_endorsements() {
        let e = endorsement(501);
        let d = parse_baking_data(&e).unwrap();
        assert_eq!(d.level, 501);
        assert!(d.is_endorsement);

        // Endorsements are fixed length
        assert_eq!(parse_baking_data(&e[..41]), None);

        let mut long = [0u8; ENDORSEMENT_LEN + 1];
        long[..ENDORSEMENT_LEN].copy_from_slice(&e);
        assert_eq!(parse_baking_data(&long), None);

        // Operation tag is passed through
        let mut tagged = e;
        tagged[37] = 0x15;
        assert_eq!(parse_baking_data(&tagged), Some(d));
    }

    #[test]
    fn level_validity() {
        assert!(is_valid_level(0));
        assert!(is_valid_level(0x3fff_ffff));
        assert!(!is_valid_level(0x4000_0000));
        assert!(!is_valid_level(0x8000_0000));
    }
}
