// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Operator confirmation prompts
//!
//! A [Prompt] is an ordered list of label / value [Field]s for display while
//! the engine awaits confirmation. Values carry the parsed fields, rendering
//! (base58, amounts) is left to the platform UI.

use heapless::Vec;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::apdu::{baking::MAX_PUBLIC_KEY_SIZE, sign::SIGN_HASH_SIZE};

use super::operation::{
    OperationTag, OriginationFlags, ParsedContract, ParsedOperationGroup, Vote,
};

/// Maximum number of fields per prompt
pub const MAX_PROMPT_FIELDS: usize = 7;

/// Prompt templates
#[derive(Copy, Clone, PartialEq, Eq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum PromptKind {
    /// Unparsed operation, confirm the operation hash
    RawHash,
    /// Raw (unsafe) signing, confirm the raw message
    PreHashed,
    Reveal,
    Delegation,
    Withdrawal,
    Origination,
    Transaction,
    Proposal,
    Ballot,
    /// Baking key self-delegation
    RegisterDelegate,
    /// Public key export
    ProvidePublicKey,
    AuthorizeBaking,
    ResetHighWaterMark,
}

/// Prompt field values
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Value {
    /// Static text
    Static(&'static str),
    /// Account / contract
    Contract(ParsedContract),
    /// Amount in mutez
    Amount(u64),
    Number(u64),
    Level(u32),
    ProtocolHash([u8; 32]),
    /// Operation hash
    Hash([u8; SIGN_HASH_SIZE]),
    /// The pending message (see [Pending::message][super::Pending::message])
    Message,
    PublicKey(Vec<u8, MAX_PUBLIC_KEY_SIZE>),
}

/// Prompt label / value pair
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Field {
    pub label: &'static str,
    pub value: Value,
}

/// Confirmation prompt
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Prompt {
    kind: PromptKind,
    fields: Vec<Field, MAX_PROMPT_FIELDS>,
}

impl Prompt {
    fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    /// Append a field, templates are bounded by [MAX_PROMPT_FIELDS]
    fn with(mut self, label: &'static str, value: Value) -> Self {
        let _ = self.fields.push(Field { label, value });
        self
    }

    /// Fetch prompt template kind
    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    /// Fetch prompt fields
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Fetch the value for a given label
    pub fn value(&self, label: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| &f.value)
    }

    /// Fallback prompt for unparsed operations
    pub fn raw_hash(hash: &[u8; SIGN_HASH_SIZE]) -> Self {
        Self::new(PromptKind::RawHash)
            .with("Unrecognized", Value::Static("Operation"))
            .with("Sign Hash", Value::Hash(*hash))
    }

    /// Prompt for raw (unsafe) signing
    pub fn pre_hashed() -> Self {
        Self::new(PromptKind::PreHashed)
            .with("Pre-hashed", Value::Static("Operation"))
            .with("Sign Hash", Value::Message)
    }

    /// Baking key delegate registration
    pub fn register_delegate(ops: &ParsedOperationGroup) -> Self {
        Self::new(PromptKind::RegisterDelegate)
            .with("Register", Value::Static("as delegate?"))
            .with("Address", Value::Contract(ops.signing))
            .with("Fee", Value::Amount(ops.total_fee))
    }

    /// Public key export
    pub fn provide_public_key(public_key: &[u8]) -> Self {
        let pk = Vec::from_slice(public_key).unwrap_or_default();

        Self::new(PromptKind::ProvidePublicKey)
            .with("Provide", Value::Static("Public Key?"))
            .with("Public Key", Value::PublicKey(pk))
    }

    /// Baking key authorization
    pub fn authorize_baking(public_key: &[u8]) -> Self {
        let pk = Vec::from_slice(public_key).unwrap_or_default();

        Self::new(PromptKind::AuthorizeBaking)
            .with("Authorize baking", Value::Static("With Public Key?"))
            .with("Public Key", Value::PublicKey(pk))
    }

    /// High-water mark reset
    pub fn reset(level: u32) -> Self {
        Self::new(PromptKind::ResetHighWaterMark).with("Reset HWM", Value::Level(level))
    }

    /// Select the prompt for a parsed operation group,
    /// returning `None` where the operation must fall back to [Prompt::raw_hash]
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn operation(ops: &ParsedOperationGroup) -> Option<Self> {
        let op = &ops.operation;

        let fee = Value::Amount(ops.total_fee);
        let storage = Value::Number(ops.total_storage_limit);
        let source = Value::Contract(op.source);
        let destination = match op.destination {
            Some(d) => Value::Contract(d),
            None => Value::Static("None"),
        };

        let p = match op.tag {
            t if t.is_reveal() => Self::new(PromptKind::Reveal)
                .with("Reveal Key", Value::Static("To Blockchain"))
                .with("Key", source)
                .with("Fee", fee)
                .with("Storage Limit", storage),

            OperationTag::Proposal => {
                let g = op.governance?;

                Self::new(PromptKind::Proposal)
                    .with("Confirm", Value::Static("Proposal"))
                    .with("Source", source)
                    .with("Period", Value::Number(g.voting_period as u64))
                    .with("Protocol", Value::ProtocolHash(g.protocol_hash))
            }

            OperationTag::Ballot => {
                let g = op.governance?;
                let vote = match g.vote? {
                    Vote::Yea => "Yea",
                    Vote::Nay => "Nay",
                    Vote::Pass => "Pass",
                };

                Self::new(PromptKind::Ballot)
                    .with("Confirm Vote", Value::Static(vote))
                    .with("Source", source)
                    .with("Protocol", Value::ProtocolHash(g.protocol_hash))
                    .with("Period", Value::Number(g.voting_period as u64))
            }

            t if t.is_origination() => {
                // Non-spendable originations are confirmed by hash
                if !op.flags.contains(OriginationFlags::SPENDABLE) {
                    return None;
                }

                let delegatable = op.flags.contains(OriginationFlags::DELEGATABLE);
                let (label, delegate) = match (delegatable, op.delegate) {
                    (true, Some(d)) => ("Delegate", Value::Contract(d)),
                    (true, None) => ("Delegate", Value::Static("Any")),
                    (false, Some(d)) => ("Fixed Delegate", Value::Contract(d)),
                    (false, None) => ("Delegation", Value::Static("Disabled")),
                };

                Self::new(PromptKind::Origination)
                    .with("Confirm", Value::Static("Origination"))
                    .with("Amount", Value::Amount(op.amount))
                    .with("Fee", fee)
                    .with("Source", source)
                    .with("Manager", destination)
                    .with(label, delegate)
                    .with("Storage Limit", storage)
            }

            t if t.is_delegation() => {
                let kind = match op.is_manager_tz_operation {
                    true => Value::Static("Mgr.tz Delegation"),
                    false => Value::Static("Delegation"),
                };

                // Delegations without a delegate are withdrawals
                let (p, title) = match op.destination {
                    None => (PromptKind::Withdrawal, "Withdraw"),
                    Some(_) => (PromptKind::Delegation, "Confirm"),
                };

                Self::new(p)
                    .with(title, kind)
                    .with("Fee", fee)
                    .with("Source", source)
                    .with("Delegate", destination)
                    .with("Storage Limit", storage)
            }

            t if t.is_transaction() => {
                let kind = match op.is_manager_tz_operation {
                    true => Value::Static("Mgr.tz Transaction"),
                    false => Value::Static("Transaction"),
                };

                Self::new(PromptKind::Transaction)
                    .with("Confirm", kind)
                    .with("Amount", Value::Amount(op.amount))
                    .with("Fee", fee)
                    .with("Source", source)
                    .with("Destination", destination)
                    .with("Storage Limit", storage)
            }

            _ => return None,
        };

        Some(p)
    }
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::{
        apdu::path::Curve,
        engine::operation::{Governance, ParsedOperation},
    };

    const SOURCE: ParsedContract = ParsedContract {
        originated: false,
        curve: Some(Curve::Ed25519),
        hash: [0x11; 20],
    };

    const DEST: ParsedContract = ParsedContract {
        originated: false,
        curve: Some(Curve::Secp256k1),
        hash: [0x22; 20],
    };

    fn ops(tag: OperationTag) -> ParsedOperationGroup {
        ParsedOperationGroup {
            signing: SOURCE,
            operation: ParsedOperation {
                tag,
                source: SOURCE,
                destination: Some(DEST),
                delegate: None,
                amount: 1_000_000,
                flags: OriginationFlags::SPENDABLE,
                is_manager_tz_operation: false,
                governance: Some(Governance {
                    voting_period: 12,
                    protocol_hash: [0x33; 32],
                    vote: Some(Vote::Nay),
                }),
            },
            total_fee: 1_420,
            total_storage_limit: 257,
        }
    }

    fn labels(p: &Prompt) -> std::vec::Vec<&'static str> {
        p.fields().iter().map(|f| f.label).collect()
    }

    #[test]
    fn operation_templates() {
        use OperationTag::*;

        let tests = &[
            (OperationTag::None, PromptKind::Reveal),
            (BabylonReveal, PromptKind::Reveal),
            (Proposal, PromptKind::Proposal),
            (Ballot, PromptKind::Ballot),
            (AthensOrigination, PromptKind::Origination),
            (BabylonOrigination, PromptKind::Origination),
            (AthensDelegation, PromptKind::Delegation),
            (BabylonDelegation, PromptKind::Delegation),
            (AthensTransaction, PromptKind::Transaction),
            (BabylonTransaction, PromptKind::Transaction),
        ];

        for (tag, kind) in tests {
            let p = Prompt::operation(&ops(*tag)).unwrap();
            assert_eq!(p.kind(), *kind, "template mismatch for {tag}");
        }
    }

    #[test]
    fn every_tag_selects_one_template() {
        for tag in OperationTag::iter() {
            let p = Prompt::operation(&ops(tag)).unwrap();
            assert!(p.fields().len() <= MAX_PROMPT_FIELDS);

            // Labels are unique within a template
            let l = labels(&p);
            for (i, a) in l.iter().enumerate() {
                assert!(!l[i + 1..].contains(a), "duplicate label {a} for {tag}");
            }
        }
    }

    #[test]
    fn transaction_prompt() {
        let p = Prompt::operation(&ops(OperationTag::BabylonTransaction)).unwrap();

        assert_eq!(
            labels(&p),
            &[
                "Confirm",
                "Amount",
                "Fee",
                "Source",
                "Destination",
                "Storage Limit"
            ]
        );
        assert_eq!(p.value("Confirm"), Some(&Value::Static("Transaction")));
        assert_eq!(p.value("Amount"), Some(&Value::Amount(1_000_000)));
        assert_eq!(p.value("Fee"), Some(&Value::Amount(1_420)));
        assert_eq!(p.value("Destination"), Some(&Value::Contract(DEST)));

        let mut o = ops(OperationTag::BabylonTransaction);
        o.operation.is_manager_tz_operation = true;
        let p = Prompt::operation(&o).unwrap();
        assert_eq!(p.value("Confirm"), Some(&Value::Static("Mgr.tz Transaction")));
    }

    #[test]
    fn delegation_variants() {
        let mut o = ops(OperationTag::BabylonDelegation);
        o.operation.is_manager_tz_operation = true;

        let p = Prompt::operation(&o).unwrap();
        assert_eq!(p.kind(), PromptKind::Delegation);
        assert_eq!(p.value("Confirm"), Some(&Value::Static("Mgr.tz Delegation")));

        o.operation.destination = None;
        let p = Prompt::operation(&o).unwrap();
        assert_eq!(p.kind(), PromptKind::Withdrawal);
        assert_eq!(p.value("Withdraw"), Some(&Value::Static("Mgr.tz Delegation")));
        assert_eq!(p.value("Delegate"), Some(&Value::Static("None")));
    }

    #[test]
    fn origination_variants() {
        let mut o = ops(OperationTag::BabylonOrigination);
        let d = OriginationFlags::DELEGATABLE;
        let s = OriginationFlags::SPENDABLE;

        let tests = &[
            (s | d, Some(DEST), "Delegate", Value::Contract(DEST)),
            (s | d, None, "Delegate", Value::Static("Any")),
            (s, Some(DEST), "Fixed Delegate", Value::Contract(DEST)),
            (s, None, "Delegation", Value::Static("Disabled")),
        ];

        for (flags, delegate, label, value) in tests {
            o.operation.flags = *flags;
            o.operation.delegate = *delegate;

            let p = Prompt::operation(&o).unwrap();
            assert_eq!(p.value(label), Some(value), "flags: {flags:?}");
            assert_eq!(p.fields()[5].label, *label);
        }

        // Non-spendable originations fall back to hash confirmation
        o.operation.flags = d;
        assert_eq!(Prompt::operation(&o), None);
    }

    #[test]
    fn ballot_votes() {
        let mut o = ops(OperationTag::Ballot);

        for (v, s) in [(Vote::Yea, "Yea"), (Vote::Nay, "Nay"), (Vote::Pass, "Pass")] {
            o.operation.governance.as_mut().unwrap().vote = Some(v);

            let p = Prompt::operation(&o).unwrap();
            assert_eq!(p.value("Confirm Vote"), Some(&Value::Static(s)));
            assert_eq!(p.value("Period"), Some(&Value::Number(12)));
        }
    }

    #[test]
    fn fixed_prompts() {
        let p = Prompt::raw_hash(&[0xaa; 32]);
        assert_eq!(labels(&p), &["Unrecognized", "Sign Hash"]);
        assert_eq!(p.value("Sign Hash"), Some(&Value::Hash([0xaa; 32])));

        let p = Prompt::pre_hashed();
        assert_eq!(labels(&p), &["Pre-hashed", "Sign Hash"]);

        let p = Prompt::register_delegate(&ops(OperationTag::BabylonDelegation));
        assert_eq!(labels(&p), &["Register", "Address", "Fee"]);
        assert_eq!(p.value("Address"), Some(&Value::Contract(SOURCE)));

        let p = Prompt::reset(1234);
        assert_eq!(p.value("Reset HWM"), Some(&Value::Level(1234)));

        let p = Prompt::provide_public_key(&[0x02; 33]);
        assert_eq!(p.kind(), PromptKind::ProvidePublicKey);
        assert_eq!(labels(&p), &["Provide", "Public Key"]);
        assert_eq!(p.value("Provide"), Some(&Value::Static("Public Key?")));
    }
}
