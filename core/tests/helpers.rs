// Copyright (c) 2022-2023 The MobileCoin Foundation

#![allow(unused)]

use std::cell::Cell;

use blake2::{digest::consts::U32, Blake2b};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use encdec::Encode;
use log::{debug, trace};
use sha2::{Digest, Sha256};

use ledger_tz_core::{
    apdu::{
        baking::{AuthorizeBakingReq, GetPublicKeyReq},
        packet::{PacketControl, PacketKind},
        path::{Curve, KeyPath, HARDENED},
        sign::SignFirst,
        Instruction, MAX_CHUNK_SIZE, TZ_APDU_CLA,
    },
    engine::{
        auth::{Nvram, NVRAM_RECORD_SIZE},
        operation::{
            OperationTag, OriginationFlags, ParsedContract, ParsedOperation, ParsedOperationGroup,
        },
        Config, Driver, Engine, Error, Output, Signed,
    },
};

pub const SEED: [u8; 32] = [
    0x6d, 0x9c, 0x2e, 0x31, 0x08, 0x4b, 0xa7, 0x52, 0x1f, 0xe3, 0x90, 0x7a, 0xc4, 0x15, 0x88, 0x3b,
    0x2a, 0x61, 0xd0, 0x0e, 0x57, 0xbb, 0x43, 0x9f, 0x76, 0xc1, 0x04, 0xe8, 0x1d, 0x5a, 0xf2, 0x39,
];

pub type TestEngine = Engine<TestDriver, TestNvram>;

/// Setup an engine with empty storage
pub fn setup(config: Config) -> TestEngine {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, Default::default());

    Engine::new(config, TestDriver { seed: SEED }, TestNvram::default())
}

/// Default baking key
pub fn baking_key() -> KeyPath {
    KeyPath::new(
        Curve::Ed25519,
        &[44 | HARDENED, 1729 | HARDENED, HARDENED, HARDENED],
    )
    .unwrap()
}

/// Alternate key, differing from [baking_key] in the last path element
pub fn other_key() -> KeyPath {
    KeyPath::new(
        Curve::Ed25519,
        &[44 | HARDENED, 1729 | HARDENED, HARDENED, 1 | HARDENED],
    )
    .unwrap()
}

/// Driver implementation for test use, deriving ed25519 keys from a fixed seed
pub struct TestDriver {
    pub seed: [u8; 32],
}

impl TestDriver {
    /// Derive the signing key for a given key path
    pub fn signing_key(&self, key: &KeyPath) -> SigningKey {
        let mut h = Sha256::new();
        h.update(self.seed);
        h.update([key.curve as u8]);
        for i in key.path() {
            h.update(i.to_be_bytes());
        }

        SigningKey::from_bytes(&h.finalize().into())
    }

    pub fn verifying_key(&self, key: &KeyPath) -> VerifyingKey {
        self.signing_key(key).verifying_key()
    }

    /// Implicit account for a given key path
    pub fn contract(&self, key: &KeyPath) -> ParsedContract {
        let pk = self.verifying_key(key);

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&Sha256::digest(pk.as_bytes())[..20]);

        ParsedContract {
            originated: false,
            curve: Some(key.curve),
            hash,
        }
    }
}

impl Driver for TestDriver {
    fn sign(&self, key: &KeyPath, message: &[u8], out: &mut [u8]) -> Result<Signed, Error> {
        if key.curve != Curve::Ed25519 {
            return Err(Error::UnsupportedCurve);
        }

        let sig = self.signing_key(key).sign(message).to_bytes();
        out[..sig.len()].copy_from_slice(&sig);

        Ok(Signed {
            len: sig.len(),
            parity_odd: false,
        })
    }

    fn public_key(&self, key: &KeyPath, out: &mut [u8]) -> Result<usize, Error> {
        if key.curve != Curve::Ed25519 {
            return Err(Error::UnsupportedCurve);
        }

        let pk = self.verifying_key(key);
        out[..32].copy_from_slice(pk.as_bytes());

        Ok(32)
    }

    fn parse_operations(
        &self,
        buff: &[u8],
        key: &KeyPath,
        allowed: fn(OperationTag) -> bool,
    ) -> Option<ParsedOperationGroup> {
        TestOp::parse(buff)?.group(self.contract(key), allowed)
    }
}

/// Simplified single-operation group encoding for test use
///
/// `[0x03][BRANCH:32][TAG][DEST_KIND][DEST:20][AMOUNT:8][FEE:8][STORAGE_LIMIT:8]`
#[derive(Clone, PartialEq, Debug)]
pub struct TestOp {
    pub tag: u8,
    /// Destination (implicit ed25519 account)
    pub destination: Option<[u8; 20]>,
    pub amount: u64,
    pub fee: u64,
    pub storage_limit: u64,
}

pub const TEST_OP_LEN: usize = 1 + 32 + 1 + 1 + 20 + 3 * 8;

impl TestOp {
    pub fn encode(&self) -> Vec<u8> {
        let mut b = vec![0x03];
        b.extend_from_slice(&[0xb1; 32]);
        b.push(self.tag);

        match self.destination {
            Some(d) => {
                b.push(1);
                b.extend_from_slice(&d);
            }
            None => {
                b.push(0);
                b.extend_from_slice(&[0u8; 20]);
            }
        }

        b.extend_from_slice(&self.amount.to_be_bytes());
        b.extend_from_slice(&self.fee.to_be_bytes());
        b.extend_from_slice(&self.storage_limit.to_be_bytes());
        b
    }

    pub fn parse(buff: &[u8]) -> Option<Self> {
        if buff.len() != TEST_OP_LEN || buff[0] != 0x03 {
            return None;
        }

        let u64_at = |i: usize| u64::from_be_bytes(buff[i..][..8].try_into().unwrap());

        let destination = match buff[34] {
            0 => None,
            1 => Some(buff[35..55].try_into().unwrap()),
            _ => return None,
        };

        Some(Self {
            tag: buff[33],
            destination,
            amount: u64_at(55),
            fee: u64_at(63),
            storage_limit: u64_at(71),
        })
    }

    fn group(
        &self,
        signing: ParsedContract,
        allowed: fn(OperationTag) -> bool,
    ) -> Option<ParsedOperationGroup> {
        let tag = OperationTag::try_from(self.tag).ok()?;
        if !allowed(tag) {
            return None;
        }

        let destination = self.destination.map(|hash| ParsedContract {
            originated: false,
            curve: Some(Curve::Ed25519),
            hash,
        });

        Some(ParsedOperationGroup {
            signing,
            operation: ParsedOperation {
                tag,
                source: signing,
                destination,
                delegate: None,
                amount: self.amount,
                flags: OriginationFlags::empty(),
                is_manager_tz_operation: false,
                governance: None,
            },
            total_fee: self.fee,
            total_storage_limit: self.storage_limit,
        })
    }
}

/// Self-delegation by the provided key
pub fn self_delegation(drv: &TestDriver, key: &KeyPath) -> Vec<u8> {
    TestOp {
        tag: OperationTag::BabylonDelegation as u8,
        destination: Some(drv.contract(key).hash),
        amount: 0,
        fee: 1_420,
        storage_limit: 0,
    }
    .encode()
}

/// In-memory storage with injectable write failures
pub struct TestNvram {
    record: [u8; NVRAM_RECORD_SIZE],
    pub fail: Cell<bool>,
}

impl Default for TestNvram {
    fn default() -> Self {
        Self {
            record: [0u8; NVRAM_RECORD_SIZE],
            fail: Cell::new(false),
        }
    }
}

impl Nvram for TestNvram {
    fn load(&self) -> [u8; NVRAM_RECORD_SIZE] {
        self.record
    }

    fn store(&mut self, record: &[u8; NVRAM_RECORD_SIZE]) -> Result<(), Error> {
        if self.fail.get() {
            return Err(Error::Storage);
        }

        self.record = *record;
        Ok(())
    }
}

/// Block header at the provided level
pub fn block(level: u32) -> Vec<u8> {
    let mut b = vec![0x01, 0x7a, 0x06, 0xa7, 0x70];
    b.extend_from_slice(&level.to_be_bytes());
    // Proto, predecessor and trailing header bytes
    b.push(0x02);
    b.extend_from_slice(&[0x5c; 40]);
    b
}

/// Endorsement at the provided level
pub fn endorsement(level: u32) -> Vec<u8> {
    let mut b = vec![0x02, 0x7a, 0x06, 0xa7, 0x70];
    b.extend_from_slice(&[0xe4; 32]);
    b.push(0x00);
    b.extend_from_slice(&level.to_be_bytes());
    b
}

/// Blake2b-256 operation hash
pub fn operation_hash(message: &[u8]) -> [u8; 32] {
    Blake2b::<U32>::digest(message).into()
}

/// Parse and handle a request APDU
pub fn send(e: &mut TestEngine, ins: Instruction, p1: u8, data: &[u8]) -> Result<Output, Error> {
    trace!("{:?} p1: {:02x} data: {:02x?}", ins, p1, data);

    let r = e.handle_apdu(TZ_APDU_CLA, ins as u8, p1, data);

    debug!("{:?} -> {:?} (state: {})", ins, r, e.state());

    r
}

/// Start a signing session
pub fn sign_first(e: &mut TestEngine, ins: Instruction, key: &KeyPath) -> Result<Output, Error> {
    let mut buff = [0u8; 64];

    let req = SignFirst::new(key.clone());
    let n = req.encode(&mut buff).unwrap();

    send(e, ins, req.control().p1(), &buff[..n])
}

/// Send operation data in `chunk` sized packets, returning the final output
pub fn sign_chunks(
    e: &mut TestEngine,
    ins: Instruction,
    kind: PacketKind,
    data: &[u8],
    chunk: usize,
) -> Result<Output, Error> {
    let chunks: Vec<_> = data.chunks(chunk).collect();
    let mut r = Output::None;

    for (i, c) in chunks.iter().enumerate() {
        let control = PacketControl::new(kind, i == chunks.len() - 1);
        r = send(e, ins, control.p1(), c)?;
    }

    Ok(r)
}

/// Send a complete signing request
pub fn sign(
    e: &mut TestEngine,
    ins: Instruction,
    key: &KeyPath,
    data: &[u8],
) -> Result<Output, Error> {
    sign_first(e, ins, key)?;
    sign_chunks(e, ins, PacketKind::Next, data, MAX_CHUNK_SIZE)
}

/// Request a public key
pub fn get_public_key(e: &mut TestEngine, key: &KeyPath) -> Result<Output, Error> {
    let mut buff = [0u8; 64];
    let n = GetPublicKeyReq::new(key.clone()).encode(&mut buff).unwrap();

    send(e, Instruction::GetPublicKey, 0x00, &buff[..n])
}

/// Authorize a baking key and confirm
pub fn authorize(e: &mut TestEngine, key: &KeyPath) -> Result<Output, Error> {
    let mut buff = [0u8; 64];
    let n = AuthorizeBakingReq::new(key.clone()).encode(&mut buff).unwrap();

    let r = send(e, Instruction::AuthorizeBaking, 0x00, &buff[..n])?;
    assert_eq!(r, Output::Pending);

    e.confirm()
}

/// Reset the high-water mark and confirm
pub fn reset(e: &mut TestEngine, level: u32) -> Result<Output, Error> {
    let r = send(
        e,
        Instruction::ResetHighWaterMark,
        0x00,
        &level.to_be_bytes(),
    )?;
    assert_eq!(r, Output::Pending);

    e.confirm()
}

/// Check an ed25519 signature output against the signed message
pub fn verify(drv: &TestDriver, key: &KeyPath, message: &[u8], signature: &[u8]) {
    let sig = ed25519_dalek::Signature::from_slice(signature).unwrap();
    drv.verifying_key(key).verify(message, &sig).unwrap();
}

/// Extract the signature from a signing output
pub fn signature(o: &Output) -> (Option<[u8; 32]>, Vec<u8>) {
    match o {
        Output::Signature { hash, signature } => (*hash, signature.to_vec()),
        _ => panic!("expected signature, found: {o:?}"),
    }
}
