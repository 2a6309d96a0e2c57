// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing session and packet framing
//!
//! A [SigningSession] is created by a `FIRST` packet and accumulates operation
//! bytes from subsequent packets, hashing the pending buffer at each packet
//! boundary. Sessions are consumed on completion and zeroized on drop.

use heapless::Vec;
use zeroize::Zeroize;

use crate::apdu::{packet::PacketKind, path::KeyPath, sign::SIGN_HASH_SIZE, Instruction};

use super::{
    hasher::Hasher,
    operation::{MagicByte, ParseResult},
    Error,
};

/// Session message buffer size
pub const MESSAGE_SIZE: usize = 1024;

/// Maximum number of packets per session
pub const MAX_PACKETS: u8 = 0xff;

/// Ephemeral signing session state
pub struct SigningSession {
    ins: Instruction,
    key: KeyPath,
    packet_index: u8,
    message: Vec<u8, MESSAGE_SIZE>,
    hasher: Hasher,
    final_hash: Option<[u8; SIGN_HASH_SIZE]>,
    magic: MagicByte,
    parse: ParseResult,
    hash_only: bool,
}

impl SigningSession {
    /// Start a new session for the provided instruction and key
    pub fn start(ins: Instruction, key: KeyPath) -> Result<Self, Error> {
        if !matches!(
            ins,
            Instruction::Sign | Instruction::SignWithHash | Instruction::SignUnsafe
        ) {
            return Err(Error::InvalidInstruction);
        }

        Ok(Self {
            ins,
            key,
            packet_index: 0,
            message: Vec::new(),
            hasher: Hasher::new(),
            final_hash: None,
            magic: MagicByte::Invalid,
            parse: ParseResult::Invalid,
            hash_only: false,
        })
    }

    /// Instruction that started this session
    pub fn instruction(&self) -> Instruction {
        self.ins
    }

    /// Signing key
    pub fn key(&self) -> &KeyPath {
        &self.key
    }

    /// Operations are hashed and parsed except for raw (unsafe) signing
    pub fn is_hashing(&self) -> bool {
        self.ins != Instruction::SignUnsafe
    }

    /// Operation hash is prefixed to the response for `SignWithHash`
    pub fn emit_hash(&self) -> bool {
        self.ins == Instruction::SignWithHash
    }

    /// Hash-only output requested
    pub fn hash_only(&self) -> bool {
        self.hash_only
    }

    /// Advance the packet counter for a `NEXT` packet, returning the new index
    pub fn next_packet(&mut self, kind: PacketKind) -> Result<u8, Error> {
        match kind {
            PacketKind::Next => (),
            PacketKind::HashOnlyNext => self.hash_only = true,
            PacketKind::First => return Err(Error::WrongParameter),
        }

        if self.packet_index >= MAX_PACKETS {
            return Err(Error::ParseError);
        }
        self.packet_index += 1;

        Ok(self.packet_index)
    }

    /// Append packet bytes, hashing the pending buffer first
    pub fn append(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.is_hashing() {
            self.hasher.update(&mut self.message);
        }

        self.message
            .extend_from_slice(data)
            .map_err(|_| Error::ParseError)
    }

    /// Complete the message, computing the final hash where enabled
    pub fn finish(&mut self) {
        if self.is_hashing() {
            self.final_hash = Some(self.hasher.finish(&mut self.message));
        }
    }

    /// Final operation hash, available once finished
    pub fn final_hash(&self) -> Option<&[u8; SIGN_HASH_SIZE]> {
        self.final_hash.as_ref()
    }

    /// Pending (unhashed) message bytes, the complete message for raw signing
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// Record the operation classification and parse result
    pub fn set_classification(&mut self, magic: MagicByte, parse: ParseResult) {
        self.magic = magic;
        self.parse = parse;
    }

    /// Mark the parse result invalid (operation spans multiple packets)
    pub fn invalidate_parse(&mut self) {
        self.parse = ParseResult::Invalid;
    }

    pub fn magic(&self) -> MagicByte {
        self.magic
    }

    pub fn parse(&self) -> &ParseResult {
        &self.parse
    }
}

impl Zeroize for SigningSession {
    fn zeroize(&mut self) {
        // Wipe the whole buffer, including bytes shifted out by the hasher
        let _ = self.message.resize(MESSAGE_SIZE, 0);
        self.message.as_mut_slice().zeroize();
        self.message.clear();

        self.key.path.iter_mut().for_each(|p| p.zeroize());
        self.key.path.clear();

        if let Some(h) = self.final_hash.as_mut() {
            h.zeroize();
        }
        self.final_hash = None;

        self.hasher.clear();
        self.parse = ParseResult::Invalid;
        self.magic = MagicByte::Invalid;
        self.packet_index = 0;
        self.hash_only = false;
    }
}

impl Drop for SigningSession {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl core::fmt::Debug for SigningSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SigningSession")
            .field("ins", &self.ins)
            .field("key", &self.key)
            .field("packet_index", &self.packet_index)
            .field("message_len", &self.message.len())
            .field("magic", &self.magic)
            .field("hash_only", &self.hash_only)
            .finish()
    }
}
