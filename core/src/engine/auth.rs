// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Baking authorization guard
//!
//! Persists the authorized baking key and the high-water mark, ensuring a
//! baking key never signs two blocks (or two endorsements) at the same level,
//! or any block or endorsement at a lower level.
//!
//! The persisted state is a single [NvramData] record, written as a whole
//! on every update so a power loss can never leave a torn record.

use byteorder::{BigEndian, ByteOrder};
use static_assertions::const_assert;

use crate::apdu::path::{Bip32Path, Curve, KeyPath, MAX_BIP32_PATH};

use super::{
    operation::{is_valid_level, ParsedBakingData, ParsedOperationGroup},
    Error,
};

/// Persisted record size
pub const NVRAM_RECORD_SIZE: usize = 48;

const CURVE_OFFSET: usize = 0;
const PATH_LEN_OFFSET: usize = 1;
const PATH_OFFSET: usize = 2;
const LEVEL_OFFSET: usize = PATH_OFFSET + MAX_BIP32_PATH * 4;
const ENDORSEMENT_OFFSET: usize = LEVEL_OFFSET + 4;

const_assert!(ENDORSEMENT_OFFSET < NVRAM_RECORD_SIZE);

/// Persistent storage for the [NvramData] record
pub trait Nvram {
    /// Load the persisted record
    fn load(&self) -> [u8; NVRAM_RECORD_SIZE];

    /// Atomically replace the persisted record
    fn store(&mut self, record: &[u8; NVRAM_RECORD_SIZE]) -> Result<(), Error>;
}

impl<T: Nvram> Nvram for &mut T {
    fn load(&self) -> [u8; NVRAM_RECORD_SIZE] {
        T::load(self)
    }

    fn store(&mut self, record: &[u8; NVRAM_RECORD_SIZE]) -> Result<(), Error> {
        T::store(self, record)
    }
}

/// Persisted baking state
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     CURVE     |   PATH_LEN    |                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
/// /          10 x 4-byte big-endian INDEX (zero padded)           /
/// +                               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                               |                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
/// |               HIGHEST_LEVEL (u32, big-endian)                 |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  ENDORSEMENT  |   RESERVED    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// `ENDORSEMENT` is non-zero where an endorsement has been signed at
/// `HIGHEST_LEVEL`. A zero `PATH_LEN` indicates no key is authorized.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct NvramData {
    /// Authorized baking key
    pub key: Option<KeyPath>,
    /// Highest signed level
    pub highest_level: u32,
    /// Endorsement signed at `highest_level`
    pub had_endorsement: bool,
}

impl NvramData {
    /// Encode to a persisted record
    pub fn encode(&self) -> [u8; NVRAM_RECORD_SIZE] {
        let mut buff = [0u8; NVRAM_RECORD_SIZE];

        if let Some(k) = &self.key {
            buff[CURVE_OFFSET] = k.curve as u8;
            buff[PATH_LEN_OFFSET] = k.path.len() as u8;

            for (i, p) in k.path.iter().enumerate() {
                BigEndian::write_u32(&mut buff[PATH_OFFSET + i * 4..], *p);
            }
        }

        BigEndian::write_u32(&mut buff[LEVEL_OFFSET..], self.highest_level);
        buff[ENDORSEMENT_OFFSET] = self.had_endorsement as u8;

        buff
    }

    /// Decode a persisted record, treating an invalid key as unset
    pub fn decode(buff: &[u8; NVRAM_RECORD_SIZE]) -> Self {
        let path_len = buff[PATH_LEN_OFFSET] as usize;

        let key = match (Curve::try_from(buff[CURVE_OFFSET]), path_len) {
            (Ok(curve), 1..=MAX_BIP32_PATH) => {
                let mut path = Bip32Path::new();
                for i in 0..path_len {
                    let _ = path.push(BigEndian::read_u32(&buff[PATH_OFFSET + i * 4..]));
                }
                Some(KeyPath { curve, path })
            }
            _ => None,
        };

        Self {
            key,
            highest_level: BigEndian::read_u32(&buff[LEVEL_OFFSET..]),
            had_endorsement: buff[ENDORSEMENT_OFFSET] != 0,
        }
    }
}

/// Baking authorization guard, enforcing key binding and the high-water mark
#[derive(Debug)]
pub struct BakingAuth<NVM: Nvram> {
    nvm: NVM,
}

impl<NVM: Nvram> BakingAuth<NVM> {
    /// Create a guard over the provided storage
    pub const fn new(nvm: NVM) -> Self {
        Self { nvm }
    }

    /// Fetch persisted baking state
    pub fn data(&self) -> NvramData {
        NvramData::decode(&self.nvm.load())
    }

    /// Fetch the underlying storage
    pub fn nvram(&self) -> &NVM {
        &self.nvm
    }

    fn write(&mut self, data: &NvramData) -> Result<(), Error> {
        let r = data.encode();

        if let Err(e) = self.nvm.store(&r) {
            #[cfg(feature = "log")]
            log::error!("nvram write failed: {:?}", e);

            return Err(e);
        }

        Ok(())
    }

    /// Bind a new baking key, replacing any previously authorized key.
    ///
    /// The high-water mark is retained.
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn authorize(&mut self, key: &KeyPath) -> Result<(), Error> {
        if key.path.is_empty() || key.path.len() > MAX_BIP32_PATH {
            return Err(Error::WrongLength);
        }

        let mut d = self.data();
        d.key = Some(key.clone());

        #[cfg(feature = "log")]
        log::info!("authorizing baking key: {}", key);

        self.write(&d)
    }

    /// Check whether `key` exactly matches the authorized baking key
    pub fn is_path_authorized(&self, key: &KeyPath) -> bool {
        match self.data().key {
            Some(k) => !key.path.is_empty() && k == *key,
            None => false,
        }
    }

    /// Check a level against the high-water mark.
    ///
    /// Levels above the mark are always accepted, a level equal to the mark
    /// only for the first endorsement at that level.
    pub fn is_level_authorized(&self, level: u32, is_endorsement: bool) -> bool {
        if !is_valid_level(level) {
            return false;
        }

        let d = self.data();
        if level > d.highest_level {
            return true;
        }

        level == d.highest_level && is_endorsement && !d.had_endorsement
    }

    /// Guard a block or endorsement signature
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn guard_baking(
        &self,
        key: &KeyPath,
        data: Option<&ParsedBakingData>,
    ) -> Result<(), Error> {
        if !self.is_path_authorized(key) {
            #[cfg(feature = "log")]
            log::warn!("baking key {} not authorized", key);

            return Err(Error::SecurityError);
        }

        let data = data.ok_or(Error::SecurityError)?;

        if !self.is_level_authorized(data.level, data.is_endorsement) {
            #[cfg(feature = "log")]
            log::warn!(
                "level {} (endorsement: {}) rejected by high-water mark",
                data.level,
                data.is_endorsement
            );

            return Err(Error::SecurityError);
        }

        Ok(())
    }

    /// Guard a self-delegation (delegate registration) signed by the baking key
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn guard_self_delegation(
        &self,
        key: &KeyPath,
        ops: &ParsedOperationGroup,
    ) -> Result<(), Error> {
        if !self.is_path_authorized(key) || !ops.is_self_delegation() {
            #[cfg(feature = "log")]
            log::warn!("operation is not a self-delegation by the baking key");

            return Err(Error::SecurityError);
        }

        Ok(())
    }

    /// Advance the high-water mark following a completed signature,
    /// invalid levels are ignored
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn record_success(&mut self, data: &ParsedBakingData) -> Result<(), Error> {
        if !is_valid_level(data.level) {
            return Ok(());
        }

        let mut d = self.data();
        d.highest_level = data.level;
        d.had_endorsement = data.is_endorsement;

        #[cfg(feature = "log")]
        log::debug!(
            "high-water mark: {} (endorsement: {})",
            d.highest_level,
            d.had_endorsement
        );

        self.write(&d)
    }

    /// Reset the high-water mark to `level`
    pub fn reset(&mut self, level: u32) -> Result<(), Error> {
        if !is_valid_level(level) {
            return Err(Error::WrongParameter);
        }

        let mut d = self.data();
        d.highest_level = level;
        d.had_endorsement = false;

        self.write(&d)
    }
}
