// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Incremental operation hashing
//!
//! Operation bytes are hashed as they are received, absorbing full blocks
//! from the session buffer and shifting any remainder to the front, so the
//! buffer need only hold the unhashed tail of the operation.

use blake2::{
    digest::{consts::U32, Digest},
    Blake2b,
};
use heapless::Vec;

use crate::apdu::sign::SIGN_HASH_SIZE;

/// Hash block size
pub const HASH_BLOCK_SIZE: usize = 128;

/// Blake2b with 32-byte output
type Blake2b256 = Blake2b<U32>;

/// Incremental Blake2b hasher over a bounded session buffer
#[derive(Clone, Default)]
pub struct Hasher {
    state: Option<Blake2b256>,
}

impl Hasher {
    /// Create a new (uninitialised) hasher
    pub const fn new() -> Self {
        Self { state: None }
    }

    /// Check whether any data has been absorbed
    pub fn is_initialised(&self) -> bool {
        self.state.is_some()
    }

    /// Absorb full blocks from `buff` while more than one block is pending,
    /// shifting the remainder to the front of the buffer
    pub fn update<const N: usize>(&mut self, buff: &mut Vec<u8, N>) {
        let state = self.state.get_or_insert_with(Blake2b256::new);

        let mut absorbed = 0;
        while buff.len() - absorbed > HASH_BLOCK_SIZE {
            state.update(&buff[absorbed..][..HASH_BLOCK_SIZE]);
            absorbed += HASH_BLOCK_SIZE;
        }

        if absorbed > 0 {
            let remaining = buff.len() - absorbed;
            buff.copy_within(absorbed.., 0);
            buff.truncate(remaining);
        }
    }

    /// Absorb any pending data and return the final digest,
    /// clearing the buffer and resetting the hasher
    pub fn finish<const N: usize>(&mut self, buff: &mut Vec<u8, N>) -> [u8; SIGN_HASH_SIZE] {
        self.update(buff);

        let mut state = self.state.take().unwrap_or_default();
        state.update(&buff[..]);
        buff.clear();

        let mut out = [0u8; SIGN_HASH_SIZE];
        out.copy_from_slice(&state.finalize());
        out
    }

    /// Wipe and discard hasher state
    pub fn clear(&mut self) {
        if let Some(state) = self.state.as_mut() {
            Digest::reset(state);
        }
        self.state = None;
        core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
    }
}

impl core::fmt::Debug for Hasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hasher")
            .field("initialised", &self.is_initialised())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const N: usize = 1024;

    /// Hash `data` split at the provided offsets, mirroring the framer
    /// (hash the pending buffer, then append the next chunk)
    fn hash_split(data: &[u8], splits: &[usize]) -> [u8; 32] {
        let mut h = Hasher::new();
        let mut buff = Vec::<u8, N>::new();

        let mut offset = 0;
        for s in splits.iter().chain(core::iter::once(&data.len())) {
            h.update(&mut buff);
            buff.extend_from_slice(&data[offset..*s]).unwrap();
            offset = *s;
        }

        h.finish(&mut buff)
    }

    fn reference(data: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Blake2b256::digest(data));
        out
    }

    #[test]
    fn hash_chunk_invariance() {
        let data: [u8; 300] = core::array::from_fn(|i| (i * 7) as u8);
        let expected = reference(&data);

        let splits: &[&[usize]] = &[
            &[],
            &[127],
            &[128],
            &[129],
            &[127, 128, 129],
            &[1, 2, 3, 200],
            &[100, 200],
            &[128, 256],
            &[64, 129, 235, 299],
        ];

        for s in splits {
            assert_eq!(hash_split(&data, s), expected, "digest mismatch for splits {s:?}");
        }
    }

    #[test]
    fn hash_block_boundaries() {
        for n in [0, 1, 127, 128, 129, 256, 257] {
            let data: std::vec::Vec<u8> = (0..n).map(|i| i as u8).collect();
            assert_eq!(hash_split(&data, &[]), reference(&data), "mismatch for {n} bytes");
        }
    }

    #[test]
    fn hash_random_chunks() {
        use rand::{Rng, RngCore};

        let mut rng = rand::thread_rng();

        for _i in 0..32 {
            let mut data = [0u8; 900];
            rng.fill_bytes(&mut data);

            let mut splits = std::vec::Vec::new();
            let mut offset = 0;
            loop {
                offset += rng.gen_range(1..=235);
                if offset >= data.len() {
                    break;
                }
                splits.push(offset);
            }

            assert_eq!(hash_split(&data, &splits), reference(&data));
        }
    }

    #[test]
    fn update_retains_one_block() {
        let mut h = Hasher::new();
        let mut buff = Vec::<u8, N>::new();
        buff.extend_from_slice(&[0xaa; 300]).unwrap();

        h.update(&mut buff);

        assert!(h.is_initialised());
        assert_eq!(buff.len(), 300 - 2 * HASH_BLOCK_SIZE);
    }

    #[test]
    fn clear_restarts_digest() {
        let mut h = Hasher::new();
        let mut buff = Vec::<u8, N>::new();
        buff.extend_from_slice(&[0x5a; 400]).unwrap();
        h.update(&mut buff);

        h.clear();
        assert!(!h.is_initialised());

        // Absorbed blocks do not leak into the next digest
        let mut buff = Vec::<u8, N>::new();
        buff.extend_from_slice(b"next").unwrap();
        assert_eq!(h.finish(&mut buff), reference(b"next"));
    }
}
