//! Digest hashing and modular interval arithmetic on the identifier ring.

use crate::chord::types::Digest;
use crate::chord::{DEFAULT_RING_BITS, MAX_RING_BITS};
use crate::error::ChordError;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Hash function used to place names on the ring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashFunction {
    #[default]
    Md5,
    Sha256,
}

impl HashFunction {
    /// Leading 128 bits of the hash, big-endian.
    fn leading_bits(&self, input: &[u8]) -> u128 {
        match self {
            HashFunction::Md5 => u128::from_be_bytes(md5::compute(input).0),
            HashFunction::Sha256 => {
                let result = Sha256::digest(input);
                let mut head = [0u8; 16];
                head.copy_from_slice(&result[..16]);
                u128::from_be_bytes(head)
            }
        }
    }
}

/// The ring [0, 2^m) shared by every participant of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierSpace {
    bits: u8,
    hash: HashFunction,
}

impl Default for IdentifierSpace {
    fn default() -> Self {
        Self {
            bits: DEFAULT_RING_BITS,
            hash: HashFunction::default(),
        }
    }
}

impl IdentifierSpace {
    pub fn new(bits: u8, hash: HashFunction) -> Result<Self, ChordError> {
        if bits == 0 || bits > MAX_RING_BITS {
            return Err(ChordError::InvalidRingWidth(bits));
        }
        Ok(Self { bits, hash })
    }

    pub fn with_bits(bits: u8) -> Result<Self, ChordError> {
        Self::new(bits, HashFunction::default())
    }

    /// Ring width m.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn hash_function(&self) -> HashFunction {
        self.hash
    }

    /// Number of positions on the ring, 2^m.
    pub fn size(&self) -> u64 {
        1u64 << self.bits
    }

    pub fn contains(&self, digest: Digest) -> bool {
        digest < self.size()
    }

    /// Maps a name to the top m bits of its hash.
    pub fn hash(&self, name: &str) -> Digest {
        self.hash_bytes(name.as_bytes())
    }

    pub fn hash_bytes(&self, input: &[u8]) -> Digest {
        (self.hash.leading_bits(input) >> (128 - u32::from(self.bits))) as Digest
    }

    /// Start of the i-th finger interval: (digest + 2^i) mod 2^m.
    pub fn finger_start(&self, digest: Digest, i: u8) -> Digest {
        (digest + (1u64 << i)) % self.size()
    }

    /// Whether `x` lies in `(a, b]`, wrapping past zero when `a >= b`.
    ///
    /// With `a == b` the interval covers the whole ring.
    pub fn in_interval(&self, x: Digest, a: Digest, b: Digest) -> bool {
        if a < b {
            a < x && x <= b
        } else {
            x > a || x <= b
        }
    }

    /// Whether `x` lies strictly inside `(a, b)`, wrapping past zero when `a >= b`.
    ///
    /// With `a == b` the interval is every position except `a`.
    pub fn in_open_interval(&self, x: Digest, a: Digest, b: Digest) -> bool {
        if a < b {
            a < x && x < b
        } else {
            x > a || x < b
        }
    }

    /// Farthest of `fingers` lying strictly inside `(here, target)`. Fingers are
    /// ordered nearest first; ones `digest_of` cannot place are skipped.
    pub fn closest_preceding<'a, T>(
        &self,
        here: Digest,
        target: Digest,
        fingers: &'a [T],
        digest_of: impl Fn(&T) -> Option<Digest>,
    ) -> Option<&'a T> {
        fingers.iter().rev().find(|finger| {
            digest_of(finger).is_some_and(|digest| self.in_open_interval(digest, here, target))
        })
    }

    /// Clockwise distance from `from` to `to`.
    pub fn distance(&self, from: Digest, to: Digest) -> u64 {
        (to + self.size() - from) % self.size()
    }
}
