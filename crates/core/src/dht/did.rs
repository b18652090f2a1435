#![warn(missing_docs)]

//! Identifiers of the Chord ring.
//!
//! A [Did] is a point on a ring of `2^m` identifiers. The storage is always a 160 bits
//! big-endian integer (SHA-1 width), while the ring actually in use is described by an
//! [IdSpace], which carries `m` and performs the modular arithmetic.
//!
//! Ordering of two Dids on a ring is meaningless without a reference point, so instead of
//! comparing Dids directly, the ring relies on circular intervals:
//!
//! ```txt
//! [lo, hi)  in_circular_interval
//! (lo, hi]  in_left_open_interval
//! (lo, hi)  in_open_interval
//! ```
//!
//! Each interval walks clockwise from `lo` to `hi` and wraps around zero when `lo > hi`.

use std::ops::Deref;
use std::str::FromStr;

use ethereum_types::H160;
use num_bigint::BigUint;
use serde::Deserialize;
use serde::Serialize;
use sha1::Digest;
use sha1::Sha1;

use crate::consts::MAX_ID_BITS;
use crate::error::Error;
use crate::error::Result;

/// Did is a point of the identifier ring, wrap H160.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Serialize, Deserialize, Hash)]
pub struct Did(H160);

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inner = &self.0;
        write!(f, "0x{inner:x}")
    }
}

impl Did {
    /// Test x <- [lo, hi). When `lo == hi` the interval covers the whole ring.
    pub fn in_circular_interval(&self, lo: Self, hi: Self) -> bool {
        let x = *self;
        match lo.cmp(&hi) {
            std::cmp::Ordering::Equal => true,
            std::cmp::Ordering::Less => lo <= x && x < hi,
            std::cmp::Ordering::Greater => x >= lo || x < hi,
        }
    }

    /// Test x <- (lo, hi]. When `lo == hi` the interval covers the whole ring.
    pub fn in_left_open_interval(&self, lo: Self, hi: Self) -> bool {
        let x = *self;
        match lo.cmp(&hi) {
            std::cmp::Ordering::Equal => true,
            std::cmp::Ordering::Less => lo < x && x <= hi,
            std::cmp::Ordering::Greater => x > lo || x <= hi,
        }
    }

    /// Test x <- (lo, hi). When `lo == hi` the interval is the ring without `lo`.
    pub fn in_open_interval(&self, lo: Self, hi: Self) -> bool {
        let x = *self;
        match lo.cmp(&hi) {
            std::cmp::Ordering::Equal => x != lo,
            std::cmp::Ordering::Less => lo < x && x < hi,
            std::cmp::Ordering::Greater => x > lo || x < hi,
        }
    }
}

/// The identifier space `[0, 2^bits)` shared by every member of a ring.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdSpace {
    bits: u8,
}

impl IdSpace {
    /// Create an identifier space of `bits` width. Accepts `1..=160`.
    pub fn new(bits: u16) -> Result<Self> {
        if bits == 0 || bits > MAX_ID_BITS as u16 {
            return Err(Error::InvalidIdentifierBits(bits));
        }
        Ok(Self { bits: bits as u8 })
    }

    /// Width `m` of the identifier space, which is also the size of every finger table.
    pub fn bits(&self) -> usize {
        self.bits as usize
    }

    /// `2^m`
    pub fn modulus(&self) -> BigUint {
        BigUint::from(2u16).pow(self.bits as u32)
    }

    /// Reduce an integer into the space.
    pub fn reduce(&self, value: BigUint) -> Did {
        Did::from(value % self.modulus())
    }

    /// Test if a did is a valid point of this space.
    pub fn contains(&self, did: Did) -> bool {
        BigUint::from(did) < self.modulus()
    }

    /// Identifier of a member, derived from its network address.
    /// Same address always yields the same identifier, collisions are not handled here.
    pub fn identifier_of(&self, address: &str) -> Did {
        self.key_id(address.as_bytes())
    }

    /// Identifier of an arbitrary key, using the same hash as member addresses.
    pub fn key_id(&self, key: impl AsRef<[u8]>) -> Did {
        let mut hasher = Sha1::new();
        hasher.update(key.as_ref());
        let digest = hasher.finalize();
        self.reduce(BigUint::from_bytes_be(&digest))
    }

    /// Start of finger `index` of `did`: `(did + 2^index) mod 2^m`.
    pub fn finger_start(&self, did: Did, index: usize) -> Did {
        self.reduce(BigUint::from(did) + BigUint::from(2u16).pow(index as u32))
    }

    /// The point `2^index` behind `did`: `(did - 2^index) mod 2^m`.
    pub fn finger_origin(&self, did: Did, index: usize) -> Did {
        let modulus = self.modulus();
        let offset = BigUint::from(2u16).pow(index as u32) % &modulus;
        self.reduce(BigUint::from(did) + modulus - offset)
    }

    /// `(did + 1) mod 2^m`
    pub fn next(&self, did: Did) -> Did {
        self.reduce(BigUint::from(did) + 1u32)
    }
}

impl Deref for Did {
    type Target = H160;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Did> for H160 {
    fn from(a: Did) -> Self {
        a.0.to_owned()
    }
}

impl From<Did> for BigUint {
    fn from(did: Did) -> BigUint {
        BigUint::from_bytes_be(did.as_bytes())
    }
}

impl From<BigUint> for Did {
    fn from(a: BigUint) -> Self {
        let ff = a % (BigUint::from(2u16).pow(MAX_ID_BITS as u32));
        let mut va: Vec<u8> = ff.to_bytes_be();
        let mut res = vec![0u8; 20 - va.len()];
        res.append(&mut va);
        Self(H160::from_slice(&res))
    }
}

impl From<u32> for Did {
    fn from(id: u32) -> Did {
        Self::from(BigUint::from(id))
    }
}

impl From<u64> for Did {
    fn from(id: u64) -> Did {
        Self::from(BigUint::from(id))
    }
}

impl From<H160> for Did {
    fn from(addr: H160) -> Self {
        Self(addr)
    }
}

impl FromStr for Did {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        H160::from_str(s)
            .map(Self)
            .map_err(|_| Error::InvalidDid(s.to_string()))
    }
}
