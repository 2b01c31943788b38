use core::fmt;

use serde::{Deserialize, Serialize};

const HASH32_SIZE: usize = 32;

/// SHA3-256 digest. Used for proposal-response payloads and transaction ids.
#[derive(Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Hash32([u8; HASH32_SIZE]);

impl Hash32 {
    pub fn calculate(data: &[u8]) -> Self {
        Self::calculate_all([data])
    }

    /// Hashes the concatenation of `parts` without allocating the joined buffer.
    pub fn calculate_all<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        use tiny_keccak::{Hasher, Sha3};

        let mut sha3 = Sha3::v256();
        let mut hash = [0; HASH32_SIZE];
        for part in parts {
            sha3.update(part);
        }
        sha3.finalize(&mut hash);
        Hash32(hash)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(val: [u8; 32]) -> Self {
        Self(val)
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // first 4 bytes are plenty to tell sets apart in logs
        write!(f, "H({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
