//! Hash commitments to hidden asset values.
//!
//! A [`Commitment`] is the SHA-256 digest of the minimal big-endian encoding of
//! an [`AssetValue`].  The binding is deterministic and carries no blinding
//! factor: equal values always commit to equal digests, so two transfers of the
//! same amount are linkable.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::ProofError;

/// Width in bytes of a commitment digest.
pub const COMMITMENT_LEN: usize = 32;

/// An arbitrary-precision non-negative integer.
///
/// Stored as its big-endian magnitude with leading zero bytes stripped; zero
/// is the empty byte string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AssetValue {
    magnitude: Vec<u8>,
}

impl AssetValue {
    /// Builds a value from big-endian bytes of any length.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        Self {
            magnitude: bytes[start..].to_vec(),
        }
    }

    /// Returns the minimal big-endian encoding.
    pub fn to_be_bytes(&self) -> &[u8] {
        &self.magnitude
    }

    /// Returns true when the value is zero.
    pub fn is_zero(&self) -> bool {
        self.magnitude.is_empty()
    }
}

impl From<u64> for AssetValue {
    fn from(value: u64) -> Self {
        Self::from_be_bytes(&value.to_be_bytes())
    }
}

impl From<u128> for AssetValue {
    fn from(value: u128) -> Self {
        Self::from_be_bytes(&value.to_be_bytes())
    }
}

/// A 32-byte digest binding an asset value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Commitment([u8; COMMITMENT_LEN]);

impl Commitment {
    /// Wraps raw digest bytes.
    pub const fn from_bytes(bytes: [u8; COMMITMENT_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a digest from a slice of exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProofError> {
        let digest: [u8; COMMITMENT_LEN] = bytes.try_into().map_err(|_| {
            ProofError::MalformedEncoding(format!(
                "commitment must be {COMMITMENT_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(digest))
    }

    /// Parses a hex-encoded digest.
    pub fn from_hex(input: &str) -> Result<Self, ProofError> {
        let bytes = hex::decode(input.trim())
            .map_err(|err| ProofError::MalformedEncoding(format!("commitment hex: {err}")))?;
        Self::from_slice(&bytes)
    }

    /// Returns the digest bytes.
    pub fn as_bytes(&self) -> &[u8; COMMITMENT_LEN] {
        &self.0
    }

    /// Returns the lowercase hex form of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_hex())
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Commits to `value` as `SHA-256(minimal big-endian bytes)`.
pub fn commit(value: &AssetValue) -> Commitment {
    let digest = Sha256::digest(value.to_be_bytes());
    let mut out = [0u8; COMMITMENT_LEN];
    out.copy_from_slice(&digest);
    Commitment(out)
}
