//! Sender and receiver identities backed by ed25519 keys.
//!
//! An [`Identity`] is the 32-byte ed25519 public key of an account.  Secret
//! material is an ed25519 [`SigningKey`]; it never appears in action wire
//! data or in the proof.

use ed25519_dalek::{SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};
use std::fmt;

use crate::ProofError;

/// Width in bytes of an [`Identity`].
pub const IDENTITY_LEN: usize = PUBLIC_KEY_LENGTH;

/// Public identifier of a sender or receiver.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    /// Wraps raw public key bytes.
    pub const fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses an identity, rejecting any slice that is not 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProofError> {
        let key: [u8; IDENTITY_LEN] = bytes.try_into().map_err(|_| ProofError::MalformedKey {
            expected: IDENTITY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(key))
    }

    /// Parses a hex-encoded identity.
    pub fn from_hex(input: &str) -> Result<Self, ProofError> {
        let bytes = hex::decode(input.trim())
            .map_err(|err| ProofError::MalformedEncoding(format!("identity hex: {err}")))?;
        Self::from_slice(&bytes)
    }

    /// Returns the public key bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Returns the lowercase hex form of the key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Derives the public identity of a signing key.
    pub fn of(secret: &SigningKey) -> Self {
        Self::from(secret.verifying_key())
    }
}

impl From<VerifyingKey> for Identity {
    fn from(key: VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.to_hex())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Generates a fresh signing key from a secure source.
///
/// Unlike `SigningKey::generate`, a failing source is reported as
/// [`ProofError::RandomSource`] instead of panicking.
pub fn generate_signing_key<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<SigningKey, ProofError> {
    let mut secret = [0u8; SECRET_KEY_LENGTH];
    rng.try_fill_bytes(&mut secret)?;
    Ok(SigningKey::from_bytes(&secret))
}

/// Derives a deterministic signing key from a seed string.
pub fn signing_key_from_seed(seed: &str) -> SigningKey {
    let digest = Sha512::digest(seed.as_bytes());
    let mut secret = [0u8; SECRET_KEY_LENGTH];
    secret.copy_from_slice(&digest[..SECRET_KEY_LENGTH]);
    SigningKey::from_bytes(&secret)
}

/// Parses a raw 32-byte signing key.
pub fn signing_key_from_slice(bytes: &[u8]) -> Result<SigningKey, ProofError> {
    let secret: [u8; SECRET_KEY_LENGTH] =
        bytes.try_into().map_err(|_| ProofError::MalformedKey {
            expected: SECRET_KEY_LENGTH,
            actual: bytes.len(),
        })?;
    Ok(SigningKey::from_bytes(&secret))
}
