//! Error types shared by the proof subsystem and the transfer action.

use thiserror::Error;

/// Failures surfaced while building or checking a transfer proof.
///
/// None of these are retryable: the caller treats every variant as a failed
/// transaction.  [`ProofError::ProofRejected`] is the expected outcome for an
/// invalid or malicious transfer; the other variants abort execution before
/// any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    /// The secure randomness source failed while sampling secret material.
    #[error("random source error: {0}")]
    RandomSource(String),
    /// A polynomial was built from the wrong number of coefficients.
    #[error("degree mismatch: expected {expected} coefficients, got {actual}")]
    DegreeMismatch {
        /// Coefficient count required by the protocol.
        expected: usize,
        /// Coefficient count that was supplied.
        actual: usize,
    },
    /// A public identifier or secret key had the wrong length.
    #[error("malformed key: expected {expected} bytes, got {actual}")]
    MalformedKey {
        /// Required key length in bytes.
        expected: usize,
        /// Observed key length in bytes.
        actual: usize,
    },
    /// A field element or digest could not be decoded.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),
    /// Supplied-key execution ran without a witness.
    #[error("missing witness for supplied key mode")]
    MissingWitness,
    /// The recomputed challenge disagreed with the supplied proof.
    #[error("proof rejected")]
    ProofRejected,
}

impl ProofError {
    /// Returns true for the verification-disagreement outcome.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::ProofRejected)
    }
}

impl From<rand::Error> for ProofError {
    fn from(err: rand::Error) -> Self {
        Self::RandomSource(err.to_string())
    }
}
