//! The proof subsystem is deliberately small, yet every step of it is spelled out.
//! Each module owns one concept of the confidential transfer: field arithmetic,
//! polynomials, commitments, transcripts and the proof that ties them together.
//!
//! Cubic transfer proof.
//!
//! The prover samples a fresh [`CubicPolynomial`] as its secret randomness and
//! runs a Fiat–Shamir transcript over the statement
//! `(sender identity, receiver identity, commitment)`:
//!
//! ```text
//! x         = H_point(statement)
//! response  = P(x)
//! challenge = H_challenge(statement, x, response)
//! ```
//!
//! The verifier replays the transcript from public material and the supplied
//! `response` and accepts iff it re-derives the same 32-byte `challenge`.
//! This binds the response to the statement, so altering any byte of the
//! proof, the commitment or either identity is detected.  The polynomial is
//! never transmitted, so the verifier cannot check that `response` is really
//! an evaluation of a secret polynomial; the proof demonstrates transcript
//! binding, not knowledge of a secret.

use ark_ff::PrimeField;
use ed25519_dalek::SigningKey;
use rand_core::{CryptoRng, RngCore};
use std::fmt;
use subtle::ConstantTimeEq;

use crate::field::{element_from_bytes, element_to_bytes, FIELD_ELEMENT_LEN};
use crate::{Commitment, CubicPolynomial, Field, FieldElement, Identity, ProofError, Transcript};

/// Domain tag used for the transfer-proof Fiat–Shamir transcript.
const TRANSFER_PROOF_DOMAIN: &[u8] = b"zk_transfer:v1:cubic";

/// Width in bytes of the challenge digest.
pub const CHALLENGE_LEN: usize = 32;

/// Width in bytes of an encoded [`TransferProof`].
pub const PROOF_LEN: usize = CHALLENGE_LEN + FIELD_ELEMENT_LEN;

/// Progress of a single proof invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStatus {
    /// Nothing has been sampled yet.
    Uninitialized,
    /// The secret polynomial has been drawn.
    PolynomialSampled,
    /// A challenge/response pair exists.
    ProofGenerated,
    /// The verifier re-derived the challenge.
    Verified,
    /// The verifier disagreed with the challenge.
    Rejected,
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::PolynomialSampled => "polynomial_sampled",
            Self::ProofGenerated => "proof_generated",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// The public statement a transfer proof is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement<'a> {
    /// Sender public identity.
    pub sender: &'a Identity,
    /// Receiver public identity.
    pub receiver: &'a Identity,
    /// Commitment to the hidden asset value.
    pub commitment: &'a Commitment,
}

impl Statement<'_> {
    fn transcript(&self) -> Transcript {
        let mut transcript = Transcript::new(TRANSFER_PROOF_DOMAIN);
        transcript.append_message(b"sender", self.sender.as_bytes());
        transcript.append_message(b"receiver", self.receiver.as_bytes());
        transcript.append_message(b"commitment", self.commitment.as_bytes());
        transcript
    }
}

/// Non-interactive challenge/response pair.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TransferProof {
    /// Fiat–Shamir challenge digest over the statement and response.
    pub challenge: [u8; CHALLENGE_LEN],
    /// Secret polynomial evaluated at the statement-derived point.
    pub response: FieldElement,
}

impl TransferProof {
    /// Encodes the proof as `challenge ‖ response` (64 bytes).
    pub fn to_bytes(&self) -> [u8; PROOF_LEN] {
        let mut out = [0u8; PROOF_LEN];
        out[..CHALLENGE_LEN].copy_from_slice(&self.challenge);
        out[CHALLENGE_LEN..].copy_from_slice(&element_to_bytes(&self.response));
        out
    }

    /// Decodes a 64-byte proof, rejecting a non-canonical response.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofError> {
        if bytes.len() != PROOF_LEN {
            return Err(ProofError::MalformedEncoding(format!(
                "proof must be {PROOF_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut challenge = [0u8; CHALLENGE_LEN];
        challenge.copy_from_slice(&bytes[..CHALLENGE_LEN]);
        let response = element_from_bytes(&bytes[CHALLENGE_LEN..])?;
        Ok(Self {
            challenge,
            response,
        })
    }
}

impl fmt::Debug for TransferProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferProof")
            .field("challenge", &hex::encode(self.challenge))
            .field("response", &hex::encode(element_to_bytes(&self.response)))
            .finish()
    }
}

/// Prover state for one invocation: the field and its sampled polynomial.
///
/// Consumed by [`CubicZkProof::generate`], so a polynomial is never reused
/// across two proofs.
pub struct CubicZkProof<F: PrimeField = FieldElement> {
    field: Field<F>,
    polynomial: CubicPolynomial<F>,
}

impl<F: PrimeField> CubicZkProof<F> {
    /// Wraps an already-built polynomial.
    pub fn new(field: Field<F>, polynomial: CubicPolynomial<F>) -> Self {
        Self { field, polynomial }
    }

    /// Samples a fresh secret polynomial.
    pub fn sample<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, ProofError> {
        tracing::trace!(status = %ProofStatus::Uninitialized, "sampling secret polynomial");
        let field = Field::new();
        let polynomial = CubicPolynomial::sample(&field, rng)?;
        tracing::trace!(status = %ProofStatus::PolynomialSampled, "sampled secret polynomial");
        Ok(Self { field, polynomial })
    }
}

impl CubicZkProof<FieldElement> {
    /// Produces the challenge/response pair for `statement`.
    ///
    /// The statement's sender identity must be the one derived from the
    /// sender secret; [`generate_proof`] takes care of that.
    pub fn generate(self, statement: &Statement<'_>) -> TransferProof {
        let mut transcript = statement.transcript();
        let point: FieldElement = transcript.challenge_scalar(b"point");
        let response = self.polynomial.evaluate(&self.field, point);
        transcript.append_scalar(b"response", &response);
        let challenge = transcript.challenge_bytes(b"challenge");
        tracing::trace!(status = %ProofStatus::ProofGenerated, "generated transfer proof");
        TransferProof {
            challenge,
            response,
        }
    }
}

/// Generates a proof that binds `sender_secret`'s identity, `receiver` and
/// `commitment`.
///
/// Fails only with [`ProofError::RandomSource`] when coefficient sampling
/// fails.
pub fn generate_proof<R: RngCore + CryptoRng>(
    sender_secret: &SigningKey,
    receiver: &Identity,
    commitment: &Commitment,
    rng: &mut R,
) -> Result<TransferProof, ProofError> {
    let sender = Identity::of(sender_secret);
    let prover = CubicZkProof::<FieldElement>::sample(rng)?;
    Ok(prover.generate(&Statement {
        sender: &sender,
        receiver,
        commitment,
    }))
}

/// Checks `proof` against the public statement.
///
/// Returns [`ProofError::ProofRejected`] when the re-derived challenge
/// differs from the supplied one.
pub fn verify_proof(
    sender: &Identity,
    receiver: &Identity,
    commitment: &Commitment,
    proof: &TransferProof,
) -> Result<(), ProofError> {
    let statement = Statement {
        sender,
        receiver,
        commitment,
    };
    let mut transcript = statement.transcript();
    let _point: FieldElement = transcript.challenge_scalar(b"point");
    transcript.append_scalar(b"response", &proof.response);
    let expected = transcript.challenge_bytes(b"challenge");
    if bool::from(expected.ct_eq(&proof.challenge)) {
        tracing::trace!(status = %ProofStatus::Verified, "verified transfer proof");
        Ok(())
    } else {
        tracing::debug!(
            status = %ProofStatus::Rejected,
            %sender,
            %receiver,
            "transfer proof rejected"
        );
        Err(ProofError::ProofRejected)
    }
}
