//! Machine-readable proof envelopes.
//!
//! A [`ProofEnvelope`] carries a [`TransferProof`] together with the public
//! statement it is bound to, every field hex-encoded, so proofs can be handed
//! between processes as JSON.

use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

use crate::field::{element_from_bytes, element_to_bytes};
use crate::proof::{verify_proof, TransferProof, CHALLENGE_LEN};
use crate::{Commitment, Identity, ProofError};

/// Schema identifier embedded in every proof envelope.
pub const SCHEMA_PROOF: &str = "zktx.proof.v1";

/// JSON form of a transfer proof and its statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofEnvelope {
    /// Schema identifier (`zktx.proof.v1`).
    pub schema: String,
    /// Hex-encoded sender identity.
    pub sender: String,
    /// Hex-encoded receiver identity.
    pub receiver: String,
    /// Hex-encoded asset commitment.
    pub commitment: String,
    /// Hex-encoded 32-byte challenge digest.
    pub challenge: String,
    /// Hex-encoded little-endian response field element.
    pub response: String,
}

/// Errors produced while decoding a proof envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The schema field did not match [`SCHEMA_PROOF`].
    InvalidSchema {
        /// Expected schema identifier.
        expected: &'static str,
        /// Encountered schema identifier.
        found: String,
    },
    /// A field failed to decode.
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Underlying decode failure.
        source: ProofError,
    },
    /// The text was not envelope JSON.
    Json(String),
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSchema { expected, found } => {
                write!(f, "invalid schema: expected {expected}, found {found}")
            }
            Self::InvalidField { field, source } => {
                write!(f, "invalid envelope field `{field}`: {source}")
            }
            Self::Json(err) => write!(f, "invalid envelope JSON: {err}"),
        }
    }
}

impl Error for EnvelopeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidField { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Decoded contents of a [`ProofEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedEnvelope {
    /// Sender identity.
    pub sender: Identity,
    /// Receiver identity.
    pub receiver: Identity,
    /// Asset commitment.
    pub commitment: Commitment,
    /// The proof itself.
    pub proof: TransferProof,
}

impl DecodedEnvelope {
    /// Verifies the carried proof against the carried statement.
    pub fn verify(&self) -> Result<(), ProofError> {
        verify_proof(&self.sender, &self.receiver, &self.commitment, &self.proof)
    }
}

impl ProofEnvelope {
    /// Builds an envelope for `proof` over the given statement.
    pub fn new(
        sender: &Identity,
        receiver: &Identity,
        commitment: &Commitment,
        proof: &TransferProof,
    ) -> Self {
        Self {
            schema: SCHEMA_PROOF.to_string(),
            sender: sender.to_hex(),
            receiver: receiver.to_hex(),
            commitment: commitment.to_hex(),
            challenge: hex::encode(proof.challenge),
            response: hex::encode(element_to_bytes(&proof.response)),
        }
    }

    /// Parses envelope JSON.
    pub fn from_json(text: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(text).map_err(|err| EnvelopeError::Json(err.to_string()))
    }

    /// Renders the envelope as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string_pretty(self).map_err(|err| EnvelopeError::Json(err.to_string()))
    }

    /// Validates the schema and decodes every field.
    pub fn decode(&self) -> Result<DecodedEnvelope, EnvelopeError> {
        if self.schema != SCHEMA_PROOF {
            return Err(EnvelopeError::InvalidSchema {
                expected: SCHEMA_PROOF,
                found: self.schema.clone(),
            });
        }
        let sender = Identity::from_hex(&self.sender).map_err(field_error("sender"))?;
        let receiver = Identity::from_hex(&self.receiver).map_err(field_error("receiver"))?;
        let commitment =
            Commitment::from_hex(&self.commitment).map_err(field_error("commitment"))?;
        let challenge = decode_challenge(&self.challenge).map_err(field_error("challenge"))?;
        let response = hex::decode(self.response.trim())
            .map_err(|err| ProofError::MalformedEncoding(err.to_string()))
            .and_then(|bytes| element_from_bytes(&bytes))
            .map_err(field_error("response"))?;
        Ok(DecodedEnvelope {
            sender,
            receiver,
            commitment,
            proof: TransferProof {
                challenge,
                response,
            },
        })
    }
}

fn decode_challenge(input: &str) -> Result<[u8; CHALLENGE_LEN], ProofError> {
    let bytes =
        hex::decode(input.trim()).map_err(|err| ProofError::MalformedEncoding(err.to_string()))?;
    bytes.as_slice().try_into().map_err(|_| {
        ProofError::MalformedEncoding(format!(
            "challenge must be {CHALLENGE_LEN} bytes, got {}",
            bytes.len()
        ))
    })
}

fn field_error(field: &'static str) -> impl Fn(ProofError) -> EnvelopeError {
    move |source| EnvelopeError::InvalidField { field, source }
}
