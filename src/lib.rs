#![deny(missing_docs)]

//! The proof subsystem is deliberately small, yet every step of it is spelled out.
//! Each module owns one concept of the confidential transfer: field arithmetic,
//! polynomials, commitments, transcripts and the proof that ties them together.
//!
//! # zk_transfer
//!
//! **zk_transfer** implements a confidential-transfer action for a ledger.  A
//! sender proves that a transfer is bound to a specific sender identity, a
//! specific receiver identity and a hash commitment to a hidden asset value;
//! the ledger moves balances only when that proof verifies.
//!
//! ## Features
//!
//! * **Prime-field arithmetic** via the [`Field`] type over the BN254 scalar
//!   field ([`FieldElement`]).
//! * **Cubic polynomials**: [`CubicPolynomial`] with Horner evaluation.
//! * **Commitments**: [`commit`] hashes the minimal big-endian encoding of an
//!   [`AssetValue`] with SHA-256.
//! * **Transfer proof**: the [`proof`] module generates and verifies a
//!   Fiat–Shamir challenge/response pair over the statement.
//! * **Ledger integration**: [`ZkTransfer`] implements the [`Action`] trait and
//!   [`Processor`] executes batches of transfers in parallel against scoped
//!   state, applying balance moves only on success.
//! * **Envelopes and configuration**: proofs travel as JSON
//!   [`ProofEnvelope`]s and the protocol is tuned through [`ProtocolConfig`].
//!
//! The proof binds the statement to the response; it does not demonstrate
//! knowledge of a secret, and commitments carry no blinding factor.
//!
//! ## Usage
//!
//! ```rust
//! use rand::rngs::OsRng;
//! use zk_transfer::identity::signing_key_from_seed;
//! use zk_transfer::proof::{generate_proof, verify_proof};
//! use zk_transfer::{commit, AssetValue, Identity};
//!
//! let alice = signing_key_from_seed("alice");
//! let bob = Identity::of(&signing_key_from_seed("bob"));
//! let commitment = commit(&AssetValue::from(100u64));
//!
//! let proof = generate_proof(&alice, &bob, &commitment, &mut OsRng).unwrap();
//! assert!(verify_proof(&Identity::of(&alice), &bob, &commitment, &proof).is_ok());
//! ```

pub mod action;
pub mod codec;
mod commitment;
pub mod config;
pub mod envelope;
mod error;
pub mod field;
pub mod identity;
mod polynomial;
pub mod processor;
pub mod proof;
pub mod state;
mod transcript;

pub use action::{
    Action, ActionFailure, ExecutionContext, ExecutionResult, KeyMode, Rules, SecureRng, Witness,
    ZkTransfer, TRANSFER_COMPUTE_UNITS, ZK_TRANSFER_TYPE_ID,
};
pub use commitment::{commit, AssetValue, Commitment, COMMITMENT_LEN};
pub use config::{ConfigError, ProtocolConfig};
pub use envelope::{EnvelopeError, ProofEnvelope};
pub use error::ProofError;
pub use field::{Field, FieldElement};
pub use identity::{Identity, IDENTITY_LEN};
pub use polynomial::{CubicPolynomial, Polynomial, CUBIC_COEFFICIENTS};
pub use processor::{BlockOutcome, Processor, Receipt, Transaction};
pub use proof::{generate_proof, verify_proof, TransferProof};
pub use state::{MemoryState, MutableState, StateKey};
pub use transcript::Transcript;
