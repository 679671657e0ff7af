//! Confidential transfer action.
//!
//! [`ZkTransfer`] is the state-transition action that runs the transfer proof
//! and reports whether it verified.  It declares the sender and receiver
//! balance keys up front, charges a fixed number of compute units whatever the
//! outcome, and never mutates state itself: the ledger engine moves balances
//! only when [`ExecutionResult::success`] is true.

use ed25519_dalek::SigningKey;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::codec::{CodecError, Packer, Unpacker};
use crate::identity::generate_signing_key;
use crate::proof::{generate_proof, verify_proof};
use crate::state::{balance_key, MutableState, StateKey, BALANCE_CHUNKS};
use crate::{commit, AssetValue, Commitment, Identity, ProofError, COMMITMENT_LEN, IDENTITY_LEN};

/// Wire type tag of [`ZkTransfer`].
pub const ZK_TRANSFER_TYPE_ID: u8 = 0x0a;

/// Compute units charged per transfer under the default rules.
///
/// Covers sampling four coefficients, three transcript hashes, one cubic
/// evaluation and, in ephemeral mode, two key generations.
pub const TRANSFER_COMPUTE_UNITS: u64 = 10;

/// Packed width of a [`ZkTransfer`].
pub const ZK_TRANSFER_SIZE: usize = IDENTITY_LEN + IDENTITY_LEN + COMMITMENT_LEN;

/// Secure randomness usable behind a trait object.
pub trait SecureRng: RngCore + CryptoRng {}

impl<R: RngCore + CryptoRng> SecureRng for R {}

/// Source of the sender's secret material during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// Generate throwaway sender and receiver keys inside the action.
    Ephemeral,
    /// Use the authenticated key and value supplied with the transaction.
    Supplied,
}

/// Chain parameters visible to actions.
pub trait Rules: Send + Sync {
    /// Compute units charged for one transfer.
    fn transfer_compute_units(&self) -> u64;
    /// Where the sender key material comes from.
    fn key_mode(&self) -> KeyMode;
    /// Value committed to in [`KeyMode::Ephemeral`].
    fn demo_asset_value(&self) -> u64;
}

/// Secret inputs supplied alongside a transaction in [`KeyMode::Supplied`].
#[derive(Clone)]
pub struct Witness {
    /// Sender signing key.
    pub sender_secret: SigningKey,
    /// Hidden asset value opened by the commitment.
    pub asset_value: AssetValue,
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("sender", &Identity::of(&self.sender_secret))
            .finish_non_exhaustive()
    }
}

/// Everything an action needs besides state and randomness.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    /// Active chain rules.
    pub rules: &'a dyn Rules,
    /// Authenticated identity that signed the transaction.
    pub actor: &'a Identity,
    /// Secret inputs, required in [`KeyMode::Supplied`].
    pub witness: Option<&'a Witness>,
}

/// Outcome of an action that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// True when the proof verified; gates all balance mutation.
    pub success: bool,
    /// Compute units consumed.
    pub compute_units: u64,
    /// Output bytes returned to the submitter.
    pub output: Vec<u8>,
    /// Cross-chain message emitted by the action.
    pub cross_chain_message: Option<Vec<u8>>,
}

/// An execution aborted by a protocol error.
///
/// The transaction still pays its compute units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("action failed after {compute_units} compute units: {error}")]
pub struct ActionFailure {
    /// Compute units charged for the aborted execution.
    pub compute_units: u64,
    /// Underlying protocol error.
    #[source]
    pub error: ProofError,
}

/// A ledger state-transition action.
pub trait Action: Send + Sync {
    /// Wire type tag.
    fn type_id(&self) -> u8;
    /// Keys the action may touch, declared before execution.
    fn state_keys(&self, actor: &Identity) -> Vec<StateKey>;
    /// Chunk bound for each declared key, in the same order.
    fn state_keys_max_chunks(&self) -> Vec<u16>;
    /// Runs the action.
    fn execute(
        &self,
        ctx: ExecutionContext<'_>,
        state: &mut dyn MutableState,
        rng: &mut dyn SecureRng,
    ) -> Result<ExecutionResult, ActionFailure>;
    /// Whether execution can emit a cross-chain message.
    fn outputs_cross_chain_message(&self) -> bool;
    /// Packed size in bytes.
    fn size(&self) -> usize;
    /// Upper bound on compute units.
    fn max_compute_units(&self, rules: &dyn Rules) -> u64;
    /// Writes the packed action.
    fn marshal(&self, packer: &mut Packer);
    /// Validity window as `(start, end)` timestamps; `-1` means unbounded.
    fn valid_range(&self, rules: &dyn Rules) -> (i64, i64);
}

/// Confidential transfer from `from` to `to` of the asset tagged by
/// `asset_commitment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZkTransfer {
    /// Sender identity.
    pub from: Identity,
    /// Receiver identity.
    pub to: Identity,
    /// Commitment to the hidden asset value.
    pub asset_commitment: Commitment,
}

impl ZkTransfer {
    /// Creates a transfer action.
    pub fn new(from: Identity, to: Identity, asset_commitment: Commitment) -> Self {
        Self {
            from,
            to,
            asset_commitment,
        }
    }

    /// Declares the sender and receiver balance keys.
    pub fn declared_state_keys(&self, actor: &Identity) -> [StateKey; 2] {
        [
            balance_key(actor, &self.asset_commitment),
            balance_key(&self.to, &self.asset_commitment),
        ]
    }

    /// Packs the action into its fixed-width encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packer = Packer::with_capacity(ZK_TRANSFER_SIZE);
        self.marshal(&mut packer);
        packer.into_bytes()
    }

    /// Reads one action from `unpacker`.
    pub fn unmarshal(unpacker: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            from: unpacker.unpack_identity()?,
            to: unpacker.unpack_identity()?,
            asset_commitment: unpacker.unpack_commitment()?,
        })
    }

    /// Decodes an action from exactly [`ZK_TRANSFER_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut unpacker = Unpacker::new(bytes);
        let action = Self::unmarshal(&mut unpacker)?;
        unpacker.finish()?;
        Ok(action)
    }

    /// Proves and verifies with keys generated on the spot.
    fn run_ephemeral<R: RngCore + CryptoRng>(
        &self,
        rules: &dyn Rules,
        rng: &mut R,
    ) -> Result<bool, ProofError> {
        let sender_secret = generate_signing_key(rng)?;
        let sender = Identity::of(&sender_secret);
        let receiver = Identity::of(&generate_signing_key(rng)?);
        let commitment = commit(&AssetValue::from(rules.demo_asset_value()));
        let proof = generate_proof(&sender_secret, &receiver, &commitment, rng)?;
        finish_verification(verify_proof(&sender, &receiver, &commitment, &proof))
    }

    /// Proves with the supplied witness and verifies against the action's
    /// own public fields.
    fn run_supplied<R: RngCore + CryptoRng>(
        &self,
        actor: &Identity,
        witness: &Witness,
        rng: &mut R,
    ) -> Result<bool, ProofError> {
        if actor != &self.from {
            tracing::debug!(%actor, from = %self.from, "actor does not match transfer sender");
            return Ok(false);
        }
        let opened = commit(&witness.asset_value);
        let proof = generate_proof(&witness.sender_secret, &self.to, &opened, rng)?;
        finish_verification(verify_proof(
            &self.from,
            &self.to,
            &self.asset_commitment,
            &proof,
        ))
    }
}

fn finish_verification(outcome: Result<(), ProofError>) -> Result<bool, ProofError> {
    match outcome {
        Ok(()) => Ok(true),
        Err(ProofError::ProofRejected) => Ok(false),
        Err(err) => Err(err),
    }
}

impl Action for ZkTransfer {
    fn type_id(&self) -> u8 {
        ZK_TRANSFER_TYPE_ID
    }

    fn state_keys(&self, actor: &Identity) -> Vec<StateKey> {
        self.declared_state_keys(actor).into()
    }

    fn state_keys_max_chunks(&self) -> Vec<u16> {
        vec![BALANCE_CHUNKS, BALANCE_CHUNKS]
    }

    fn execute(
        &self,
        ctx: ExecutionContext<'_>,
        _state: &mut dyn MutableState,
        rng: &mut dyn SecureRng,
    ) -> Result<ExecutionResult, ActionFailure> {
        let compute_units = self.max_compute_units(ctx.rules);
        let mut rng = rng;
        let outcome = match (ctx.rules.key_mode(), ctx.witness) {
            (KeyMode::Ephemeral, _) => self.run_ephemeral(ctx.rules, &mut rng),
            (KeyMode::Supplied, Some(witness)) => self.run_supplied(ctx.actor, witness, &mut rng),
            (KeyMode::Supplied, None) => Err(ProofError::MissingWitness),
        };
        match outcome {
            Ok(success) => {
                tracing::debug!(
                    success,
                    compute_units,
                    to = %self.to,
                    commitment = %self.asset_commitment,
                    "executed confidential transfer"
                );
                Ok(ExecutionResult {
                    success,
                    compute_units,
                    output: Vec::new(),
                    cross_chain_message: None,
                })
            }
            Err(error) => {
                tracing::warn!(%error, compute_units, "confidential transfer aborted");
                Err(ActionFailure {
                    compute_units,
                    error,
                })
            }
        }
    }

    fn outputs_cross_chain_message(&self) -> bool {
        false
    }

    fn size(&self) -> usize {
        ZK_TRANSFER_SIZE
    }

    fn max_compute_units(&self, rules: &dyn Rules) -> u64 {
        rules.transfer_compute_units()
    }

    fn marshal(&self, packer: &mut Packer) {
        packer.pack_identity(&self.from);
        packer.pack_identity(&self.to);
        packer.pack_commitment(&self.asset_commitment);
    }

    fn valid_range(&self, _rules: &dyn Rules) -> (i64, i64) {
        (-1, -1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::signing_key_from_seed;
    use crate::state::{add_balance, MemoryState};
    use crate::ProtocolConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_action() -> (SigningKey, ZkTransfer) {
        let sender = signing_key_from_seed("A");
        let receiver = Identity::of(&signing_key_from_seed("B"));
        let commitment = commit(&AssetValue::from(100u64));
        (
            sender.clone(),
            ZkTransfer::new(Identity::of(&sender), receiver, commitment),
        )
    }

    #[test]
    fn test_ephemeral_execution_succeeds() {
        let (sender, action) = sample_action();
        let rules = ProtocolConfig::default();
        let actor = Identity::of(&sender);
        let mut state = MemoryState::new();
        let mut rng = StdRng::seed_from_u64(1);
        let result = action
            .execute(
                ExecutionContext {
                    rules: &rules,
                    actor: &actor,
                    witness: None,
                },
                &mut state,
                &mut rng,
            )
            .unwrap();
        assert!(result.success);
        assert_eq!(result.compute_units, TRANSFER_COMPUTE_UNITS);
        assert!(result.output.is_empty());
        assert!(result.cross_chain_message.is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn test_supplied_witness_with_wrong_value_fails_without_mutation() {
        let (sender, action) = sample_action();
        let rules = ProtocolConfig {
            key_mode: KeyMode::Supplied,
            ..ProtocolConfig::default()
        };
        let actor = Identity::of(&sender);
        let mut state = MemoryState::new();
        let [sender_key, _] = action.declared_state_keys(&actor);
        add_balance(&mut state, &sender_key, 50).unwrap();
        let before = state.clone();
        let witness = Witness {
            sender_secret: sender,
            asset_value: AssetValue::from(99u64),
        };
        let mut rng = StdRng::seed_from_u64(2);
        let result = action
            .execute(
                ExecutionContext {
                    rules: &rules,
                    actor: &actor,
                    witness: Some(&witness),
                },
                &mut state,
                &mut rng,
            )
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.compute_units, TRANSFER_COMPUTE_UNITS);
        assert_eq!(state, before);
    }

    #[test]
    fn test_supplied_mode_without_witness_is_an_error() {
        let (sender, action) = sample_action();
        let rules = ProtocolConfig {
            key_mode: KeyMode::Supplied,
            compute_units: 42,
            ..ProtocolConfig::default()
        };
        let actor = Identity::of(&sender);
        let mut rng = StdRng::seed_from_u64(3);
        let failure = action
            .execute(
                ExecutionContext {
                    rules: &rules,
                    actor: &actor,
                    witness: None,
                },
                &mut MemoryState::new(),
                &mut rng,
            )
            .unwrap_err();
        assert_eq!(failure.compute_units, 42);
        assert_eq!(failure.error, ProofError::MissingWitness);
    }

    #[test]
    fn test_state_keys_are_pure_and_ordered() {
        let (sender, action) = sample_action();
        let actor = Identity::of(&sender);
        let first = action.state_keys(&actor);
        let second = action.state_keys(&actor);
        assert_eq!(first, second);
        assert_eq!(first[0], balance_key(&actor, &action.asset_commitment));
        assert_eq!(first[1], balance_key(&action.to, &action.asset_commitment));
        assert_eq!(action.state_keys_max_chunks().len(), first.len());
    }

    #[test]
    fn test_wire_encoding_is_fixed_width() {
        let (_, action) = sample_action();
        let bytes = action.to_bytes();
        assert_eq!(bytes.len(), action.size());
        assert_eq!(bytes.len(), 96);
        assert_eq!(ZkTransfer::from_bytes(&bytes).unwrap(), action);
        assert!(ZkTransfer::from_bytes(&bytes[..95]).is_err());
        assert_eq!(action.valid_range(&ProtocolConfig::default()), (-1, -1));
        assert!(!action.outputs_cross_chain_message());
    }
}
