//! Reference ledger engine for confidential transfers.
//!
//! Transactions are grouped into batches whose declared state keys do not
//! overlap.  Each batch runs in parallel, every transaction against a
//! [`ScopedState`] copy of its own keys; balances move from the sender key to
//! the receiver key only when the action reports success, and the scoped
//! writes are merged back in submission order.
//!
//! Under [`KeyMode::Ephemeral`](crate::KeyMode::Ephemeral) the action proves
//! over throwaway keys and never looks at the transaction's `from`, `to` or
//! `asset_commitment`, so the success gate admits every transfer and only the
//! balance checks remain.  Use [`KeyMode::Supplied`](crate::KeyMode::Supplied)
//! to bind settlement to the transaction's own statement.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;
use rand::rngs::OsRng;
use std::collections::HashMap;

use crate::action::{Action, ExecutionContext, Witness, ZkTransfer, ZK_TRANSFER_TYPE_ID};
use crate::codec::{CodecError, Packer, Unpacker, U64_LEN};
use crate::state::{
    add_balance, sub_balance, MemoryState, MutableState, ScopedState, StateError, StateKey,
};
use crate::{Identity, ProofError, Rules, IDENTITY_LEN};

/// A submitted transfer with its authenticated actor.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Identity resolved by the authentication layer.
    pub actor: Identity,
    /// The confidential transfer action.
    pub action: ZkTransfer,
    /// Balance units moved on success.
    pub amount: u64,
    /// Secret inputs; never part of the wire encoding.
    pub witness: Option<Witness>,
}

impl Transaction {
    /// Packs `type_id ‖ actor ‖ action ‖ amount`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packer = Packer::with_capacity(1 + IDENTITY_LEN + self.action.size() + U64_LEN);
        packer.pack_u8(self.action.type_id());
        packer.pack_identity(&self.actor);
        self.action.marshal(&mut packer);
        packer.pack_u64(self.amount);
        packer.into_bytes()
    }

    /// Decodes a packed transaction without a witness.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut unpacker = Unpacker::new(bytes);
        let found = unpacker.unpack_u8()?;
        if found != ZK_TRANSFER_TYPE_ID {
            return Err(CodecError::UnexpectedTypeId {
                expected: ZK_TRANSFER_TYPE_ID,
                found,
            });
        }
        let actor = unpacker.unpack_identity()?;
        let action = ZkTransfer::unmarshal(&mut unpacker)?;
        let amount = unpacker.unpack_u64()?;
        unpacker.finish()?;
        Ok(Self {
            actor,
            action,
            amount,
            witness: None,
        })
    }

    fn state_keys(&self) -> Vec<StateKey> {
        self.action.state_keys(&self.actor)
    }
}

/// Per-transaction outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// True when the proof verified and the balances moved.
    pub success: bool,
    /// Compute units charged.
    pub compute_units: u64,
    /// Reason the transaction had no effect.
    pub error: Option<String>,
}

/// Result of processing one block of transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutcome {
    /// Receipts in submission order.
    pub receipts: Vec<Receipt>,
    /// Sum of compute units over all receipts.
    pub compute_units: u64,
}

/// Groups transaction indices into batches with disjoint state keys.
///
/// A transaction lands in the batch after the latest batch holding any of its
/// keys, so conflicting transactions keep their submission order.
pub fn plan_batches(txs: &[Transaction]) -> Vec<Vec<usize>> {
    let mut last_batch: HashMap<StateKey, usize> = HashMap::new();
    let mut batches: Vec<Vec<usize>> = Vec::new();
    for (idx, tx) in txs.iter().enumerate() {
        let keys = tx.state_keys();
        let slot = keys
            .iter()
            .filter_map(|key| last_batch.get(key))
            .max()
            .map_or(0, |&b| b + 1);
        if slot == batches.len() {
            batches.push(Vec::new());
        }
        batches[slot].push(idx);
        for key in keys {
            last_batch.insert(key, slot);
        }
    }
    tracing::debug!(
        transactions = txs.len(),
        batches = batches.len(),
        "planned transfer batches"
    );
    batches
}

/// Executes transfers and applies their balance effects.
///
/// Balances move only for receipts with `success == true`.  In ephemeral key
/// mode that gate is vacuous: the proof is over generated keys, not the
/// transaction's statement.
#[derive(Debug, Clone)]
pub struct Processor<R: Rules> {
    rules: R,
}

impl<R: Rules> Processor<R> {
    /// Creates a processor running under `rules`.
    pub fn new(rules: R) -> Self {
        Self { rules }
    }

    /// Returns the active rules.
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Processes `txs` against `state`.
    ///
    /// State errors while merging are fatal to the block; every other
    /// failure is reported in the transaction's receipt.  See the type docs
    /// for what success means in ephemeral key mode.
    pub fn process_block(
        &self,
        state: &mut MemoryState,
        txs: &[Transaction],
    ) -> Result<BlockOutcome, StateError> {
        let mut receipts: Vec<Option<Receipt>> = vec![None; txs.len()];
        for batch in plan_batches(txs) {
            let snapshot: &MemoryState = state;
            #[cfg(not(target_arch = "wasm32"))]
            let results: Vec<(usize, Receipt, Option<ScopedState>)> = batch
                .par_iter()
                .map(|&idx| {
                    let (receipt, scoped) = self.run_transaction(snapshot, &txs[idx]);
                    (idx, receipt, scoped)
                })
                .collect();
            #[cfg(target_arch = "wasm32")]
            let results: Vec<(usize, Receipt, Option<ScopedState>)> = batch
                .iter()
                .map(|&idx| {
                    let (receipt, scoped) = self.run_transaction(snapshot, &txs[idx]);
                    (idx, receipt, scoped)
                })
                .collect();
            for (idx, receipt, scoped) in results {
                if let Some(scoped) = scoped {
                    for (key, value) in scoped.into_changes() {
                        match value {
                            Some(bytes) => state.insert(&key, bytes)?,
                            None => state.remove(&key)?,
                        }
                    }
                }
                receipts[idx] = Some(receipt);
            }
        }
        let receipts: Vec<Receipt> = receipts.into_iter().flatten().collect();
        let compute_units = receipts
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.compute_units));
        Ok(BlockOutcome {
            receipts,
            compute_units,
        })
    }

    fn run_transaction(
        &self,
        snapshot: &MemoryState,
        tx: &Transaction,
    ) -> (Receipt, Option<ScopedState>) {
        let keys = tx.state_keys();
        let mut scoped = snapshot.scoped(&keys);
        let ctx = ExecutionContext {
            rules: &self.rules,
            actor: &tx.actor,
            witness: tx.witness.as_ref(),
        };
        let mut rng = OsRng;
        let result = match tx.action.execute(ctx, &mut scoped, &mut rng) {
            Ok(result) => result,
            Err(failure) => {
                return (
                    Receipt {
                        success: false,
                        compute_units: failure.compute_units,
                        error: Some(failure.error.to_string()),
                    },
                    None,
                )
            }
        };
        if !result.success {
            return (
                Receipt {
                    success: false,
                    compute_units: result.compute_units,
                    error: Some(ProofError::ProofRejected.to_string()),
                },
                None,
            );
        }
        match settle(&mut scoped, &keys, tx.amount) {
            Ok(()) => (
                Receipt {
                    success: true,
                    compute_units: result.compute_units,
                    error: None,
                },
                Some(scoped),
            ),
            Err(err) => {
                tracing::debug!(%err, actor = %tx.actor, "transfer settlement failed");
                (
                    Receipt {
                        success: false,
                        compute_units: result.compute_units,
                        error: Some(err.to_string()),
                    },
                    None,
                )
            }
        }
    }
}

/// Moves `amount` from the first declared key to the second.
fn settle(state: &mut ScopedState, keys: &[StateKey], amount: u64) -> Result<(), StateError> {
    if let [sender, receiver] = keys {
        sub_balance(state, sender, amount)?;
        add_balance(state, receiver, amount)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::signing_key_from_seed;
    use crate::{commit, AssetValue, ProtocolConfig};

    fn tx(from: &str, to: &str, amount: u64) -> Transaction {
        let actor = Identity::of(&signing_key_from_seed(from));
        let receiver = Identity::of(&signing_key_from_seed(to));
        Transaction {
            actor,
            action: ZkTransfer::new(actor, receiver, commit(&AssetValue::from(100u64))),
            amount,
            witness: None,
        }
    }

    #[test]
    fn test_disjoint_transfers_share_a_batch() {
        let txs = vec![tx("a", "b", 1), tx("c", "d", 1), tx("b", "e", 1)];
        assert_eq!(plan_batches(&txs), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_conflicting_transfers_keep_order() {
        let txs = vec![tx("a", "b", 1), tx("a", "c", 1), tx("d", "e", 1), tx("c", "a", 1)];
        assert_eq!(plan_batches(&txs), vec![vec![0, 2], vec![1], vec![3]]);
    }

    #[test]
    fn test_transaction_wire_round_trip() {
        let original = tx("a", "b", 77);
        let bytes = original.to_bytes();
        assert_eq!(bytes.len(), 1 + 32 + 96 + 8);
        let decoded = Transaction::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.actor, original.actor);
        assert_eq!(decoded.action, original.action);
        assert_eq!(decoded.amount, 77);
        let mut wrong = bytes.clone();
        wrong[0] = 0xff;
        assert!(matches!(
            Transaction::from_bytes(&wrong),
            Err(CodecError::UnexpectedTypeId { found: 0xff, .. })
        ));
    }

    #[test]
    fn test_insufficient_balance_leaves_state_untouched() {
        let processor = Processor::new(ProtocolConfig::default());
        let mut state = MemoryState::new();
        let outcome = processor
            .process_block(&mut state, &[tx("a", "b", 5)])
            .unwrap();
        assert!(!outcome.receipts[0].success);
        assert!(outcome.receipts[0].error.is_some());
        assert_eq!(outcome.compute_units, processor.rules().compute_units);
        assert!(state.is_empty());
    }

    #[test]
    fn test_ephemeral_mode_settles_without_checking_the_witness() {
        let processor = Processor::new(ProtocolConfig::default());
        let mut transfer = tx("a", "b", 5);
        transfer.witness = Some(Witness {
            sender_secret: signing_key_from_seed("a"),
            asset_value: AssetValue::from(1u64),
        });
        let keys = transfer.state_keys();
        let mut state = MemoryState::new();
        add_balance(&mut state, &keys[0], 5).unwrap();
        let outcome = processor.process_block(&mut state, &[transfer]).unwrap();
        assert!(outcome.receipts[0].success);
        assert_eq!(crate::state::get_balance(&state, &keys[1]).unwrap(), 5);
    }
}
