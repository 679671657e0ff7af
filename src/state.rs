//! Balance storage seam used by the transfer action and the processor.
//!
//! Balances are addressed by [`StateKey`]s derived from an identity and an
//! asset tag.  [`MutableState`] is the interface the ledger engine hands to
//! actions; [`MemoryState`] is an ordered in-memory store with JSON
//! persistence, and [`ScopedState`] confines access to a declared key set.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::{fs, path::Path};
use thiserror::Error;

use crate::{Commitment, Identity};

/// Prefix byte of balance keys.
pub const BALANCE_PREFIX: u8 = 0x00;

/// Maximum number of storage chunks a balance record occupies.
pub const BALANCE_CHUNKS: u16 = 1;

/// Width in bytes of an encoded balance.
const BALANCE_LEN: usize = 8;

/// Opaque key addressing one state record.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey(Vec<u8>);

impl StateKey {
    /// Wraps raw key bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateKey({})", hex::encode(&self.0))
    }
}

/// Derives the balance key for `identity` holding the asset tagged `asset`.
///
/// Layout: `BALANCE_PREFIX ‖ identity ‖ asset`.
pub fn balance_key(identity: &Identity, asset: &Commitment) -> StateKey {
    let mut key = Vec::with_capacity(1 + 32 + 32);
    key.push(BALANCE_PREFIX);
    key.extend_from_slice(identity.as_bytes());
    key.extend_from_slice(asset.as_bytes());
    StateKey::new(key)
}

/// Errors raised by state access and balance arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// An action touched a key it did not declare.
    #[error("access to undeclared key {0:?}")]
    UndeclaredKey(StateKey),
    /// A debit exceeded the stored balance.
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        /// Balance currently stored.
        available: u64,
        /// Amount requested.
        required: u64,
    },
    /// A credit would overflow the balance.
    #[error("balance overflow")]
    Overflow,
    /// A stored record was not a valid balance.
    #[error("corrupt balance record of {0} bytes")]
    CorruptRecord(usize),
    /// Filesystem or JSON failure while persisting a store.
    #[error("state persistence error: {0}")]
    Persistence(String),
}

/// Mutable key/value view supplied by the ledger engine.
pub trait MutableState {
    /// Reads the record at `key`.
    fn get(&self, key: &StateKey) -> Result<Option<Vec<u8>>, StateError>;
    /// Writes `value` at `key`.
    fn insert(&mut self, key: &StateKey, value: Vec<u8>) -> Result<(), StateError>;
    /// Deletes the record at `key`.
    fn remove(&mut self, key: &StateKey) -> Result<(), StateError>;
}

/// Reads a balance, treating a missing record as zero.
pub fn get_balance<S: MutableState + ?Sized>(state: &S, key: &StateKey) -> Result<u64, StateError> {
    match state.get(key)? {
        None => Ok(0),
        Some(bytes) => {
            let raw: [u8; BALANCE_LEN] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| StateError::CorruptRecord(bytes.len()))?;
            Ok(u64::from_be_bytes(raw))
        }
    }
}

fn set_balance<S: MutableState + ?Sized>(
    state: &mut S,
    key: &StateKey,
    balance: u64,
) -> Result<(), StateError> {
    if balance == 0 {
        state.remove(key)
    } else {
        state.insert(key, balance.to_be_bytes().to_vec())
    }
}

/// Credits `amount` to the balance at `key`.
pub fn add_balance<S: MutableState + ?Sized>(
    state: &mut S,
    key: &StateKey,
    amount: u64,
) -> Result<u64, StateError> {
    let updated = get_balance(state, key)?
        .checked_add(amount)
        .ok_or(StateError::Overflow)?;
    set_balance(state, key, updated)?;
    Ok(updated)
}

/// Debits `amount` from the balance at `key`.
pub fn sub_balance<S: MutableState + ?Sized>(
    state: &mut S,
    key: &StateKey,
    amount: u64,
) -> Result<u64, StateError> {
    let available = get_balance(state, key)?;
    let updated = available
        .checked_sub(amount)
        .ok_or(StateError::InsufficientBalance {
            available,
            required: amount,
        })?;
    set_balance(state, key, updated)?;
    Ok(updated)
}

/// Ordered in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryState {
    records: BTreeMap<StateKey, Vec<u8>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryStateFile {
    records: BTreeMap<String, String>,
}

impl MemoryState {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copies the records at `keys` into a [`ScopedState`] limited to them.
    pub fn scoped(&self, keys: &[StateKey]) -> ScopedState {
        let allowed: BTreeSet<StateKey> = keys.iter().cloned().collect();
        let records = allowed
            .iter()
            .filter_map(|key| self.records.get(key).map(|v| (key.clone(), v.clone())))
            .collect();
        ScopedState {
            allowed,
            inner: MemoryState { records },
        }
    }

    /// Load from JSON; missing file -> empty store.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path).map_err(|e| StateError::Persistence(e.to_string()))?;
        let file: MemoryStateFile =
            serde_json::from_slice(&bytes).map_err(|e| StateError::Persistence(e.to_string()))?;
        let mut records = BTreeMap::new();
        for (key, value) in file.records {
            let key = hex::decode(&key).map_err(|e| StateError::Persistence(e.to_string()))?;
            let value = hex::decode(&value).map_err(|e| StateError::Persistence(e.to_string()))?;
            records.insert(StateKey(key), value);
        }
        Ok(Self { records })
    }

    /// Persist to JSON.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StateError::Persistence(e.to_string()))?;
        }
        let file = MemoryStateFile {
            records: self
                .records
                .iter()
                .map(|(k, v)| (hex::encode(&k.0), hex::encode(v)))
                .collect(),
        };
        let data =
            serde_json::to_vec_pretty(&file).map_err(|e| StateError::Persistence(e.to_string()))?;
        fs::write(path, data).map_err(|e| StateError::Persistence(e.to_string()))
    }
}

impl MutableState for MemoryState {
    fn get(&self, key: &StateKey) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.records.get(key).cloned())
    }

    fn insert(&mut self, key: &StateKey, value: Vec<u8>) -> Result<(), StateError> {
        self.records.insert(key.clone(), value);
        Ok(())
    }

    fn remove(&mut self, key: &StateKey) -> Result<(), StateError> {
        self.records.remove(key);
        Ok(())
    }
}

/// A copy of part of a store that rejects access outside its declared keys.
#[derive(Debug, Clone)]
pub struct ScopedState {
    allowed: BTreeSet<StateKey>,
    inner: MemoryState,
}

impl ScopedState {
    fn check(&self, key: &StateKey) -> Result<(), StateError> {
        if self.allowed.contains(key) {
            Ok(())
        } else {
            Err(StateError::UndeclaredKey(key.clone()))
        }
    }

    /// Returns the records written through this view, including deletions
    /// as `None`, for every declared key.
    pub fn into_changes(self) -> Vec<(StateKey, Option<Vec<u8>>)> {
        let ScopedState { allowed, mut inner } = self;
        allowed
            .into_iter()
            .map(|key| {
                let value = inner.records.remove(&key);
                (key, value)
            })
            .collect()
    }
}

impl MutableState for ScopedState {
    fn get(&self, key: &StateKey) -> Result<Option<Vec<u8>>, StateError> {
        self.check(key)?;
        self.inner.get(key)
    }

    fn insert(&mut self, key: &StateKey, value: Vec<u8>) -> Result<(), StateError> {
        self.check(key)?;
        self.inner.insert(key, value)
    }

    fn remove(&mut self, key: &StateKey) -> Result<(), StateError> {
        self.check(key)?;
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{commit, AssetValue};

    fn keys() -> (StateKey, StateKey) {
        let asset = commit(&AssetValue::from(1u64));
        (
            balance_key(&Identity::from_bytes([1u8; 32]), &asset),
            balance_key(&Identity::from_bytes([2u8; 32]), &asset),
        )
    }

    #[test]
    fn test_balance_key_layout() {
        let asset = commit(&AssetValue::from(1u64));
        let key = balance_key(&Identity::from_bytes([7u8; 32]), &asset);
        assert_eq!(key.as_bytes().len(), 65);
        assert_eq!(key.as_bytes()[0], BALANCE_PREFIX);
        assert_eq!(&key.as_bytes()[1..33], &[7u8; 32]);
        assert_eq!(&key.as_bytes()[33..], asset.as_bytes());
    }

    #[test]
    fn test_balance_arithmetic() {
        let (a, _) = keys();
        let mut state = MemoryState::new();
        assert_eq!(get_balance(&state, &a).unwrap(), 0);
        assert_eq!(add_balance(&mut state, &a, 10).unwrap(), 10);
        assert_eq!(sub_balance(&mut state, &a, 4).unwrap(), 6);
        assert_eq!(
            sub_balance(&mut state, &a, 7),
            Err(StateError::InsufficientBalance {
                available: 6,
                required: 7
            })
        );
        assert_eq!(add_balance(&mut state, &a, u64::MAX), Err(StateError::Overflow));
        assert_eq!(sub_balance(&mut state, &a, 6).unwrap(), 0);
        assert!(state.is_empty());
    }

    #[test]
    fn test_scoped_state_rejects_undeclared_keys() {
        let (a, b) = keys();
        let mut state = MemoryState::new();
        add_balance(&mut state, &a, 5).unwrap();
        add_balance(&mut state, &b, 9).unwrap();
        let mut scoped = state.scoped(std::slice::from_ref(&a));
        assert_eq!(get_balance(&scoped, &a).unwrap(), 5);
        assert_eq!(
            get_balance(&scoped, &b),
            Err(StateError::UndeclaredKey(b.clone()))
        );
        sub_balance(&mut scoped, &a, 5).unwrap();
        assert_eq!(scoped.into_changes(), vec![(a, None)]);
    }

    #[test]
    fn test_save_and_load() {
        let (a, b) = keys();
        let mut state = MemoryState::new();
        add_balance(&mut state, &a, 3).unwrap();
        add_balance(&mut state, &b, 4).unwrap();
        let path = std::env::temp_dir().join(format!(
            "zk_transfer_state_{}.json",
            std::process::id()
        ));
        state.save(&path).unwrap();
        let loaded = MemoryState::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.len(), 2);
        std::fs::remove_file(&path).unwrap();
    }
}
