use zk_transfer::identity::signing_key_from_seed;
use zk_transfer::processor::plan_batches;
use zk_transfer::state::{add_balance, balance_key, get_balance};
use zk_transfer::{
    commit, AssetValue, Commitment, Identity, KeyMode, MemoryState, Processor, ProtocolConfig,
    Transaction, Witness, ZkTransfer,
};

fn supplied_rules() -> ProtocolConfig {
    ProtocolConfig {
        key_mode: KeyMode::Supplied,
        ..ProtocolConfig::default()
    }
}

fn transfer(from: &str, to: &str, value: u64, amount: u64) -> Transaction {
    let secret = signing_key_from_seed(from);
    let sender = Identity::of(&secret);
    let receiver = Identity::of(&signing_key_from_seed(to));
    Transaction {
        actor: sender,
        action: ZkTransfer::new(sender, receiver, commit(&AssetValue::from(value))),
        amount,
        witness: Some(Witness {
            sender_secret: secret,
            asset_value: AssetValue::from(value),
        }),
    }
}

fn identity(seed: &str) -> Identity {
    Identity::of(&signing_key_from_seed(seed))
}

fn fund(state: &mut MemoryState, seed: &str, asset: &Commitment, amount: u64) {
    add_balance(state, &balance_key(&identity(seed), asset), amount).unwrap();
}

fn balance(state: &MemoryState, seed: &str, asset: &Commitment) -> u64 {
    get_balance(state, &balance_key(&identity(seed), asset)).unwrap()
}

#[test]
fn verified_transfers_move_balances() {
    let asset = commit(&AssetValue::from(100u64));
    let mut state = MemoryState::new();
    fund(&mut state, "A", &asset, 100);
    fund(&mut state, "C", &asset, 10);
    let processor = Processor::new(supplied_rules());
    let txs = vec![
        transfer("A", "B", 100, 60),
        transfer("C", "D", 100, 10),
        transfer("B", "A", 100, 20),
    ];
    let outcome = processor.process_block(&mut state, &txs).unwrap();
    assert!(outcome.receipts.iter().all(|r| r.success));
    assert_eq!(outcome.compute_units, 30);
    assert_eq!(balance(&state, "A", &asset), 60);
    assert_eq!(balance(&state, "B", &asset), 40);
    assert_eq!(balance(&state, "C", &asset), 0);
    assert_eq!(balance(&state, "D", &asset), 10);
}

#[test]
fn rejected_proof_leaves_state_untouched() {
    let asset = commit(&AssetValue::from(100u64));
    let mut state = MemoryState::new();
    fund(&mut state, "A", &asset, 100);
    let before = state.clone();
    let mut wrong_value = transfer("A", "B", 100, 50);
    if let Some(witness) = wrong_value.witness.as_mut() {
        witness.asset_value = AssetValue::from(99u64);
    }
    let mut impostor = transfer("A", "B", 100, 50);
    impostor.actor = identity("C");
    let processor = Processor::new(supplied_rules());
    let outcome = processor
        .process_block(&mut state, &[wrong_value, impostor])
        .unwrap();
    for receipt in &outcome.receipts {
        assert!(!receipt.success);
        assert_eq!(receipt.compute_units, 10);
    }
    assert_eq!(state, before);
}

#[test]
fn missing_witness_is_reported_in_receipt() {
    let asset = commit(&AssetValue::from(100u64));
    let mut state = MemoryState::new();
    fund(&mut state, "A", &asset, 100);
    let mut tx = transfer("A", "B", 100, 1);
    tx.witness = None;
    let outcome = Processor::new(supplied_rules())
        .process_block(&mut state, &[tx])
        .unwrap();
    assert!(!outcome.receipts[0].success);
    assert!(outcome.receipts[0]
        .error
        .as_deref()
        .is_some_and(|err| err.contains("witness")));
    assert_eq!(balance(&state, "A", &asset), 100);
}

#[test]
fn dependent_transfers_run_in_order() {
    let asset = commit(&AssetValue::from(100u64));
    let mut state = MemoryState::new();
    fund(&mut state, "A", &asset, 5);
    let txs = vec![transfer("A", "B", 100, 5), transfer("B", "C", 100, 5)];
    assert_eq!(plan_batches(&txs), vec![vec![0], vec![1]]);
    let outcome = Processor::new(supplied_rules())
        .process_block(&mut state, &txs)
        .unwrap();
    assert!(outcome.receipts.iter().all(|r| r.success));
    assert_eq!(balance(&state, "C", &asset), 5);
    assert_eq!(state.len(), 1);
}

#[test]
fn declared_keys_do_not_depend_on_state() {
    let tx = transfer("A", "B", 100, 1);
    let keys = tx.action.declared_state_keys(&tx.actor);
    let mut state = MemoryState::new();
    fund(&mut state, "A", &tx.action.asset_commitment, 7);
    assert_eq!(tx.action.declared_state_keys(&tx.actor), keys);
    assert_eq!(keys[0], balance_key(&tx.actor, &tx.action.asset_commitment));
    assert_eq!(keys[1], balance_key(&tx.action.to, &tx.action.asset_commitment));
}
