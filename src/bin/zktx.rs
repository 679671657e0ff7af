//! Minimal CLI for the confidential-transfer primitives.
//!
//! This binary derives identities, computes commitments, produces and checks
//! JSON proof envelopes, and replays the end-to-end transfer scenario through
//! the reference processor.

use rand::rngs::OsRng;
use std::{env, fs, path::Path};
use tracing_subscriber::EnvFilter;
use zk_transfer::identity::signing_key_from_seed;
use zk_transfer::state::{balance_key, get_balance};
use zk_transfer::{
    commit, generate_proof, verify_proof, AssetValue, Identity, KeyMode, MemoryState, Processor,
    ProofEnvelope, ProtocolConfig, Transaction, Witness, ZkTransfer,
};

fn fatal(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn print_help() {
    println!("Usage: zktx <identity|commit|prove|verify|demo> ...");
    println!("  identity <seed>");
    println!("  commit <value>");
    println!("  prove --seed <seed> --to <receiver_hex> --value <value> [--out <file>]");
    println!("  verify <envelope.json>");
    println!("  demo [--config <file>] [--state <file>]");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let mut args = env::args().skip(1);
    let command = args.next();
    let tail: Vec<String> = args.collect();
    match command.as_deref() {
        Some("identity") => cmd_identity(tail),
        Some("commit") => cmd_commit(tail),
        Some("prove") => cmd_prove(tail),
        Some("verify") => cmd_verify(tail),
        Some("demo") => cmd_demo(tail),
        Some("-h") | Some("--help") => print_help(),
        _ => {
            print_help();
            std::process::exit(1);
        }
    }
}

/// Parses a decimal value or a `0x`-prefixed big-endian hex magnitude.
fn parse_value(raw: &str) -> AssetValue {
    if let Some(hex_digits) = raw.strip_prefix("0x") {
        let bytes = hex::decode(hex_digits)
            .unwrap_or_else(|err| fatal(&format!("invalid hex value {raw}: {err}")));
        return AssetValue::from_be_bytes(&bytes);
    }
    raw.parse::<u128>()
        .map(AssetValue::from)
        .unwrap_or_else(|_| fatal(&format!("invalid value: {raw}")))
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|idx| args.get(idx + 1))
        .cloned()
}

fn cmd_identity(args: Vec<String>) {
    if args.is_empty() {
        eprintln!("Usage: zktx identity <seed>");
        std::process::exit(1);
    }
    println!("{}", Identity::of(&signing_key_from_seed(&args[0])));
}

fn cmd_commit(args: Vec<String>) {
    if args.is_empty() {
        eprintln!("Usage: zktx commit <value>");
        std::process::exit(1);
    }
    println!("{}", commit(&parse_value(&args[0])));
}

fn cmd_prove(args: Vec<String>) {
    let (Some(seed), Some(to), Some(value)) = (
        flag_value(&args, "--seed"),
        flag_value(&args, "--to"),
        flag_value(&args, "--value"),
    ) else {
        eprintln!("Usage: zktx prove --seed <seed> --to <receiver_hex> --value <value> [--out <file>]");
        std::process::exit(1);
    };
    let secret = signing_key_from_seed(&seed);
    let receiver =
        Identity::from_hex(&to).unwrap_or_else(|err| fatal(&format!("invalid receiver: {err}")));
    let commitment = commit(&parse_value(&value));
    let proof = generate_proof(&secret, &receiver, &commitment, &mut OsRng)
        .unwrap_or_else(|err| fatal(&format!("proof generation failed: {err}")));
    let envelope = ProofEnvelope::new(&Identity::of(&secret), &receiver, &commitment, &proof);
    let json = envelope
        .to_json()
        .unwrap_or_else(|err| fatal(&format!("failed to encode envelope: {err}")));
    match flag_value(&args, "--out") {
        Some(out) => {
            fs::write(&out, json)
                .unwrap_or_else(|err| fatal(&format!("failed to write {out}: {err}")));
            println!("proof envelope written to {out}");
        }
        None => println!("{json}"),
    }
}

fn cmd_verify(args: Vec<String>) {
    if args.is_empty() {
        eprintln!("Usage: zktx verify <envelope.json>");
        std::process::exit(1);
    }
    let path = Path::new(&args[0]);
    let text = fs::read_to_string(path)
        .unwrap_or_else(|err| fatal(&format!("failed to read {}: {err}", path.display())));
    let decoded = ProofEnvelope::from_json(&text)
        .and_then(|env| env.decode())
        .unwrap_or_else(|err| fatal(&format!("invalid envelope {}: {err}", path.display())));
    match decoded.verify() {
        Ok(()) => println!(
            "proof verified: {} -> {} ({})",
            decoded.sender, decoded.receiver, decoded.commitment
        ),
        Err(err) => fatal(&format!("verification failed: {err}")),
    }
}

fn cmd_demo(args: Vec<String>) {
    let config = match flag_value(&args, "--config") {
        Some(path) => ProtocolConfig::load(Path::new(&path))
            .unwrap_or_else(|err| fatal(&format!("failed to load config {path}: {err}"))),
        None => ProtocolConfig::default(),
    };
    let state_path = flag_value(&args, "--state");
    let mut state = match &state_path {
        Some(path) => MemoryState::load(Path::new(path))
            .unwrap_or_else(|err| fatal(&format!("failed to load state {path}: {err}"))),
        None => MemoryState::new(),
    };

    let alice = signing_key_from_seed("A");
    let bob = Identity::of(&signing_key_from_seed("B"));
    let carol = signing_key_from_seed("C");
    let value = AssetValue::from(config.demo_asset_value);
    let commitment = commit(&value);
    let sender = Identity::of(&alice);

    let proof = generate_proof(&alice, &bob, &commitment, &mut OsRng)
        .unwrap_or_else(|err| fatal(&format!("proof generation failed: {err}")));
    let direct = verify_proof(&sender, &bob, &commitment, &proof);
    println!("direct proof A -> B: {}", outcome_label(direct.is_ok()));
    let substituted = verify_proof(&sender, &Identity::of(&carol), &commitment, &proof);
    println!(
        "direct proof A -> B checked against C: {}",
        outcome_label(substituted.is_ok())
    );

    let sender_key = balance_key(&sender, &commitment);
    if state.is_empty() {
        zk_transfer::state::add_balance(&mut state, &sender_key, config.demo_asset_value)
            .unwrap_or_else(|err| fatal(&format!("failed to fund sender: {err}")));
    }

    let txs = vec![
        Transaction {
            actor: sender,
            action: ZkTransfer::new(sender, bob, commitment),
            amount: 40,
            witness: Some(Witness {
                sender_secret: alice.clone(),
                asset_value: value.clone(),
            }),
        },
        Transaction {
            actor: Identity::of(&carol),
            action: ZkTransfer::new(sender, bob, commitment),
            amount: 40,
            witness: Some(Witness {
                sender_secret: carol,
                asset_value: value,
            }),
        },
    ];
    let mode = match config.key_mode {
        KeyMode::Ephemeral => "ephemeral",
        KeyMode::Supplied => "supplied",
    };
    let processor = Processor::new(config);
    let outcome = processor
        .process_block(&mut state, &txs)
        .unwrap_or_else(|err| fatal(&format!("block processing failed: {err}")));
    println!("key mode: {mode}");
    for (idx, receipt) in outcome.receipts.iter().enumerate() {
        println!(
            "tx {idx}: success={} compute_units={} error={}",
            receipt.success,
            receipt.compute_units,
            receipt.error.as_deref().unwrap_or("-")
        );
    }
    println!("total compute units: {}", outcome.compute_units);
    let receiver_key = balance_key(&bob, &commitment);
    for (label, key) in [("A", &sender_key), ("B", &receiver_key)] {
        let balance = get_balance(&state, key)
            .unwrap_or_else(|err| fatal(&format!("failed to read balance: {err}")));
        println!("balance {label}: {balance}");
    }
    if let Some(path) = state_path {
        state
            .save(Path::new(&path))
            .unwrap_or_else(|err| fatal(&format!("failed to save state {path}: {err}")));
    }
}

fn outcome_label(accepted: bool) -> &'static str {
    if accepted {
        "accepted"
    } else {
        "rejected"
    }
}
