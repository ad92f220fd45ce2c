//! Selection, replacement, block assembly and the nonce search

mod common;

use btc_tx_engine::mining::merkle_root;
use btc_tx_engine::segwit::{extract_witness_commitment, validate_witness_commitment};
use btc_tx_engine::*;
use common::*;

fn config() -> MinerConfig {
    MinerConfig { timestamp: 1_710_000_000, ..MinerConfig::default() }
}

/// Same-shaped spends so feerate ordering follows the fee
fn spend_with_fee(fill: u8, fee: i64, sequence: u32) -> Transaction {
    let prevout = Output::from_script(100_000, p2wpkh_script(&[fill; 33]));
    let unsigned = unsigned_spend(prevout, fill, 100_000 - fee, sequence);
    with_unlocking(&unsigned, vec![(vec![], vec![vec![0x30; 71], vec![0x02; 33]])])
}

#[test]
fn test_feerate_order_under_budget() {
    init_logger();
    let low = spend_with_fee(1, 1_000, 0xffffffff);
    let high = spend_with_fee(2, 5_000, 0xffffffff);
    let mid = spend_with_fee(3, 2_500, 0xffffffff);
    let weight = low.weight();
    assert_eq!(weight, high.weight());

    let mut mempool = Mempool::new();
    for tx in [low, high.clone(), mid.clone()] {
        assert_eq!(mempool.accept_to_memory_pool(tx), MempoolResult::Accepted);
    }

    let selected = mempool.select_transactions(2 * weight);
    let ids: Vec<Hash> = selected.iter().map(Transaction::txid).collect();
    assert_eq!(ids, vec![high.txid(), mid.txid()]);
    assert_eq!(mempool::total_fee(&selected), 7_500);

    let template = mining::create_block_template(&config(), selected).unwrap();
    assert_eq!(template.coinbase_tx.outputs()[0].value, BLOCK_SUBSIDY + 7_500);
}

#[test]
fn test_equal_feerates_keep_arrival_order() {
    let first = spend_with_fee(4, 2_000, 0xffffffff);
    let second = spend_with_fee(5, 2_000, 0xffffffff);
    let mut mempool = Mempool::new();
    mempool.accept_to_memory_pool(first.clone());
    mempool.accept_to_memory_pool(second.clone());
    let order: Vec<Hash> = mempool.sorted_by_fee_rate().iter().map(|tx| tx.txid()).collect();
    assert_eq!(order, vec![first.txid(), second.txid()]);
}

#[test]
fn test_zero_budget_selects_nothing() {
    let mut mempool = Mempool::new();
    mempool.accept_to_memory_pool(spend_with_fee(6, 1_000, 0xffffffff));
    assert!(mempool.select_transactions(0).is_empty());
}

#[test]
fn test_rbf_replacement_frees_and_reclaims_outpoint() {
    let original = spend_with_fee(7, 1_000, 0xffffffff);
    let replacement = spend_with_fee(7, 3_000, SEQUENCE_RBF_THRESHOLD - 1);
    let outpoint = original.inputs()[0].outpoint;

    let mut mempool = Mempool::new();
    mempool.accept_to_memory_pool(original.clone());
    assert_eq!(
        mempool.accept_to_memory_pool(replacement.clone()),
        MempoolResult::Replaced(vec![original.txid()])
    );
    assert_eq!(mempool.len(), 1);
    assert_eq!(mempool.spender_of(&outpoint), Some(&replacement.txid()));

    // the evicted transaction cannot come back without signalling
    assert!(matches!(mempool.accept_to_memory_pool(original), MempoolResult::Rejected(_)));
}

#[test]
fn test_rbf_replaces_every_conflict() {
    let a = spend_with_fee(8, 1_000, 0xffffffff);
    let b = spend_with_fee(9, 1_000, 0xffffffff);

    // spends both outpoints at once
    let mut builder = TransactionBuilder::new(2, 0);
    for tx in [&a, &b] {
        let input = &tx.inputs()[0];
        builder = builder.add_input(Input::new(
            input.outpoint,
            input.prevout.clone(),
            vec![],
            vec![vec![0x30; 71], vec![0x02; 33]],
            0,
        ));
    }
    let both = builder.add_output(Output::from_script(150_000, p2wpkh_script(&[0x05; 33]))).finish();

    let mut mempool = Mempool::new();
    mempool.accept_to_memory_pool(a.clone());
    mempool.accept_to_memory_pool(b.clone());
    match mempool.accept_to_memory_pool(both) {
        MempoolResult::Replaced(evicted) => {
            assert_eq!(evicted.len(), 2);
            assert!(evicted.contains(&a.txid()) && evicted.contains(&b.txid()));
        }
        other => panic!("expected replacement, got {:?}", other),
    }
    assert_eq!(mempool.len(), 1);
}

#[test]
fn test_template_merkle_and_commitment() {
    let txs = vec![load_one(TAPROOT_RECORD), load_one(P2WPKH_RECORD)];
    let template = mining::create_block_template(&config(), txs.clone()).unwrap();

    let leaves: Vec<Hash> = std::iter::once(&template.coinbase_tx)
        .chain(txs.iter())
        .map(|tx| btc_tx_engine::codec::reversed(&tx.txid()))
        .collect();
    assert_eq!(template.header.merkle_root, merkle_root(&leaves).unwrap());
    assert!(validate_witness_commitment(&template.coinbase_tx, &txs).unwrap());
    assert!(!validate_witness_commitment(&template.coinbase_tx, &txs[..1]).unwrap());

    let commitment_output = &template.coinbase_tx.outputs()[1];
    assert!(extract_witness_commitment(&commitment_output.script_pubkey).is_some());
    assert_eq!(template.coinbase_tx.outputs()[0].value, BLOCK_SUBSIDY + 2_068 + 2_170);
}

#[test]
fn test_engine_assembles_and_mines_block() {
    init_logger();
    let engine = TxEngine::with_config(config());
    let records = vec![load_one(TAPROOT_RECORD), load_one(P2WPKH_RECORD)];
    let invalid = load_one(&TAPROOT_RECORD.replace("926b7ed7fb6f", "926b7ed7fb6e"));

    let mempool = engine.build_mempool(vec![invalid, records[0].clone(), records[1].clone()]);
    assert_eq!(mempool.len(), 2);

    match engine.assemble_block(records.clone()).unwrap() {
        MiningResult::Success(block) => {
            assert!(block.block_hash() < DEFAULT_TARGET);
            let lines = block.output_lines();
            assert_eq!(lines.len(), 5);
            assert_eq!(lines[0], hex::encode(block.header.serialize()));
            assert_eq!(lines[0].len(), 160);
            assert_eq!(lines[2], block.coinbase_tx.txid_hex());
            // P2WPKH pays the higher feerate
            assert_eq!(lines[3], records[1].txid_hex());
            assert_eq!(lines[4], TAPROOT_TXID);
        }
        MiningResult::Exhausted => panic!("default target should be reachable"),
    }
}

#[test]
fn test_header_carries_config_fields() {
    let template = mining::create_block_template(&config(), Vec::new()).unwrap();
    let bytes = template.header.serialize();
    assert_eq!(&bytes[4..36], &DEFAULT_TARGET);
    assert_eq!(u32::from_le_bytes(bytes[68..72].try_into().unwrap()), 1_710_000_000);
    assert_eq!(u32::from_le_bytes(bytes[72..76].try_into().unwrap()), DEFAULT_BITS);
}
