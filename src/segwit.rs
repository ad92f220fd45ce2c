//! Segregated Witness block rules (BIP141): witness merkle root, coinbase
//! commitment and block weight

use crate::constants::*;
use crate::error::Result;
use crate::hashing::double_sha256_parts;
use crate::mining::merkle_root;
use crate::opcodes::OP_RETURN;
use crate::transaction::Transaction;
use crate::types::Hash;

/// Witness merkle root over the coinbase placeholder (all zeros) followed by
/// the wtxids of `transactions`, all in internal byte order.
pub fn compute_witness_merkle_root(transactions: &[Transaction]) -> Result<Hash> {
    let mut leaves = Vec::with_capacity(transactions.len() + 1);
    leaves.push([0u8; 32]);
    for tx in transactions {
        let mut wtxid = tx.wtxid();
        wtxid.reverse();
        leaves.push(wtxid);
    }
    merkle_root(&leaves)
}

/// Commitment = dSHA256(witness_root ‖ witness_reserved_value)
pub fn compute_witness_commitment(transactions: &[Transaction]) -> Result<Hash> {
    let root = compute_witness_merkle_root(transactions)?;
    Ok(double_sha256_parts(&[&root, &WITNESS_RESERVED_VALUE]))
}

/// OP_RETURN OP_PUSHBYTES_36 aa21a9ed ‖ commitment
pub fn witness_commitment_script(commitment: &Hash) -> Vec<u8> {
    let mut script = Vec::with_capacity(38);
    script.push(OP_RETURN);
    script.push(0x24);
    script.extend_from_slice(&WITNESS_COMMITMENT_HEADER);
    script.extend_from_slice(commitment);
    script
}

/// Extract the commitment hash from a coinbase output script, if it is one
pub fn extract_witness_commitment(script: &[u8]) -> Option<Hash> {
    match script {
        [OP_RETURN, 0x24, a, b, c, d, commitment @ ..]
            if [*a, *b, *c, *d] == WITNESS_COMMITMENT_HEADER && commitment.len() == 32 =>
        {
            commitment.try_into().ok()
        }
        _ => None,
    }
}

/// Check that a coinbase carries the commitment for `transactions`
pub fn validate_witness_commitment(coinbase: &Transaction, transactions: &[Transaction]) -> Result<bool> {
    let expected = compute_witness_commitment(transactions)?;
    Ok(coinbase
        .outputs()
        .iter()
        .rev()
        .find_map(|output| extract_witness_commitment(&output.script_pubkey))
        .map_or(false, |found| found == expected))
}

/// Σ transaction weights
pub fn calculate_block_weight(transactions: &[Transaction]) -> u64 {
    transactions.iter().map(Transaction::weight).sum()
}
