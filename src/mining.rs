//! Block assembly and proof-of-work search
//!
//! The miner is an exhaustive local nonce search against a fixed target with
//! no difficulty retargeting.

use crate::config::MinerConfig;
use crate::constants::*;
use crate::error::{EngineError, Result};
use crate::hashing::{double_sha256, double_sha256_parts};
use crate::mempool::total_fee;
use crate::segwit::{compute_witness_commitment, witness_commitment_script};
use crate::transaction::{Input, Output, Transaction, TransactionBuilder};
use crate::types::*;
use log::{debug, info, warn};

/// MerkleRoot: 𝕳⁺ → 𝕳
///
/// Pairs adjacent leaves (duplicating the last one on odd levels) and hashes
/// each pair with double SHA-256 until one hash remains. Leaves and result
/// are in internal byte order. An empty list has no root.
pub fn merkle_root(leaves: &[Hash]) -> Result<Hash> {
    if leaves.is_empty() {
        return Err(EngineError::InvalidInput("merkle root of an empty list".to_string()));
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        level = level
            .chunks_exact(2)
            .map(|pair| double_sha256_parts(&[&pair[0], &pair[1]]))
            .collect();
    }
    Ok(level[0])
}

/// Block header: version ‖ prev_block_hash ‖ merkle_root ‖ time ‖ bits ‖ nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    /// As written on the wire
    pub prev_block_hash: Hash,
    /// Internal byte order
    pub merkle_root: Hash,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn serialize(&self) -> [u8; 80] {
        let mut out = [0u8; 80];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(&self.prev_block_hash);
        out[36..68].copy_from_slice(&self.merkle_root);
        out[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Block hash in display (big-endian) order
    pub fn hash(&self) -> Hash {
        let mut hash = double_sha256(&self.serialize());
        hash.reverse();
        hash
    }
}

/// CreateCoinbase: ℤ × 𝕳 → 𝒯𝒳
///
/// One input spending the null outpoint with the witness reserved value as
/// its only witness item; output 0 pays subsidy + fees, output 1 carries the
/// witness commitment.
pub fn create_coinbase_transaction(config: &MinerConfig, fees: i64, witness_commitment: &Hash) -> Result<Transaction> {
    let input = Input::new(
        OutPoint::new([0u8; 32], COINBASE_VOUT),
        None,
        config.coinbase_script_sig_bytes()?,
        vec![WITNESS_RESERVED_VALUE.to_vec()],
        0,
    );
    let value = config
        .block_subsidy
        .checked_add(fees)
        .ok_or_else(|| EngineError::InvalidInput(format!("subsidy plus {} sat fees overflows", fees)))?;
    let payout = Output::from_script(value, config.payout_script_bytes()?);
    let commitment = Output::from_script(0, witness_commitment_script(witness_commitment));

    Ok(TransactionBuilder::new(0, 0)
        .add_input(input)
        .add_output(payout)
        .add_output(commitment)
        .finish())
}

/// BlockTemplate: everything except a valid nonce
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub header: BlockHeader,
    pub coinbase_tx: Transaction,
    pub transactions: Vec<Transaction>,
    pub target: Hash,
}

/// CreateBlockTemplate: 𝒞 × 𝒯𝒳* → 𝒯
///
/// Builds the coinbase (with witness commitment) for the already-selected
/// transactions and computes the header merkle root over their txids.
pub fn create_block_template(config: &MinerConfig, transactions: Vec<Transaction>) -> Result<BlockTemplate> {
    let commitment = compute_witness_commitment(&transactions)?;
    debug!("witness commitment {}", hex::encode(commitment));

    let fees = total_fee(&transactions);
    let coinbase_tx = create_coinbase_transaction(config, fees, &commitment)?;

    let txids: Vec<Hash> = std::iter::once(&coinbase_tx)
        .chain(transactions.iter())
        .map(|tx| {
            let mut txid = tx.txid();
            txid.reverse();
            txid
        })
        .collect();

    let header = BlockHeader {
        version: config.block_version,
        prev_block_hash: config.prev_block_hash_bytes()?,
        merkle_root: merkle_root(&txids)?,
        timestamp: config.timestamp,
        bits: config.bits,
        nonce: 0,
    };

    info!(
        "block template: {} transactions, {} sat fees, coinbase value {}",
        transactions.len(),
        fees,
        config.block_subsidy.saturating_add(fees)
    );

    Ok(BlockTemplate { header, coinbase_tx, transactions, target: config.target_bytes()? })
}

/// Outcome of a nonce search
#[derive(Debug, Clone)]
pub enum MiningResult {
    Success(MinedBlock),
    /// Every nonce up to the limit was tried without meeting the target
    Exhausted,
}

/// MineBlock: 𝒯 × ℕ → ℬ ∪ {failure}
///
/// Tries nonces from 0 to `max_nonce` inclusive and stops at the first
/// header whose hash is strictly below the target.
pub fn mine_block(template: BlockTemplate, max_nonce: u32) -> MiningResult {
    let mut header = template.header;
    for nonce in 0..=max_nonce {
        header.nonce = nonce;
        if header.hash() < template.target {
            info!("found nonce {} for block {}", nonce, hex::encode(header.hash()));
            return MiningResult::Success(MinedBlock {
                header,
                coinbase_tx: template.coinbase_tx,
                transactions: template.transactions,
            });
        }
    }
    warn!("nonce space exhausted after {} attempts", max_nonce as u64 + 1);
    MiningResult::Exhausted
}

/// A block with a header meeting the target
#[derive(Debug, Clone)]
pub struct MinedBlock {
    pub header: BlockHeader,
    pub coinbase_tx: Transaction,
    pub transactions: Vec<Transaction>,
}

impl MinedBlock {
    pub fn block_hash(&self) -> Hash {
        self.header.hash()
    }

    /// Output artifact lines: header hex, coinbase witness serialization hex,
    /// coinbase txid, then the txid of every included transaction
    pub fn output_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.transactions.len() + 3);
        lines.push(hex::encode(self.header.serialize()));
        lines.push(hex::encode(self.coinbase_tx.serialize_witness()));
        lines.push(self.coinbase_tx.txid_hex());
        lines.extend(self.transactions.iter().map(Transaction::txid_hex));
        lines
    }
}
