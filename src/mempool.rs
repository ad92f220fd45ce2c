//! Candidate set for block assembly
//!
//! Tracks which outpoints are spent by which candidate, applies BIP125
//! replacement on conflicts, and selects transactions by descending feerate
//! under a weight budget. The state is scoped to one block assembly and owned
//! by the `Mempool` value.

use crate::transaction::Transaction;
use crate::types::*;
use log::{debug, info};
use std::collections::HashMap;

/// AcceptToMemoryPool outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MempoolResult {
    Accepted,
    /// Accepted after evicting the listed conflicting transactions (txids)
    Replaced(Vec<Hash>),
    Rejected(String),
}

#[derive(Debug, Clone, Default)]
pub struct Mempool {
    candidates: HashMap<Hash, Transaction>,
    /// outpoint → txid of the candidate spending it
    spent: HashMap<OutPoint, Hash>,
    /// txids in arrival order; ties in feerate keep this order
    arrival: Vec<Hash>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn contains(&self, txid: &Hash) -> bool {
        self.candidates.contains_key(txid)
    }

    pub fn get(&self, txid: &Hash) -> Option<&Transaction> {
        self.candidates.get(txid)
    }

    /// Candidate currently spending `outpoint`
    pub fn spender_of(&self, outpoint: &OutPoint) -> Option<&Hash> {
        self.spent.get(outpoint)
    }

    /// AcceptToMemoryPool: 𝒯𝒳 → {accepted, replaced, rejected}
    ///
    /// A transaction spending an outpoint already claimed by a candidate
    /// replaces every conflicting candidate when it signals BIP125
    /// replaceability; otherwise it is dropped.
    pub fn accept_to_memory_pool(&mut self, tx: Transaction) -> MempoolResult {
        let txid = tx.txid();
        if self.contains(&txid) {
            return MempoolResult::Rejected(format!("{} already in mempool", hex::encode(txid)));
        }

        let mut conflicts: Vec<Hash> = Vec::new();
        for input in tx.inputs().iter().filter(|i| !i.is_coinbase) {
            if let Some(spender) = self.spent.get(&input.outpoint) {
                if !conflicts.contains(spender) {
                    conflicts.push(*spender);
                }
            }
        }

        if !conflicts.is_empty() && !tx.is_bip125_replaceable() {
            debug!(
                "dropping {}: conflicts with {} candidate(s) and does not signal replaceability",
                hex::encode(txid),
                conflicts.len()
            );
            return MempoolResult::Rejected(format!(
                "{} double-spends a candidate without signalling replaceability",
                hex::encode(txid)
            ));
        }

        for conflict in &conflicts {
            self.remove(conflict);
            info!("replaced {} with {}", hex::encode(conflict), hex::encode(txid));
        }
        self.insert(tx);

        if conflicts.is_empty() {
            MempoolResult::Accepted
        } else {
            MempoolResult::Replaced(conflicts)
        }
    }

    fn insert(&mut self, tx: Transaction) {
        let txid = tx.txid();
        for input in tx.inputs().iter().filter(|i| !i.is_coinbase) {
            self.spent.insert(input.outpoint, txid);
        }
        self.arrival.push(txid);
        self.candidates.insert(txid, tx);
    }

    /// Remove a candidate and release the outpoints it spent
    pub fn remove(&mut self, txid: &Hash) -> Option<Transaction> {
        let tx = self.candidates.remove(txid)?;
        for input in tx.inputs() {
            if self.spent.get(&input.outpoint) == Some(txid) {
                self.spent.remove(&input.outpoint);
            }
        }
        self.arrival.retain(|id| id != txid);
        Some(tx)
    }

    /// Candidates sorted by descending feerate (stable on arrival order)
    pub fn sorted_by_fee_rate(&self) -> Vec<&Transaction> {
        let mut sorted: Vec<&Transaction> = self.arrival.iter().filter_map(|id| self.candidates.get(id)).collect();
        sorted.sort_by(|a, b| b.fee_rate().total_cmp(&a.fee_rate()));
        sorted
    }

    /// SelectTransactions: 𝒯𝒳* × ℕ → 𝒯𝒳*
    ///
    /// Greedy packing in feerate order; a transaction that does not fit the
    /// remaining budget is skipped and smaller ones may still be taken.
    pub fn select_transactions(&self, weight_budget: u64) -> Vec<Transaction> {
        let mut selected = Vec::new();
        let mut block_weight = 0u64;
        for tx in self.sorted_by_fee_rate() {
            if block_weight + tx.weight() > weight_budget {
                continue;
            }
            block_weight += tx.weight();
            selected.push(tx.clone());
        }
        info!(
            "selected {} of {} candidates, weight {} of {}, fees {}",
            selected.len(),
            self.len(),
            block_weight,
            weight_budget,
            total_fee(&selected)
        );
        selected
    }
}

/// Σ fee over `transactions`, saturating at the `i64` bounds
pub fn total_fee(transactions: &[Transaction]) -> i64 {
    transactions.iter().fold(0i64, |acc, tx| acc.saturating_add(tx.fee()))
}
