//! # btc-tx-engine
//!
//! Bitcoin transaction engine: parses mempool transaction records, validates
//! them (script execution, structural metadata, hash commitments and
//! signatures), selects the most profitable valid set under the block weight
//! limit with BIP125 replacement, and assembles and mines a block.
//!
//! ## Pipeline
//!
//! - records → `Transaction` (frozen; txid, wtxid, weight, fee and sighash
//!   midstates computed once)
//! - `Transaction` → `Validator` (accept/reject, never aborts the batch)
//! - accepted → `Mempool` (conflicts resolved by BIP125) → feerate selection
//! - selection → `BlockTemplate` (coinbase + witness commitment) → nonce search
//!
//! ## Usage
//!
//! ```rust
//! use btc_tx_engine::TxEngine;
//! use btc_tx_engine::config::MinerConfig;
//!
//! let engine = TxEngine::with_config(MinerConfig { timestamp: 1_700_000_000, ..MinerConfig::default() });
//! let mempool = engine.build_mempool(Vec::new());
//! let selected = engine.select_transactions(&mempool);
//! let template = engine.create_block_template(selected).unwrap();
//! assert_eq!(template.coinbase_tx.outputs().len(), 2);
//! ```

pub mod address;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod hashing;
pub mod mempool;
pub mod mining;
pub mod opcodes;
pub mod record;
pub mod script;
pub mod segwit;
pub mod sighash;
pub mod signature;
pub mod taproot;
pub mod transaction;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::MinerConfig;
pub use constants::*;
pub use error::{EngineError, Result};
pub use mempool::{Mempool, MempoolResult};
pub use mining::{BlockHeader, BlockTemplate, MinedBlock, MiningResult};
pub use transaction::{decode_transaction, Input, Output, Transaction, TransactionBuilder};
pub use types::*;
pub use validation::Validator;

use log::info;

/// Engine facade: one validator and one miner configuration
///
/// # Examples
///
/// ```
/// use btc_tx_engine::*;
///
/// let engine = TxEngine::new();
///
/// // A spend of an unknown-type output is rejected, not an error
/// let mut script = vec![0x00, 0x14];
/// script.extend_from_slice(&[0x11; 20]);
/// let tx = TransactionBuilder::new(2, 0)
///     .add_input(Input::new(
///         OutPoint::new([7u8; 32], 0),
///         Some(Output::from_script(10_000, vec![0x51])),
///         vec![],
///         vec![],
///         0xffffffff,
///     ))
///     .add_output(Output::from_script(9_000, script))
///     .finish();
///
/// assert!(!engine.validate_transaction(&tx).is_valid());
/// ```
pub struct TxEngine {
    validator: Validator,
    config: MinerConfig,
}

impl Default for TxEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TxEngine {
    /// Engine with the secp256k1 verifier and the default miner configuration
    pub fn new() -> Self {
        Self::with_config(MinerConfig::default())
    }

    /// # Examples
    ///
    /// ```
    /// use btc_tx_engine::{MinerConfig, TxEngine};
    ///
    /// let config = MinerConfig::from_json(r#"{"max_block_weight": 8000}"#).unwrap();
    /// let engine = TxEngine::with_config(config);
    /// assert_eq!(engine.config().weight_budget(), 4000);
    /// ```
    pub fn with_config(config: MinerConfig) -> Self {
        Self { validator: Validator::new(), config }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Run the four validation checks on one transaction
    pub fn validate_transaction(&self, tx: &Transaction) -> ValidationResult {
        self.validator.validate(tx)
    }

    /// Validate each transaction and offer the valid ones to a fresh mempool
    /// in the given order; invalid ones are logged and skipped.
    pub fn build_mempool(&self, transactions: impl IntoIterator<Item = Transaction>) -> Mempool {
        let mut mempool = Mempool::new();
        let mut rejected = 0usize;
        for tx in transactions {
            if self.validate_transaction(&tx).is_valid() {
                mempool.accept_to_memory_pool(tx);
            } else {
                rejected += 1;
            }
        }
        info!("mempool built: {} candidates, {} rejected", mempool.len(), rejected);
        mempool
    }

    /// Feerate-ordered selection under the configured weight budget
    pub fn select_transactions(&self, mempool: &Mempool) -> Vec<Transaction> {
        mempool.select_transactions(self.config.weight_budget())
    }

    pub fn create_block_template(&self, transactions: Vec<Transaction>) -> Result<BlockTemplate> {
        mining::create_block_template(&self.config, transactions)
    }

    /// Nonce search up to the configured `max_nonce`
    ///
    /// # Examples
    ///
    /// ```
    /// use btc_tx_engine::*;
    ///
    /// let engine = TxEngine::with_config(MinerConfig { max_nonce: 0, ..MinerConfig::default() });
    /// let mut template = engine.create_block_template(Vec::new()).unwrap();
    /// template.target = [0u8; 32];
    /// assert!(matches!(engine.mine_block(template), MiningResult::Exhausted));
    /// ```
    pub fn mine_block(&self, template: BlockTemplate) -> MiningResult {
        mining::mine_block(template, self.config.max_nonce)
    }

    /// Validate, select, assemble and mine in one call
    pub fn assemble_block(&self, transactions: impl IntoIterator<Item = Transaction>) -> Result<MiningResult> {
        let mempool = self.build_mempool(transactions);
        let selected = self.select_transactions(&mempool);
        let template = self.create_block_template(selected)?;
        Ok(self.mine_block(template))
    }
}
