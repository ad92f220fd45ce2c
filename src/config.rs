//! Block assembly and mining configuration
//!
//! Every field has a default; `MinerConfig::from_json` applies overrides
//! from a (possibly partial) JSON document.

use crate::codec::hash_from_hex;
use crate::constants::*;
use crate::error::{EngineError, Result};
use crate::types::Hash;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Coinbase scriptSig: push of the block height 233708
pub const DEFAULT_COINBASE_SCRIPT_SIG: &str = "03233708";

/// Coinbase payout: P2PKH to a fixed key hash
pub const DEFAULT_PAYOUT_SCRIPT: &str = "76a914edf10a7fac6b32e24daa5305c723f3de58db1bc888ac";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Header version
    pub block_version: i32,
    /// Previous block hash exactly as written into the header (hex)
    pub prev_block_hash: String,
    /// Compact difficulty bits written into the header
    pub bits: u32,
    /// Proof-of-work target, big-endian hex
    pub target: String,
    /// Header timestamp (unix seconds)
    pub timestamp: u32,
    /// Highest nonce tried before giving up
    pub max_nonce: u32,
    /// Total block weight budget
    pub max_block_weight: u64,
    /// Weight kept free for header and coinbase
    pub reserved_weight: u64,
    /// Subsidy paid in addition to fees (satoshis)
    pub block_subsidy: i64,
    /// Coinbase scriptSig (hex)
    pub coinbase_script_sig: String,
    /// Coinbase payout scriptPubKey (hex)
    pub payout_script_pubkey: String,
}

impl Default for MinerConfig {
    fn default() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let target = hex::encode(DEFAULT_TARGET);
        Self {
            block_version: BLOCK_VERSION,
            prev_block_hash: target.clone(),
            bits: DEFAULT_BITS,
            target,
            timestamp: now,
            max_nonce: u32::MAX,
            max_block_weight: MAX_BLOCK_WEIGHT,
            reserved_weight: COINBASE_RESERVED_WEIGHT,
            block_subsidy: BLOCK_SUBSIDY,
            coinbase_script_sig: DEFAULT_COINBASE_SCRIPT_SIG.to_string(),
            payout_script_pubkey: DEFAULT_PAYOUT_SCRIPT.to_string(),
        }
    }
}

impl MinerConfig {
    /// Parse overrides from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Weight available to mempool transactions
    pub fn weight_budget(&self) -> u64 {
        self.max_block_weight.saturating_sub(self.reserved_weight)
    }

    pub fn target_bytes(&self) -> Result<Hash> {
        hash_from_hex(&self.target)
    }

    pub fn prev_block_hash_bytes(&self) -> Result<Hash> {
        hash_from_hex(&self.prev_block_hash)
    }

    pub fn coinbase_script_sig_bytes(&self) -> Result<Vec<u8>> {
        Ok(hex::decode(&self.coinbase_script_sig)?)
    }

    pub fn payout_script_bytes(&self) -> Result<Vec<u8>> {
        let script = hex::decode(&self.payout_script_pubkey)?;
        if script.is_empty() {
            return Err(EngineError::InvalidInput("empty payout script".to_string()));
        }
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MinerConfig::default();
        assert_eq!(config.bits, 0x1f00ffff);
        assert_eq!(config.block_version, 4);
        assert_eq!(config.weight_budget(), 3_996_000);
        assert_eq!(config.target_bytes().unwrap(), DEFAULT_TARGET);
    }

    #[test]
    fn test_partial_json_override() {
        let config = MinerConfig::from_json(r#"{"timestamp": 1700000000, "max_block_weight": 8000}"#).unwrap();
        assert_eq!(config.timestamp, 1_700_000_000);
        assert_eq!(config.max_block_weight, 8_000);
        assert_eq!(config.block_subsidy, BLOCK_SUBSIDY);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(MinerConfig::from_json("{"), Err(EngineError::Serialization(_))));
    }
}
