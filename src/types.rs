//! Core types shared by the transaction engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Reference to a previous transaction output.
///
/// `txid` is kept in display order (the order used by explorers and the
/// record format); wire serialization reverses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// 36-byte wire encoding: reversed txid ‖ vout (LE)
    pub fn wire_bytes(&self) -> [u8; 36] {
        let mut out = [0u8; 36];
        let mut txid = self.txid;
        txid.reverse();
        out[..32].copy_from_slice(&txid);
        out[32..].copy_from_slice(&self.vout.to_le_bytes());
        out
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.txid), self.vout)
    }
}

/// Declared locking-script type of an output.
///
/// The classification is trusted as provided by the record; it is never
/// re-derived from the script bytes during validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScriptType {
    P2PKH,
    P2SH,
    P2WPKH,
    P2WSH,
    P2TR,
    OpReturn,
    Unknown(String),
}

impl ScriptType {
    pub fn as_str(&self) -> &str {
        match self {
            ScriptType::P2PKH => "p2pkh",
            ScriptType::P2SH => "p2sh",
            ScriptType::P2WPKH => "v0_p2wpkh",
            ScriptType::P2WSH => "v0_p2wsh",
            ScriptType::P2TR => "v1_p2tr",
            ScriptType::OpReturn => "op_return",
            ScriptType::Unknown(name) => name,
        }
    }

    /// Classify a script by its standard template. Only used when decoding
    /// raw transactions, which carry no declared type.
    pub fn classify(script: &[u8]) -> Self {
        match script {
            [0x76, 0xa9, 0x14, .., 0x88, 0xac] if script.len() == 25 => ScriptType::P2PKH,
            [0xa9, 0x14, .., 0x87] if script.len() == 23 => ScriptType::P2SH,
            [0x00, 0x14, ..] if script.len() == 22 => ScriptType::P2WPKH,
            [0x00, 0x20, ..] if script.len() == 34 => ScriptType::P2WSH,
            [0x51, 0x20, ..] if script.len() == 34 => ScriptType::P2TR,
            [0x6a, ..] => ScriptType::OpReturn,
            _ => ScriptType::Unknown("unknown".to_string()),
        }
    }

    pub fn is_segwit(&self) -> bool {
        matches!(self, ScriptType::P2WPKH | ScriptType::P2WSH | ScriptType::P2TR)
    }
}

impl From<String> for ScriptType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "p2pkh" => ScriptType::P2PKH,
            "p2sh" => ScriptType::P2SH,
            "v0_p2wpkh" => ScriptType::P2WPKH,
            "v0_p2wsh" => ScriptType::P2WSH,
            "v1_p2tr" => ScriptType::P2TR,
            "op_return" => ScriptType::OpReturn,
            _ => ScriptType::Unknown(name),
        }
    }
}

impl From<ScriptType> for String {
    fn from(script_type: ScriptType) -> Self {
        script_type.as_str().to_string()
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an input is actually spent, after resolving P2SH-wrapped segwit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendType {
    P2PKH,
    P2SH,
    P2SHP2WPKH,
    P2SHP2WSH,
    P2WPKH,
    P2WSH,
    P2TR,
}

impl SpendType {
    /// True for spends signed with the BIP143 digest
    pub fn uses_bip143(&self) -> bool {
        matches!(
            self,
            SpendType::P2WPKH | SpendType::P2WSH | SpendType::P2SHP2WPKH | SpendType::P2SHP2WSH
        )
    }
}

/// Signature hash type byte: ALL/NONE/SINGLE combined with ANYONECANPAY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SigHashType(pub u8);

impl SigHashType {
    pub const DEFAULT: SigHashType = SigHashType(0x00);
    pub const ALL: SigHashType = SigHashType(0x01);
    pub const NONE: SigHashType = SigHashType(0x02);
    pub const SINGLE: SigHashType = SigHashType(0x03);
    pub const ANYONE_CAN_PAY: u8 = 0x80;
    pub const ALL_ANYONECANPAY: SigHashType = SigHashType(0x81);
    pub const NONE_ANYONECANPAY: SigHashType = SigHashType(0x82);
    pub const SINGLE_ANYONECANPAY: SigHashType = SigHashType(0x83);

    pub fn anyone_can_pay(&self) -> bool {
        self.0 & Self::ANYONE_CAN_PAY != 0
    }

    /// Output commitment mode; SIGHASH_DEFAULT (0x00) behaves as ALL
    pub fn base(&self) -> SigHashBase {
        match self.0 & 0x1f {
            0x02 => SigHashBase::None,
            0x03 => SigHashBase::Single,
            _ => SigHashBase::All,
        }
    }

    pub fn as_u32(&self) -> u32 {
        self.0 as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigHashBase {
    All,
    None,
    Single,
}

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}
