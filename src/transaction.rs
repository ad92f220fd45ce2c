//! Transaction model: inputs, outputs, wire serialization and derived values
//!
//! A `Transaction` is assembled with `TransactionBuilder` and frozen by
//! `finish()`, which computes every derived value once (txid, wtxid, weight,
//! fee, sighash midstate). Nothing can mutate a finished transaction, so the
//! cached values can never go stale.

use crate::address::address_from_script;
use crate::codec::{compact_size, write_var_bytes, ByteReader};
use crate::constants::*;
use crate::error::{EngineError, Result};
use crate::hashing::double_sha256;
use crate::script::to_asm;
use crate::sighash::SighashMidstate;
use crate::types::*;

/// Transaction Output: value × scriptPubKey, plus the record metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub value: i64,
    pub script_pubkey: ByteString,
    pub script_pubkey_asm: String,
    pub script_type: ScriptType,
    pub address: Option<String>,
}

impl Output {
    /// Build an output from bare script bytes, deriving asm, type and address
    pub fn from_script(value: i64, script_pubkey: ByteString) -> Self {
        let script_type = ScriptType::classify(&script_pubkey);
        let address = address_from_script(&script_type, &script_pubkey).ok();
        Self {
            value,
            script_pubkey_asm: to_asm(&script_pubkey),
            script_pubkey,
            script_type,
            address,
        }
    }

    /// value (8B LE signed) ‖ CompactSize(|spk|) ‖ spk
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9 + self.script_pubkey.len());
        self.write_to(&mut buf);
        buf
    }

    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_var_bytes(buf, &self.script_pubkey);
    }
}

/// Transaction Input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub outpoint: OutPoint,
    /// Snapshot of the output being spent; `None` only for coinbase inputs
    pub prevout: Option<Output>,
    pub script_sig: ByteString,
    pub script_sig_asm: String,
    pub witness: Vec<ByteString>,
    pub is_coinbase: bool,
    pub sequence: u32,
}

impl Input {
    pub fn new(
        outpoint: OutPoint,
        prevout: Option<Output>,
        script_sig: ByteString,
        witness: Vec<ByteString>,
        sequence: u32,
    ) -> Self {
        let is_coinbase = outpoint.txid == [0u8; 32] && outpoint.vout == COINBASE_VOUT;
        Self {
            outpoint,
            prevout,
            script_sig_asm: to_asm(&script_sig),
            script_sig,
            witness,
            is_coinbase,
            sequence,
        }
    }

    pub fn has_witness(&self) -> bool {
        !self.witness.is_empty()
    }

    /// Legacy input encoding: outpoint ‖ CompactSize(|scriptSig|) ‖ scriptSig ‖ sequence
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(41 + self.script_sig.len());
        self.write_with_script(&mut buf, &self.script_sig, self.sequence);
        buf
    }

    /// Encode this input with a substituted scriptSig and sequence (used by
    /// the legacy sighash, which never materialises a modified transaction)
    pub(crate) fn write_with_script(&self, buf: &mut Vec<u8>, script_sig: &[u8], sequence: u32) {
        buf.extend_from_slice(&self.outpoint.wire_bytes());
        write_var_bytes(buf, script_sig);
        buf.extend_from_slice(&sequence.to_le_bytes());
    }

    /// Witness stack section: CompactSize(count) then each item length-prefixed
    pub(crate) fn write_witness(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&compact_size(self.witness.len() as u64));
        for item in &self.witness {
            write_var_bytes(buf, item);
        }
    }
}

/// Values derived once from a finished transaction
#[derive(Debug, Clone, PartialEq, Eq)]
struct Derived {
    txid: Hash,
    wtxid: Hash,
    weight: u64,
    fee: i64,
    is_segwit: bool,
    is_bip125_replaceable: bool,
    midstate: SighashMidstate,
}

/// Transaction: version × inputs × outputs × locktime, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    version: i32,
    locktime: u32,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    derived: Derived,
}

/// Accumulates inputs and outputs in order; `finish` freezes the transaction
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    version: i32,
    locktime: u32,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
}

impl TransactionBuilder {
    pub fn new(version: i32, locktime: u32) -> Self {
        Self { version, locktime, inputs: Vec::new(), outputs: Vec::new() }
    }

    pub fn add_input(mut self, input: Input) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn add_output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn finish(self) -> Transaction {
        Transaction::freeze(self.version, self.locktime, self.inputs, self.outputs)
    }

    /// Like `finish`, but rejects value sums (and the fee) that overflow
    /// `i64` instead of saturating them.
    pub fn try_finish(self) -> Result<Transaction> {
        let input_value = checked_value_sum(self.inputs.iter().filter_map(|i| i.prevout.as_ref()).map(|p| p.value))?;
        let output_value = checked_value_sum(self.outputs.iter().map(|o| o.value))?;
        input_value
            .checked_sub(output_value)
            .ok_or_else(|| EngineError::InvalidInput("fee overflows i64".to_string()))?;
        Ok(self.finish())
    }
}

fn checked_value_sum(values: impl IntoIterator<Item = i64>) -> Result<i64> {
    values.into_iter().try_fold(0i64, |acc, value| {
        acc.checked_add(value)
            .ok_or_else(|| EngineError::InvalidInput("value sum overflows i64".to_string()))
    })
}

impl Transaction {
    fn freeze(version: i32, locktime: u32, inputs: Vec<Input>, outputs: Vec<Output>) -> Self {
        let is_segwit = inputs.iter().any(Input::has_witness);
        let is_bip125_replaceable = inputs.iter().any(|i| i.sequence < SEQUENCE_RBF_THRESHOLD);

        let legacy = serialize_legacy(version, locktime, &inputs, &outputs);
        let mut txid = double_sha256(&legacy);
        txid.reverse();

        let (wtxid, weight) = if is_segwit {
            let witness = serialize_with_witness(version, locktime, &inputs, &outputs);
            let mut wtxid = double_sha256(&witness);
            wtxid.reverse();
            // Witness bytes (marker, flag and witness section) count once,
            // everything else four times.
            let witness_only = (witness.len() - legacy.len()) as u64;
            (wtxid, legacy.len() as u64 * 4 + witness_only)
        } else {
            (txid, legacy.len() as u64 * 4)
        };

        let input_value = inputs
            .iter()
            .filter_map(|i| i.prevout.as_ref())
            .fold(0i64, |acc, p| acc.saturating_add(p.value));
        let output_value = outputs.iter().fold(0i64, |acc, o| acc.saturating_add(o.value));

        let midstate = SighashMidstate::compute(&inputs, &outputs);

        Self {
            version,
            locktime,
            inputs,
            outputs,
            derived: Derived {
                txid,
                wtxid,
                weight,
                fee: input_value.saturating_sub(output_value),
                is_segwit,
                is_bip125_replaceable,
                midstate,
            },
        }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn locktime(&self) -> u32 {
        self.locktime
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Transaction id in display (reversed) byte order
    pub fn txid(&self) -> Hash {
        self.derived.txid
    }

    pub fn txid_hex(&self) -> String {
        hex::encode(self.derived.txid)
    }

    /// Witness transaction id in display order; equals the txid for non-segwit
    pub fn wtxid(&self) -> Hash {
        self.derived.wtxid
    }

    pub fn weight(&self) -> u64 {
        self.derived.weight
    }

    /// Σ prevout values − Σ output values; inputs without a prevout are skipped
    pub fn fee(&self) -> i64 {
        self.derived.fee
    }

    /// Fee per weight unit
    pub fn fee_rate(&self) -> f64 {
        if self.derived.weight == 0 {
            return 0.0;
        }
        self.derived.fee as f64 / self.derived.weight as f64
    }

    pub fn is_segwit(&self) -> bool {
        self.derived.is_segwit
    }

    pub fn is_bip125_replaceable(&self) -> bool {
        self.derived.is_bip125_replaceable
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase
    }

    pub(crate) fn midstate(&self) -> &SighashMidstate {
        &self.derived.midstate
    }

    /// version ‖ CompactSize(nIn) ‖ inputs ‖ CompactSize(nOut) ‖ outputs ‖ locktime
    pub fn serialize_legacy(&self) -> Vec<u8> {
        serialize_legacy(self.version, self.locktime, &self.inputs, &self.outputs)
    }

    /// BIP144 serialization with marker and flag; falls back to the legacy
    /// encoding when no input carries a witness
    pub fn serialize_witness(&self) -> Vec<u8> {
        if self.derived.is_segwit {
            serialize_with_witness(self.version, self.locktime, &self.inputs, &self.outputs)
        } else {
            self.serialize_legacy()
        }
    }

    pub fn input(&self, index: usize) -> Result<&Input> {
        self.inputs
            .get(index)
            .ok_or_else(|| EngineError::InvalidInput(format!("input index {} out of range", index)))
    }

    pub fn prevout(&self, index: usize) -> Result<&Output> {
        self.input(index)?.prevout.as_ref().ok_or(EngineError::MissingPrevout(index))
    }

    /// Resolve how input `index` is spent. P2SH outputs spent with a witness
    /// are told apart by the scriptSig length (a push of the 22-byte P2WPKH
    /// or 34-byte P2WSH program).
    pub fn spend_type(&self, index: usize) -> Result<SpendType> {
        let input = self.input(index)?;
        let prevout = self.prevout(index)?;
        match &prevout.script_type {
            ScriptType::P2PKH => Ok(SpendType::P2PKH),
            ScriptType::P2WPKH => Ok(SpendType::P2WPKH),
            ScriptType::P2WSH => Ok(SpendType::P2WSH),
            ScriptType::P2TR => Ok(SpendType::P2TR),
            ScriptType::P2SH => {
                if !input.has_witness() {
                    return Ok(SpendType::P2SH);
                }
                match input.script_sig.len() {
                    P2SH_P2WPKH_SCRIPTSIG_LEN => Ok(SpendType::P2SHP2WPKH),
                    P2SH_P2WSH_SCRIPTSIG_LEN => Ok(SpendType::P2SHP2WSH),
                    len => Err(EngineError::InvalidInput(format!(
                        "P2SH input {} with witness has unexpected scriptSig length {}",
                        index, len
                    ))),
                }
            }
            ScriptType::OpReturn | ScriptType::Unknown(_) => Err(EngineError::InvalidInput(format!(
                "input {} spends unspendable output type {}",
                index, prevout.script_type
            ))),
        }
    }

    /// Decode a legacy or BIP144 witness serialization.
    ///
    /// Prevouts are not part of the wire format and come back as `None`;
    /// asm strings are regenerated and output types classified by template.
    pub fn decode(bytes: &[u8]) -> Result<Transaction> {
        let mut reader = ByteReader::new(bytes);
        let version = reader.read_i32_le()?;

        let mut has_witness = false;
        if reader.peek_u8() == Some(SEGWIT_MARKER) {
            reader.read_u8()?;
            let flag = reader.read_u8()?;
            if flag != SEGWIT_FLAG {
                return Err(EngineError::Decode(format!("invalid segwit flag 0x{:02x}", flag)));
            }
            has_witness = true;
        }

        let input_count = reader.read_compact_size()?;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            let mut txid: Hash = reader.read_array()?;
            txid.reverse();
            let vout = reader.read_u32_le()?;
            let script_sig = reader.read_var_bytes()?.to_vec();
            let sequence = reader.read_u32_le()?;
            inputs.push(Input::new(OutPoint::new(txid, vout), None, script_sig, Vec::new(), sequence));
        }

        let output_count = reader.read_compact_size()?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            let value = reader.read_i64_le()?;
            let script = reader.read_var_bytes()?.to_vec();
            outputs.push(Output::from_script(value, script));
        }

        if has_witness {
            for input in inputs.iter_mut() {
                let items = reader.read_compact_size()?;
                for _ in 0..items {
                    input.witness.push(reader.read_var_bytes()?.to_vec());
                }
            }
        }

        let locktime = reader.read_u32_le()?;
        if !reader.is_empty() {
            return Err(EngineError::Decode(format!("{} trailing bytes after locktime", reader.remaining())));
        }

        TransactionBuilder { version, locktime, inputs, outputs }.try_finish()
    }
}

/// DecodeTransaction: 𝔹* → 𝒯𝒳
pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction> {
    Transaction::decode(bytes)
}

fn serialize_legacy(version: i32, locktime: u32, inputs: &[Input], outputs: &[Output]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(&compact_size(inputs.len() as u64));
    for input in inputs {
        input.write_with_script(&mut buf, &input.script_sig, input.sequence);
    }
    buf.extend_from_slice(&compact_size(outputs.len() as u64));
    for output in outputs {
        output.write_to(&mut buf);
    }
    buf.extend_from_slice(&locktime.to_le_bytes());
    buf
}

fn serialize_with_witness(version: i32, locktime: u32, inputs: &[Input], outputs: &[Output]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&version.to_le_bytes());
    buf.push(SEGWIT_MARKER);
    buf.push(SEGWIT_FLAG);
    buf.extend_from_slice(&compact_size(inputs.len() as u64));
    for input in inputs {
        input.write_with_script(&mut buf, &input.script_sig, input.sequence);
    }
    buf.extend_from_slice(&compact_size(outputs.len() as u64));
    for output in outputs {
        output.write_to(&mut buf);
    }
    for input in inputs {
        input.write_witness(&mut buf);
    }
    buf.extend_from_slice(&locktime.to_le_bytes());
    buf
}
