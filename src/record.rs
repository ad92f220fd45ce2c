//! Mempool transaction records
//!
//! Serde mirror of the JSON records a loader discovers (one per transaction).
//! Declared output types, asm strings and addresses are taken from the record
//! as given; nothing is re-derived from the script bytes.

use crate::codec::hash_from_hex;
use crate::error::Result;
use crate::transaction::{Input, Output, Transaction, TransactionBuilder};
use crate::types::*;
use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub version: i32,
    pub locktime: u32,
    pub vin: Vec<VinRecord>,
    pub vout: Vec<PrevoutRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VinRecord {
    /// Display (big-endian) hex
    pub txid: String,
    pub vout: u32,
    pub prevout: Option<PrevoutRecord>,
    pub scriptsig: String,
    #[serde(default)]
    pub scriptsig_asm: String,
    #[serde(default)]
    pub witness: Option<Vec<String>>,
    pub is_coinbase: bool,
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_redeemscript_asm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_witnessscript_asm: Option<String>,
}

/// Used both for prevouts and for the transaction's own outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrevoutRecord {
    pub scriptpubkey: String,
    #[serde(default)]
    pub scriptpubkey_asm: String,
    pub scriptpubkey_type: ScriptType,
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
    pub value: i64,
}

impl PrevoutRecord {
    pub fn to_output(&self) -> Result<Output> {
        Ok(Output {
            value: self.value,
            script_pubkey: hex::decode(&self.scriptpubkey)?,
            script_pubkey_asm: self.scriptpubkey_asm.clone(),
            script_type: self.scriptpubkey_type.clone(),
            address: self.scriptpubkey_address.clone(),
        })
    }
}

impl VinRecord {
    pub fn to_input(&self) -> Result<Input> {
        let prevout = self.prevout.as_ref().map(PrevoutRecord::to_output).transpose()?;
        let witness = self
            .witness
            .iter()
            .flatten()
            .map(hex::decode)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut input = Input::new(
            OutPoint::new(hash_from_hex(&self.txid)?, self.vout),
            prevout,
            hex::decode(&self.scriptsig)?,
            witness,
            self.sequence,
        );
        input.is_coinbase |= self.is_coinbase;
        if !self.scriptsig_asm.is_empty() {
            input.script_sig_asm = self.scriptsig_asm.clone();
        }
        Ok(input)
    }
}

impl TxRecord {
    /// Decode every hex field and freeze the result into a `Transaction`
    pub fn into_transaction(self) -> Result<Transaction> {
        let mut builder = TransactionBuilder::new(self.version, self.locktime);
        for vin in &self.vin {
            builder = builder.add_input(vin.to_input()?);
        }
        for vout in &self.vout {
            builder = builder.add_output(vout.to_output()?);
        }
        builder.try_finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordDocument {
    One(TxRecord),
    Many(Vec<TxRecord>),
}

/// Parse a JSON document holding one record or an array of records
pub fn load_records_from_str(json: &str) -> anyhow::Result<Vec<Transaction>> {
    let document: RecordDocument = serde_json::from_str(json).context("malformed transaction record")?;
    let records = match document {
        RecordDocument::One(record) => vec![record],
        RecordDocument::Many(records) => records,
    };
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .into_transaction()
                .with_context(|| format!("record {} has undecodable fields", index))
        })
        .collect()
}
