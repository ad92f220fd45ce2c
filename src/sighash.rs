//! Signature hash computation: legacy, BIP143 (segwit v0) and BIP341 (taproot)
//!
//! All digests are returned in internal byte order, ready to be used as the
//! 32-byte message for ECDSA or Schnorr verification.

use crate::codec::{compact_size, write_var_bytes};
use crate::constants::*;
use crate::error::{EngineError, Result};
use crate::hashing::{double_sha256, hash160, sha256, tagged_hash};
use crate::opcodes::*;
use crate::transaction::{Input, Output, Transaction};
use crate::types::*;

// ============================================================================
// AGGREGATE HASH CACHE
// ============================================================================

/// Per-transaction aggregate hashes, computed once when the transaction is
/// frozen and shared by every input signed with a committing sighash type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SighashMidstate {
    /// BIP143: dSHA256 of all outpoints
    pub hash_prevouts: Hash,
    /// BIP143: dSHA256 of all sequences
    pub hash_sequence: Hash,
    /// BIP143: dSHA256 of all outputs
    pub hash_outputs: Hash,
    /// BIP341: SHA256 of all outputs
    pub sha_outputs: Hash,
    /// BIP341 input aggregates; `None` when a prevout is unknown
    pub taproot: Option<TaprootMidstate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaprootMidstate {
    pub sha_prevouts: Hash,
    pub sha_amounts: Hash,
    pub sha_script_pubkeys: Hash,
    pub sha_sequences: Hash,
}

impl SighashMidstate {
    pub(crate) fn compute(inputs: &[Input], outputs: &[Output]) -> Self {
        let mut prevouts = Vec::with_capacity(inputs.len() * 36);
        let mut sequences = Vec::with_capacity(inputs.len() * 4);
        for input in inputs {
            prevouts.extend_from_slice(&input.outpoint.wire_bytes());
            sequences.extend_from_slice(&input.sequence.to_le_bytes());
        }
        let mut serialized_outputs = Vec::new();
        for output in outputs {
            output.write_to(&mut serialized_outputs);
        }

        let taproot = if inputs.iter().all(|i| i.prevout.is_some()) {
            let mut amounts = Vec::with_capacity(inputs.len() * 8);
            let mut script_pubkeys = Vec::new();
            for prevout in inputs.iter().filter_map(|i| i.prevout.as_ref()) {
                amounts.extend_from_slice(&prevout.value.to_le_bytes());
                write_var_bytes(&mut script_pubkeys, &prevout.script_pubkey);
            }
            Some(TaprootMidstate {
                sha_prevouts: sha256(&prevouts),
                sha_amounts: sha256(&amounts),
                sha_script_pubkeys: sha256(&script_pubkeys),
                sha_sequences: sha256(&sequences),
            })
        } else {
            None
        };

        Self {
            hash_prevouts: double_sha256(&prevouts),
            hash_sequence: double_sha256(&sequences),
            hash_outputs: double_sha256(&serialized_outputs),
            sha_outputs: sha256(&serialized_outputs),
            taproot,
        }
    }
}

// ============================================================================
// LEGACY
// ============================================================================

/// Legacy signature hash for P2PKH and bare P2SH inputs.
///
/// The signing serialization is written directly: the signed input carries
/// `script_code`, every other input an empty scriptSig. NONE and SINGLE zero
/// the other inputs' sequences; ANYONECANPAY keeps only the signed input.
/// SINGLE with no matching output yields the historical digest `1`.
pub fn legacy_sighash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: SigHashType,
) -> Result<Hash> {
    let signed = tx.input(input_index)?;
    let base = sighash_type.base();

    if base == SigHashBase::Single && input_index >= tx.outputs().len() {
        let mut one = [0u8; 32];
        one[0] = 0x01;
        return Ok(one);
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(&tx.version().to_le_bytes());

    if sighash_type.anyone_can_pay() {
        buf.push(0x01);
        signed.write_with_script(&mut buf, script_code, signed.sequence);
    } else {
        buf.extend_from_slice(&compact_size(tx.inputs().len() as u64));
        for (index, input) in tx.inputs().iter().enumerate() {
            if index == input_index {
                input.write_with_script(&mut buf, script_code, input.sequence);
            } else {
                let sequence = match base {
                    SigHashBase::All => input.sequence,
                    SigHashBase::None | SigHashBase::Single => 0,
                };
                input.write_with_script(&mut buf, &[], sequence);
            }
        }
    }

    match base {
        SigHashBase::All => {
            buf.extend_from_slice(&compact_size(tx.outputs().len() as u64));
            for output in tx.outputs() {
                output.write_to(&mut buf);
            }
        }
        SigHashBase::None => buf.push(0x00),
        SigHashBase::Single => {
            buf.extend_from_slice(&compact_size(input_index as u64 + 1));
            for _ in 0..input_index {
                // blanked output: value -1, empty script
                buf.extend_from_slice(&(-1i64).to_le_bytes());
                buf.push(0x00);
            }
            tx.outputs()[input_index].write_to(&mut buf);
        }
    }

    buf.extend_from_slice(&tx.locktime().to_le_bytes());
    buf.extend_from_slice(&sighash_type.as_u32().to_le_bytes());
    Ok(double_sha256(&buf))
}

// ============================================================================
// BIP143
// ============================================================================

/// scriptCode for P2WPKH: the P2PKH template over HASH160(pubkey), length-prefixed
pub fn p2wpkh_script_code(pubkey: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(26);
    script.push(0x19);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, OP_PUSHBYTES_20]);
    script.extend_from_slice(&hash160(pubkey));
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

/// scriptCode for P2WSH: the witness script, length-prefixed
pub fn p2wsh_script_code(witness_script: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(witness_script.len() + 3);
    write_var_bytes(&mut script, witness_script);
    script
}

/// BIP143 preimage:
/// nVersion ‖ hashPrevouts ‖ hashSequence ‖ outpoint ‖ scriptCode ‖ amount ‖
/// nSequence ‖ hashOutputs ‖ nLocktime ‖ sighashType
///
/// `script_code` must already carry its length prefix.
pub fn segwit_v0_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    amount: i64,
    sighash_type: SigHashType,
) -> Result<Vec<u8>> {
    let input = tx.input(input_index)?;
    let midstate = tx.midstate();
    let base = sighash_type.base();
    let zero = [0u8; 32];

    let hash_prevouts = if sighash_type.anyone_can_pay() { zero } else { midstate.hash_prevouts };
    let hash_sequence = if sighash_type.anyone_can_pay() || base != SigHashBase::All {
        zero
    } else {
        midstate.hash_sequence
    };
    let hash_outputs = match base {
        SigHashBase::All => midstate.hash_outputs,
        SigHashBase::Single => match tx.outputs().get(input_index) {
            Some(output) => double_sha256(&output.serialize()),
            None => zero,
        },
        SigHashBase::None => zero,
    };

    let mut preimage = Vec::with_capacity(156 + script_code.len());
    preimage.extend_from_slice(&tx.version().to_le_bytes());
    preimage.extend_from_slice(&hash_prevouts);
    preimage.extend_from_slice(&hash_sequence);
    preimage.extend_from_slice(&input.outpoint.wire_bytes());
    preimage.extend_from_slice(script_code);
    preimage.extend_from_slice(&amount.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&hash_outputs);
    preimage.extend_from_slice(&tx.locktime().to_le_bytes());
    preimage.extend_from_slice(&sighash_type.as_u32().to_le_bytes());
    Ok(preimage)
}

pub fn segwit_v0_sighash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    amount: i64,
    sighash_type: SigHashType,
) -> Result<Hash> {
    Ok(double_sha256(&segwit_v0_preimage(tx, input_index, script_code, amount, sighash_type)?))
}

// ============================================================================
// BIP341
// ============================================================================

/// Taproot signature hash.
///
/// `annex` is the raw annex item (including its 0x50 tag) when present;
/// `leaf_hash` selects the BIP342 script-path extension.
pub fn taproot_sighash(
    tx: &Transaction,
    input_index: usize,
    sighash_type: SigHashType,
    annex: Option<&[u8]>,
    leaf_hash: Option<&Hash>,
) -> Result<Hash> {
    let valid_type = matches!(sighash_type.0, 0x00..=0x03 | 0x81..=0x83);
    if !valid_type {
        return Err(EngineError::InvalidSignature(format!(
            "invalid taproot sighash type 0x{:02x}",
            sighash_type.0
        )));
    }
    let input = tx.input(input_index)?;
    let base = sighash_type.base();

    let mut msg = Vec::with_capacity(256);
    msg.push(0x00); // epoch
    msg.push(sighash_type.0);
    msg.extend_from_slice(&tx.version().to_le_bytes());
    msg.extend_from_slice(&tx.locktime().to_le_bytes());

    if !sighash_type.anyone_can_pay() {
        let midstate = match &tx.midstate().taproot {
            Some(midstate) => midstate,
            None => {
                let missing = tx.inputs().iter().position(|i| i.prevout.is_none()).unwrap_or(input_index);
                return Err(EngineError::MissingPrevout(missing));
            }
        };
        msg.extend_from_slice(&midstate.sha_prevouts);
        msg.extend_from_slice(&midstate.sha_amounts);
        msg.extend_from_slice(&midstate.sha_script_pubkeys);
        msg.extend_from_slice(&midstate.sha_sequences);
    }
    if base == SigHashBase::All {
        msg.extend_from_slice(&tx.midstate().sha_outputs);
    }

    let ext_flag: u8 = if leaf_hash.is_some() { 1 } else { 0 };
    let annex_present: u8 = if annex.is_some() { 1 } else { 0 };
    msg.push(ext_flag * 2 + annex_present);

    if sighash_type.anyone_can_pay() {
        let prevout = tx.prevout(input_index)?;
        msg.extend_from_slice(&input.outpoint.wire_bytes());
        msg.extend_from_slice(&prevout.value.to_le_bytes());
        write_var_bytes(&mut msg, &prevout.script_pubkey);
        msg.extend_from_slice(&input.sequence.to_le_bytes());
    } else {
        msg.extend_from_slice(&(input_index as u32).to_le_bytes());
    }

    if let Some(annex) = annex {
        let mut annex_bytes = Vec::with_capacity(annex.len() + 3);
        write_var_bytes(&mut annex_bytes, annex);
        msg.extend_from_slice(&sha256(&annex_bytes));
    }

    if base == SigHashBase::Single {
        let output = tx.outputs().get(input_index).ok_or_else(|| {
            EngineError::InvalidSignature(format!("SIGHASH_SINGLE without output {}", input_index))
        })?;
        msg.extend_from_slice(&sha256(&output.serialize()));
    }

    if let Some(leaf_hash) = leaf_hash {
        msg.extend_from_slice(leaf_hash);
        msg.push(0x00); // key_version
        msg.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes()); // codesep_pos: none
    }

    Ok(tagged_hash(TAG_TAP_SIGHASH, &msg))
}
