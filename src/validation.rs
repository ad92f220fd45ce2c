//! Transaction validation pipeline
//!
//! Four independent checks run per transaction:
//! 1. scripts: P2SH, wrapped segwit and P2WSH programs are executed
//! 2. metadata: scriptPubKey length per declared type, address re-derivation, fee ≥ 0
//! 3. hashes: the locking script committed to by the unlocking data
//! 4. signatures: ECDSA (legacy, BIP143) and taproot key/script path
//!
//! Any error inside a check is converted to `ValidationResult::Invalid` at
//! the per-transaction boundary; one malformed transaction never aborts a batch.

use crate::address::script_from_address;
use crate::constants::*;
use crate::error::{EngineError, Result};
use crate::hashing::{hash160, sha256};
use crate::opcodes::*;
use crate::script::{push_data_items, Interpreter, SigVersion};
use crate::sighash::{legacy_sighash, p2wpkh_script_code, segwit_v0_sighash};
use crate::signature::{der_to_compact, split_sighash_byte, Secp256k1Verifier, SignatureVerifier};
use crate::taproot::{is_key_path, output_key, split_annex, verify_key_path, verify_script_path};
use crate::transaction::{Input, Output, Transaction};
use crate::types::*;
use log::{debug, warn};

/// Composes the four checks into one accept/reject gate
pub struct Validator {
    verifier: Box<dyn SignatureVerifier>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::with_verifier(Box::new(Secp256k1Verifier::new()))
    }

    pub fn with_verifier(verifier: Box<dyn SignatureVerifier>) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &dyn SignatureVerifier {
        self.verifier.as_ref()
    }

    /// Validate: 𝒯𝒳 → {valid, invalid}
    ///
    /// All four checks run; the first failure reason is reported.
    pub fn validate(&self, tx: &Transaction) -> ValidationResult {
        let checks = [
            ("script", check_scripts(tx, self.verifier())),
            ("metadata", check_metadata(tx)),
            ("hash", check_hashes(tx)),
            ("signature", check_signatures(tx, self.verifier())),
        ];

        let mut verdict = ValidationResult::Valid;
        for (name, outcome) in checks {
            let result = match outcome {
                Ok(result) => result,
                Err(e) => ValidationResult::Invalid(e.to_string()),
            };
            if let ValidationResult::Invalid(reason) = &result {
                debug!("{} check failed for {}: {}", name, tx.txid_hex(), reason);
                if verdict.is_valid() {
                    verdict = ValidationResult::Invalid(format!("{} check: {}", name, reason));
                }
            }
        }

        if let ValidationResult::Invalid(reason) = &verdict {
            warn!("rejecting {}: {}", tx.txid_hex(), reason);
        }
        verdict
    }
}

/// Non-coinbase inputs with their index and prevout; coinbase inputs are skipped
fn spending_inputs<'a>(tx: &'a Transaction) -> impl Iterator<Item = Result<(usize, &'a Input, &'a Output)>> + 'a {
    tx.inputs()
        .iter()
        .enumerate()
        .filter(|(_, input)| !input.is_coinbase)
        .map(move |(index, input)| Ok((index, input, tx.prevout(index)?)))
}

fn witness_item(input: &Input, index: usize) -> Result<&ByteString> {
    input
        .witness
        .get(index)
        .ok_or_else(|| EngineError::InvalidInput(format!("missing witness item {}", index)))
}

/// Witness stack split into (data items, final script)
fn witness_script(input: &Input) -> Result<(&[ByteString], &ByteString)> {
    match input.witness.split_last() {
        Some((script, items)) => Ok((items, script)),
        None => Err(EngineError::InvalidInput("empty witness".to_string())),
    }
}

fn p2pkh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![OP_DUP, OP_HASH160, OP_PUSHBYTES_20];
    script.extend_from_slice(hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

fn p2sh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![OP_HASH160, OP_PUSHBYTES_20];
    script.extend_from_slice(hash);
    script.push(OP_EQUAL);
    script
}

fn witness_v0_script(program: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_0, program.len() as u8];
    script.extend_from_slice(program);
    script
}

fn last_push(script_sig: &[u8]) -> Result<ByteString> {
    push_data_items(script_sig)?
        .pop()
        .ok_or_else(|| EngineError::InvalidInput("empty scriptSig".to_string()))
}

// ============================================================================
// SCRIPT CHECK
// ============================================================================

/// Execute the programs of P2SH, wrapped segwit and P2WSH inputs.
///
/// P2SH runs scriptSig then scriptPubKey on one stack; for a bare P2SH the
/// redeem script is then run on the scriptSig's remaining items. Wrapped and
/// native P2WSH clear the stack, push the witness items and run the witness
/// script with the BIP143 digest.
pub fn check_scripts(tx: &Transaction, verifier: &dyn SignatureVerifier) -> Result<ValidationResult> {
    for entry in spending_inputs(tx) {
        let (index, input, prevout) = entry?;
        let spend_type = tx.spend_type(index)?;
        let inner_version = if spend_type.uses_bip143() {
            SigVersion::WitnessV0 { amount: prevout.value }
        } else {
            SigVersion::Base
        };
        let mut interpreter = Interpreter::for_input(tx, index, verifier, SigVersion::Base);

        let passed = match spend_type {
            SpendType::P2SH | SpendType::P2SHP2WPKH | SpendType::P2SHP2WSH => {
                interpreter.execute(&input.script_sig)?;
                let unlocking_items = interpreter.stack().items().to_vec();
                if !interpreter.execute_bool(&prevout.script_pubkey)? {
                    false
                } else {
                    match spend_type {
                        SpendType::P2SH => {
                            let (redeem_script, items) = unlocking_items
                                .split_last()
                                .ok_or(EngineError::StackUnderflow("P2SH redeem script"))?;
                            interpreter.reset(inner_version);
                            for item in items {
                                interpreter.push(item.clone());
                            }
                            interpreter.execute_bool(redeem_script)?
                        }
                        SpendType::P2SHP2WPKH => {
                            let redeem_script = last_push(&input.script_sig)?;
                            let program: [u8; 20] = redeem_script
                                .get(2..)
                                .and_then(|p| p.try_into().ok())
                                .ok_or_else(|| EngineError::InvalidInput("bad P2WPKH program".to_string()))?;
                            interpreter.reset(inner_version);
                            interpreter.push(witness_item(input, 0)?.clone());
                            interpreter.push(witness_item(input, 1)?.clone());
                            interpreter.execute_bool(&p2pkh_script(&program))?
                        }
                        _ => {
                            let (items, script) = witness_script(input)?;
                            interpreter.reset(inner_version);
                            for item in items {
                                interpreter.push(item.clone());
                            }
                            interpreter.execute_bool(script)?
                        }
                    }
                }
            }
            SpendType::P2WSH => {
                let (items, script) = witness_script(input)?;
                interpreter.reset(inner_version);
                for item in items {
                    interpreter.push(item.clone());
                }
                interpreter.execute_bool(script)?
            }
            SpendType::P2PKH | SpendType::P2WPKH | SpendType::P2TR => true,
        };

        if !passed {
            return Ok(ValidationResult::Invalid(format!("input {} script evaluated to false", index)));
        }
    }
    Ok(ValidationResult::Valid)
}

// ============================================================================
// METADATA CHECK
// ============================================================================

/// Structural checks per declared output type, address re-derivation and a
/// non-negative fee. OP_RETURN and unknown prevout types are unspendable.
pub fn check_metadata(tx: &Transaction) -> Result<ValidationResult> {
    for entry in spending_inputs(tx) {
        let (index, input, prevout) = entry?;
        let spk = &prevout.script_pubkey;
        if spk.is_empty() {
            return Ok(ValidationResult::Invalid(format!("input {} prevout has empty scriptPubKey", index)));
        }

        let expected_len = match &prevout.script_type {
            ScriptType::P2PKH => P2PKH_SCRIPT_LEN,
            ScriptType::P2SH => P2SH_SCRIPT_LEN,
            ScriptType::P2WPKH => P2WPKH_SCRIPT_LEN,
            ScriptType::P2WSH => P2WSH_SCRIPT_LEN,
            ScriptType::P2TR => P2TR_SCRIPT_LEN,
            ScriptType::OpReturn | ScriptType::Unknown(_) => {
                return Ok(ValidationResult::Invalid(format!(
                    "input {} spends unspendable {} output",
                    index, prevout.script_type
                )))
            }
        };
        if spk.len() != expected_len {
            return Ok(ValidationResult::Invalid(format!(
                "input {} {} scriptPubKey is {} bytes, expected {}",
                index,
                prevout.script_type,
                spk.len(),
                expected_len
            )));
        }
        if prevout.script_type == ScriptType::P2WPKH && input.witness.len() != 2 {
            return Ok(ValidationResult::Invalid(format!(
                "input {} P2WPKH witness has {} items",
                index,
                input.witness.len()
            )));
        }

        let address = match &prevout.address {
            Some(address) => address,
            None => return Ok(ValidationResult::Invalid(format!("input {} prevout has no address", index))),
        };
        if script_from_address(address)? != *spk {
            return Ok(ValidationResult::Invalid(format!(
                "input {} address {} does not match scriptPubKey",
                index, address
            )));
        }
    }

    if tx.fee() < 0 {
        return Ok(ValidationResult::Invalid(format!("negative fee {}", tx.fee())));
    }
    Ok(ValidationResult::Valid)
}

// ============================================================================
// HASH CHECK
// ============================================================================

/// Recompute the locking script implied by the unlocking data
pub fn check_hashes(tx: &Transaction) -> Result<ValidationResult> {
    for entry in spending_inputs(tx) {
        let (index, input, prevout) = entry?;
        let spend_type = tx.spend_type(index)?;

        let expected = match spend_type {
            SpendType::P2PKH => p2pkh_script(&hash160(&last_push(&input.script_sig)?)),
            SpendType::P2SH | SpendType::P2SHP2WPKH | SpendType::P2SHP2WSH => {
                let redeem_script = last_push(&input.script_sig)?;
                let inner = match spend_type {
                    SpendType::P2SHP2WPKH => Some(witness_v0_script(&hash160(witness_item(input, 1)?))),
                    SpendType::P2SHP2WSH => Some(witness_v0_script(&sha256(witness_script(input)?.1))),
                    _ => None,
                };
                if let Some(inner) = inner {
                    if inner != redeem_script {
                        return Ok(ValidationResult::Invalid(format!(
                            "input {} wrapped witness program does not match witness",
                            index
                        )));
                    }
                }
                p2sh_script(&hash160(&redeem_script))
            }
            SpendType::P2WPKH => witness_v0_script(&hash160(witness_item(input, 1)?)),
            SpendType::P2WSH => witness_v0_script(&sha256(witness_script(input)?.1)),
            SpendType::P2TR => continue,
        };

        if expected != prevout.script_pubkey {
            return Ok(ValidationResult::Invalid(format!(
                "input {} unlocking data does not hash to the {} scriptPubKey",
                index, prevout.script_type
            )));
        }
    }
    Ok(ValidationResult::Valid)
}

// ============================================================================
// SIGNATURE CHECK
// ============================================================================

/// Verify the signature of every single-key input.
///
/// P2SH and P2WSH signatures are checked by the script check, which runs the
/// redeem or witness script with the signing context bound.
pub fn check_signatures(tx: &Transaction, verifier: &dyn SignatureVerifier) -> Result<ValidationResult> {
    for entry in spending_inputs(tx) {
        let (index, input, prevout) = entry?;

        let valid = match tx.spend_type(index)? {
            SpendType::P2PKH => {
                let items = push_data_items(&input.script_sig)?;
                let (signature, pubkey) = match (items.first(), items.last()) {
                    (Some(signature), Some(pubkey)) if items.len() >= 2 => (signature, pubkey),
                    _ => return Ok(ValidationResult::Invalid(format!("input {} scriptSig lacks signature and key", index))),
                };
                let (der, sighash_type) = split_sighash_byte(signature)?;
                let compact = der_to_compact(der)?;
                let digest = legacy_sighash(tx, index, &prevout.script_pubkey, sighash_type)?;
                verifier.verify_ecdsa(pubkey, &digest, &compact)
            }
            SpendType::P2WPKH | SpendType::P2SHP2WPKH => {
                let signature = witness_item(input, 0)?;
                let pubkey = witness_item(input, 1)?;
                let (der, sighash_type) = split_sighash_byte(signature)?;
                let compact = der_to_compact(der)?;
                let digest =
                    segwit_v0_sighash(tx, index, &p2wpkh_script_code(pubkey), prevout.value, sighash_type)?;
                verifier.verify_ecdsa(pubkey, &digest, &compact)
            }
            SpendType::P2TR => {
                if is_key_path(&input.witness) {
                    verify_key_path(tx, index, verifier)?
                } else {
                    let key = output_key(&prevout.script_pubkey)
                        .ok_or_else(|| EngineError::InvalidInput("malformed taproot output".to_string()))?;
                    let (items, _) = split_annex(&input.witness);
                    let (script, control) = match items {
                        [.., script, control] => (script, control),
                        _ => return Ok(ValidationResult::Invalid(format!("input {} script path too short", index))),
                    };
                    verify_script_path(&key, script, control, verifier)?
                }
            }
            SpendType::P2SH | SpendType::P2WSH | SpendType::P2SHP2WSH => true,
        };

        if !valid {
            return Ok(ValidationResult::Invalid(format!("input {} signature does not verify", index)));
        }
    }
    Ok(ValidationResult::Valid)
}
