//! Address derivation: base58check for P2PKH/P2SH, bech32 for segwit v0,
//! bech32m for taproot

use crate::constants::*;
use crate::error::{EngineError, Result};
use crate::opcodes::*;
use crate::types::ScriptType;
use bech32::{hrp, segwit, Hrp};

/// Render the mainnet address of a standard locking script
pub fn address_from_script(script_type: &ScriptType, script: &[u8]) -> Result<String> {
    match script_type {
        ScriptType::P2PKH if script.len() == P2PKH_SCRIPT_LEN => Ok(base58check(P2PKH_ADDRESS_VERSION, &script[3..23])),
        ScriptType::P2SH if script.len() == P2SH_SCRIPT_LEN => Ok(base58check(P2SH_ADDRESS_VERSION, &script[2..22])),
        ScriptType::P2WPKH | ScriptType::P2WSH if script.len() > 2 => segwit::encode(hrp::BC, segwit::VERSION_0, &script[2..])
            .map_err(|e| EngineError::Address(format!("bech32 encode: {}", e))),
        ScriptType::P2TR if script.len() > 2 => segwit::encode(hrp::BC, segwit::VERSION_1, &script[2..])
            .map_err(|e| EngineError::Address(format!("bech32m encode: {}", e))),
        other => Err(EngineError::Address(format!(
            "no address form for {} script of {} bytes",
            other,
            script.len()
        ))),
    }
}

/// Decode a mainnet address back to the locking script it commits to
pub fn script_from_address(address: &str) -> Result<Vec<u8>> {
    if address.starts_with(SEGWIT_HRP) {
        return segwit_script(address);
    }

    let payload = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| EngineError::Address(format!("base58check: {}", e)))?;
    if payload.len() != 21 {
        return Err(EngineError::Address(format!("base58 payload of {} bytes", payload.len())));
    }
    let hash = &payload[1..];
    match payload[0] {
        P2PKH_ADDRESS_VERSION => {
            let mut script = vec![OP_DUP, OP_HASH160, OP_PUSHBYTES_20];
            script.extend_from_slice(hash);
            script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
            Ok(script)
        }
        P2SH_ADDRESS_VERSION => {
            let mut script = vec![OP_HASH160, OP_PUSHBYTES_20];
            script.extend_from_slice(hash);
            script.push(OP_EQUAL);
            Ok(script)
        }
        version => Err(EngineError::Address(format!("unknown address version 0x{:02x}", version))),
    }
}

fn segwit_script(address: &str) -> Result<Vec<u8>> {
    let (decoded_hrp, version, program) =
        segwit::decode(address).map_err(|e| EngineError::Address(format!("bech32 decode: {}", e)))?;
    let expected = Hrp::parse(SEGWIT_HRP).map_err(|e| EngineError::Address(e.to_string()))?;
    if decoded_hrp != expected {
        return Err(EngineError::Address(format!("unexpected hrp {}", decoded_hrp)));
    }

    let version_opcode = match version.to_u8() {
        0 => OP_0,
        v @ 1..=16 => OP_1 + v - 1,
        v => return Err(EngineError::Address(format!("invalid witness version {}", v))),
    };
    let mut script = Vec::with_capacity(program.len() + 2);
    script.push(version_opcode);
    script.push(program.len() as u8);
    script.extend_from_slice(&program);
    Ok(script)
}

fn base58check(version: u8, hash: &[u8]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(version);
    payload.extend_from_slice(hash);
    bs58::encode(payload).with_check().into_string()
}
