//! Taproot spending rules (BIP341): annex handling, control blocks, the
//! script-path commitment and key-path signatures

use crate::codec::write_var_bytes;
use crate::constants::*;
use crate::error::{EngineError, Result};
use crate::hashing::tagged_hash;
use crate::sighash::taproot_sighash;
use crate::signature::{split_schnorr_signature, SignatureVerifier};
use crate::transaction::Transaction;
use crate::types::{ByteString, Hash};

/// Extract the x-only output key from OP_1 <32 bytes>
pub fn output_key(script: &[u8]) -> Option<[u8; 32]> {
    match script {
        [0x51, 0x20, key @ ..] if key.len() == 32 => key.try_into().ok(),
        _ => None,
    }
}

/// Split off the annex: the last witness item when it starts with 0x50 and
/// at least two items are present.
pub fn split_annex(witness: &[ByteString]) -> (&[ByteString], Option<&[u8]>) {
    match witness.split_last() {
        Some((last, rest)) if witness.len() >= 2 && last.first() == Some(&TAPROOT_ANNEX_TAG) => {
            (rest, Some(last.as_slice()))
        }
        _ => (witness, None),
    }
}

/// True when the witness (annex removed) is a key-path spend: a lone
/// signature. Two or more items are script path.
pub fn is_key_path(witness: &[ByteString]) -> bool {
    split_annex(witness).0.len() == 1
}

/// TapLeaf hash: tagged("TapLeaf", leaf_version ‖ CompactSize(|script|) ‖ script)
pub fn tapleaf_hash(leaf_version: u8, script: &[u8]) -> Hash {
    let mut msg = Vec::with_capacity(script.len() + 4);
    msg.push(leaf_version);
    write_var_bytes(&mut msg, script);
    tagged_hash(TAG_TAP_LEAF, &msg)
}

/// TapBranch hash over a lexicographically ordered pair
pub fn tapbranch_hash(a: &Hash, b: &Hash) -> Hash {
    let (left, right) = if a <= b { (a, b) } else { (b, a) };
    let mut msg = [0u8; 64];
    msg[..32].copy_from_slice(left);
    msg[32..].copy_from_slice(right);
    tagged_hash(TAG_TAP_BRANCH, &msg)
}

/// TapTweak hash: tagged("TapTweak", P ‖ merkle_root)
pub fn tap_tweak_hash(internal_key: &[u8; 32], merkle_root: Option<&Hash>) -> Hash {
    let mut msg = Vec::with_capacity(64);
    msg.extend_from_slice(internal_key);
    if let Some(root) = merkle_root {
        msg.extend_from_slice(root);
    }
    tagged_hash(TAG_TAP_TWEAK, &msg)
}

/// Parsed script-path control block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlBlock {
    pub leaf_version: u8,
    /// Parity of the output key (low bit of the first byte)
    pub output_parity: u8,
    pub internal_key: [u8; 32],
    pub merkle_path: Vec<Hash>,
}

impl ControlBlock {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let len = bytes.len();
        if len < TAPROOT_CONTROL_BASE_SIZE
            || (len - TAPROOT_CONTROL_BASE_SIZE) % TAPROOT_CONTROL_NODE_SIZE != 0
            || (len - TAPROOT_CONTROL_BASE_SIZE) / TAPROOT_CONTROL_NODE_SIZE > TAPROOT_CONTROL_MAX_NODES
        {
            return Err(EngineError::InvalidInput(format!("invalid control block length {}", len)));
        }

        let mut internal_key = [0u8; 32];
        internal_key.copy_from_slice(&bytes[1..TAPROOT_CONTROL_BASE_SIZE]);
        let merkle_path = bytes[TAPROOT_CONTROL_BASE_SIZE..]
            .chunks_exact(TAPROOT_CONTROL_NODE_SIZE)
            .map(|node| {
                let mut hash = [0u8; 32];
                hash.copy_from_slice(node);
                hash
            })
            .collect();

        Ok(Self {
            leaf_version: bytes[0] & 0xfe,
            output_parity: bytes[0] & 0x01,
            internal_key,
            merkle_path,
        })
    }

    /// Walk the merkle path from a leaf hash up to the root
    pub fn merkle_root(&self, leaf_hash: &Hash) -> Hash {
        self.merkle_path.iter().fold(*leaf_hash, |node, sibling| tapbranch_hash(&node, sibling))
    }
}

/// Check that `script` under `control_block` commits to `output_key`.
///
/// Recomputes the tapleaf hash and merkle root, derives the tweak, rejects a
/// tweak at or above the curve order, then compares the tweaked internal
/// key (and its parity) with the output key.
pub fn verify_script_path(
    output_key: &[u8; 32],
    script: &[u8],
    control_block: &[u8],
    verifier: &dyn SignatureVerifier,
) -> Result<bool> {
    let control = ControlBlock::parse(control_block)?;
    let leaf_hash = tapleaf_hash(control.leaf_version, script);
    let root = control.merkle_root(&leaf_hash);
    let tweak = tap_tweak_hash(&control.internal_key, Some(&root));
    if tweak >= SECP256K1_ORDER {
        return Ok(false);
    }
    let (tweaked, parity) = verifier.tweak_xonly(&control.internal_key, &tweak)?;
    Ok(tweaked == *output_key && parity == control.output_parity)
}

/// Verify a key-path spend of input `index`: one Schnorr signature (after
/// annex removal) against the output key and the BIP341 digest.
pub fn verify_key_path(tx: &Transaction, index: usize, verifier: &dyn SignatureVerifier) -> Result<bool> {
    let input = tx.input(index)?;
    let prevout = tx.prevout(index)?;
    let key = output_key(&prevout.script_pubkey)
        .ok_or_else(|| EngineError::InvalidInput(format!("input {} prevout is not a taproot output", index)))?;

    let (items, annex) = split_annex(&input.witness);
    let signature = match items {
        [signature] => signature,
        _ => {
            return Err(EngineError::InvalidInput(format!(
                "key-path spend with {} witness items",
                items.len()
            )))
        }
    };
    let (signature, sighash_type) = split_schnorr_signature(signature)?;
    let digest = taproot_sighash(tx, index, sighash_type, annex, None)?;
    Ok(verifier.verify_schnorr(&key, &digest, &signature))
}

/// Tapleaf hash of the script being spent by a script-path witness
pub fn script_path_leaf_hash(witness: &[ByteString]) -> Result<Hash> {
    let (items, _) = split_annex(witness);
    match items {
        [.., script, control] => Ok(tapleaf_hash(ControlBlock::parse(control)?.leaf_version, script)),
        _ => Err(EngineError::InvalidInput("script-path witness needs script and control block".to_string())),
    }
}
