//! Digest helpers: SHA-256, double SHA-256, HASH160, SHA-1 and BIP340 tagged hashes

use crate::types::Hash;
use bitcoin_hashes::{sha1 as bh_sha1, sha256d, Hash as BitcoinHash, HashEngine};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> Hash {
    let result = Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// SHA256(SHA256(x)), in internal byte order
pub fn double_sha256(data: &[u8]) -> Hash {
    sha256d::Hash::hash(data).into_inner()
}

/// Double SHA-256 over several byte slices without concatenating them first
pub fn double_sha256_parts(parts: &[&[u8]]) -> Hash {
    let mut engine = sha256d::Hash::engine();
    for part in parts {
        engine.input(part);
    }
    sha256d::Hash::from_engine(engine).into_inner()
}

pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let result = Ripemd160::digest(data);
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&result);
    hash
}

/// RIPEMD160(SHA256(x))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

pub fn sha1(data: &[u8]) -> [u8; 20] {
    bh_sha1::Hash::hash(data).into_inner()
}

/// TaggedHash(tag, m) = SHA256(SHA256(tag) ‖ SHA256(tag) ‖ m)
pub fn tagged_hash(tag: &str, msg: &[u8]) -> Hash {
    let tag_hash = sha256(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    hasher.update(msg);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}
