//! Signature decoding and the elliptic-curve verification capability

use crate::error::{EngineError, Result};
use crate::types::{Hash, SigHashType};
use secp256k1::{ecdsa, schnorr, Message, PublicKey, Scalar, Secp256k1, VerifyOnly, XOnlyPublicKey};

/// DER sequence tag
const DER_SEQUENCE: u8 = 0x30;
/// DER integer tag
const DER_INTEGER: u8 = 0x02;

/// DecodeDER: 𝔹* → 𝔹³² × 𝔹³²
///
/// Extracts r and s as fixed-width big-endian integers. A 33-byte component
/// has its 0x00 sign-padding stripped; shorter components are left-padded.
/// The trailing sighash byte, if any, must be removed by the caller.
pub fn decode_der(signature: &[u8]) -> Result<([u8; 32], [u8; 32])> {
    if signature.first() != Some(&DER_SEQUENCE) {
        return Err(EngineError::InvalidSignature(
            "DER signature must start with 0x30".to_string(),
        ));
    }
    if signature.len() < 8 {
        return Err(EngineError::InvalidSignature(format!(
            "DER signature too short ({} bytes)",
            signature.len()
        )));
    }

    let (r, rest) = read_der_integer(&signature[2..])?;
    let (s, _) = read_der_integer(rest)?;
    Ok((r, s))
}

fn read_der_integer(data: &[u8]) -> Result<([u8; 32], &[u8])> {
    if data.len() < 2 || data[0] != DER_INTEGER {
        return Err(EngineError::InvalidSignature("expected DER integer".to_string()));
    }
    let len = data[1] as usize;
    let body = data
        .get(2..2 + len)
        .ok_or_else(|| EngineError::InvalidSignature("DER integer truncated".to_string()))?;

    let body = match body {
        [0x00, tail @ ..] if len == 33 => tail,
        _ => body,
    };
    if body.len() > 32 {
        return Err(EngineError::InvalidSignature(format!(
            "DER integer of {} bytes does not fit 32",
            body.len()
        )));
    }

    let mut out = [0u8; 32];
    out[32 - body.len()..].copy_from_slice(body);
    Ok((out, &data[2 + len..]))
}

/// Compact 64-byte form r ‖ s
pub fn der_to_compact(signature: &[u8]) -> Result<[u8; 64]> {
    let (r, s) = decode_der(signature)?;
    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&r);
    compact[32..].copy_from_slice(&s);
    Ok(compact)
}

/// Split a script signature into its DER body and trailing sighash byte
pub fn split_sighash_byte(signature: &[u8]) -> Result<(&[u8], SigHashType)> {
    match signature.split_last() {
        Some((last, body)) => Ok((body, SigHashType(*last))),
        None => Err(EngineError::InvalidSignature("empty signature".to_string())),
    }
}

/// Split a BIP340 witness signature: 64 bytes means SIGHASH_DEFAULT,
/// 65 bytes carries an explicit (non-zero) hash type.
pub fn split_schnorr_signature(signature: &[u8]) -> Result<([u8; 64], SigHashType)> {
    let (body, sighash_type) = match signature.len() {
        64 => (signature, SigHashType::DEFAULT),
        65 if signature[64] != 0x00 => (&signature[..64], SigHashType(signature[64])),
        len => {
            return Err(EngineError::InvalidSignature(format!(
                "schnorr signature of {} bytes",
                len
            )))
        }
    };
    let mut out = [0u8; 64];
    out.copy_from_slice(body);
    Ok((out, sighash_type))
}

// ============================================================================
// VERIFICATION CAPABILITY
// ============================================================================

/// Elliptic-curve operations consumed by the interpreter and validators
pub trait SignatureVerifier {
    /// ECDSA over secp256k1 with a compact (r ‖ s) signature; high-S accepted
    fn verify_ecdsa(&self, pubkey: &[u8], digest: &Hash, signature: &[u8; 64]) -> bool;

    /// BIP340 Schnorr verification against an x-only key
    fn verify_schnorr(&self, xonly_pubkey: &[u8; 32], digest: &Hash, signature: &[u8; 64]) -> bool;

    /// Q = P + t·G for x-only P; returns the x-only Q and its parity (0 even, 1 odd)
    fn tweak_xonly(&self, internal_key: &[u8; 32], tweak: &Hash) -> Result<([u8; 32], u8)>;
}

/// `SignatureVerifier` backed by libsecp256k1
pub struct Secp256k1Verifier {
    secp: Secp256k1<VerifyOnly>,
}

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self { secp: Secp256k1::verification_only() }
    }
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify_ecdsa(&self, pubkey: &[u8], digest: &Hash, signature: &[u8; 64]) -> bool {
        let pubkey = match PublicKey::from_slice(pubkey) {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        let mut signature = match ecdsa::Signature::from_compact(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        signature.normalize_s();
        let message = match Message::from_digest_slice(digest) {
            Ok(msg) => msg,
            Err(_) => return false,
        };
        self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }

    fn verify_schnorr(&self, xonly_pubkey: &[u8; 32], digest: &Hash, signature: &[u8; 64]) -> bool {
        let pubkey = match XOnlyPublicKey::from_slice(xonly_pubkey) {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        let signature = match schnorr::Signature::from_slice(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        let message = match Message::from_digest_slice(digest) {
            Ok(msg) => msg,
            Err(_) => return false,
        };
        self.secp.verify_schnorr(&signature, &message, &pubkey).is_ok()
    }

    fn tweak_xonly(&self, internal_key: &[u8; 32], tweak: &Hash) -> Result<([u8; 32], u8)> {
        let internal = XOnlyPublicKey::from_slice(internal_key)
            .map_err(|e| EngineError::InvalidSignature(format!("invalid internal key: {}", e)))?;
        let scalar = Scalar::from_be_bytes(*tweak)
            .map_err(|_| EngineError::InvalidSignature("tweak exceeds curve order".to_string()))?;
        let (tweaked, parity) = internal
            .add_tweak(&self.secp, &scalar)
            .map_err(|e| EngineError::InvalidSignature(format!("tweak failed: {}", e)))?;
        Ok((tweaked.serialize(), parity.to_u8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{Keypair, SecretKey};

    fn test_key() -> (Secp256k1<secp256k1::All>, SecretKey) {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[0x11; 32]).unwrap();
        (secp, sk)
    }

    #[test]
    fn test_decode_der_strips_padding() {
        // r with 0x00 pad (33 bytes), s short (31 bytes)
        let mut der = vec![0x30, 0x00, 0x02, 0x21, 0x00];
        der.extend_from_slice(&[0x80; 32]);
        der.extend_from_slice(&[0x02, 0x1f]);
        der.extend_from_slice(&[0x7f; 31]);
        der[1] = (der.len() - 2) as u8;

        let (r, s) = decode_der(&der).unwrap();
        assert_eq!(r, [0x80; 32]);
        assert_eq!(s[0], 0x00);
        assert_eq!(&s[1..], &[0x7f; 31]);
    }

    #[test]
    fn test_decode_der_rejects_wrong_tag() {
        let err = decode_der(&[0x31, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSignature(_)));
    }

    #[test]
    fn test_ecdsa_round_trip_and_tamper() {
        let (secp, sk) = test_key();
        let pk = PublicKey::from_secret_key(&secp, &sk);
        let digest = [0x42u8; 32];
        let sig = secp.sign_ecdsa(&Message::from_digest_slice(&digest).unwrap(), &sk);
        let compact = der_to_compact(&sig.serialize_der()).unwrap();

        let verifier = Secp256k1Verifier::new();
        assert!(verifier.verify_ecdsa(&pk.serialize(), &digest, &compact));

        let mut bad = compact;
        bad[10] ^= 0x01;
        assert!(!verifier.verify_ecdsa(&pk.serialize(), &digest, &bad));
    }

    #[test]
    fn test_schnorr_signature_split() {
        let (secp, sk) = test_key();
        let keypair = Keypair::from_secret_key(&secp, &sk);
        let digest = [0x24u8; 32];
        let sig = secp.sign_schnorr_no_aux_rand(&Message::from_digest_slice(&digest).unwrap(), &keypair);
        let sig_bytes: &[u8; 64] = sig.as_ref();

        let (body, sighash_type) = split_schnorr_signature(sig_bytes).unwrap();
        assert_eq!(sighash_type, SigHashType::DEFAULT);

        let (xonly, _) = keypair.x_only_public_key();
        assert!(Secp256k1Verifier::new().verify_schnorr(&xonly.serialize(), &digest, &body));

        let mut explicit = sig_bytes.to_vec();
        explicit.push(0x00);
        assert!(split_schnorr_signature(&explicit).is_err());
    }

    #[test]
    fn test_tweak_matches_library() {
        let (secp, sk) = test_key();
        let keypair = Keypair::from_secret_key(&secp, &sk);
        let (xonly, _) = keypair.x_only_public_key();
        let tweak = [0x01u8; 32];
        let (expected, parity) = xonly.add_tweak(&secp, &Scalar::from_be_bytes(tweak).unwrap()).unwrap();
        assert_eq!(
            Secp256k1Verifier::new().tweak_xonly(&xonly.serialize(), &tweak).unwrap(),
            (expected.serialize(), parity.to_u8())
        );
    }
}
