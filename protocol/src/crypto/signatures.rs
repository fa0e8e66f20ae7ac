//! # Recoverable Signatures
//!
//! `(v, r, s)` ECDSA signatures over secp256k1 and the `ecrecover` operation
//! that turns one back into an address.
//!
//! ## Recovery semantics
//!
//! [`recover_signer`] mirrors the EVM precompile: it never errors. Any
//! malformed input (a `v` other than 27/28, an out-of-range `r` or `s`, a
//! point that does not decompress) yields [`Address::ZERO`]. Callers treat the
//! zero address as "invalid signature".

use secp256k1::ecdsa::{RecoverableSignature as SecpRecoverable, RecoveryId};
use secp256k1::{Message, SECP256K1};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::keys::address_from_public_key;
use crate::types::Address;

/// Errors from parsing a signature off the wire.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature bytes: expected 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid signature hex")]
    InvalidHex,
}

/// A split ECDSA signature, as produced by `ethers.utils.splitSignature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    /// Recovery byte, 27 or 28.
    pub v: u8,
    #[serde(with = "hex_word")]
    pub r: [u8; 32],
    #[serde(with = "hex_word")]
    pub s: [u8; 32],
}

impl RecoverableSignature {
    /// Parses the 65-byte `r ‖ s ‖ v` wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != 65 {
            return Err(SignatureError::InvalidLength(bytes.len()));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { v: bytes[64], r, s })
    }

    /// Parses a `0x`-prefixed 65-byte hex signature.
    pub fn from_hex(hex_str: &str) -> Result<Self, SignatureError> {
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(stripped).map_err(|_| SignatureError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }

    /// The 65-byte `r ‖ s ‖ v` wire form.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }
}

/// Recovers the address that signed `digest`, or the zero address.
pub fn recover_signer(digest: &[u8; 32], signature: &RecoverableSignature) -> Address {
    let recovery = match signature.v {
        27 | 28 => i32::from(signature.v - 27),
        _ => return Address::ZERO,
    };
    let Ok(recovery_id) = RecoveryId::from_i32(recovery) else {
        return Address::ZERO;
    };

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&signature.r);
    compact[32..].copy_from_slice(&signature.s);

    let Ok(sig) = SecpRecoverable::from_compact(&compact, recovery_id) else {
        return Address::ZERO;
    };

    let message = Message::from_digest(*digest);
    match SECP256K1.recover_ecdsa(&message, &sig) {
        Ok(public) => address_from_public_key(&public),
        Err(_) => Address::ZERO,
    }
}

mod hex_word {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(word: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(word)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(stripped).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}
