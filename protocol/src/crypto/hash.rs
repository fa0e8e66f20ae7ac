//! # Hashing Utilities
//!
//! Keccak-256 plus the 32-byte word encodings (`abi.encode` style) that the
//! typed-data hashes are built from.

use keccak_hash::keccak;

use crate::types::Address;

/// Keccak-256 of `data`.
///
/// This is the original Keccak padding used by Ethereum, not NIST SHA3-256.
///
/// ```
/// use mgov_protocol::crypto::keccak256;
///
/// assert_eq!(
///     hex::encode(keccak256(b"")),
///     "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
/// );
/// ```
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    keccak(data.as_ref()).into()
}

/// Left-pads an unsigned integer to a 32-byte big-endian word.
pub fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Left-pads an address to a 32-byte word.
pub fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Concatenates 32-byte words, the encoding of a static-only `abi.encode`.
pub fn encode_words(words: &[[u8; 32]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 32);
    for w in words {
        out.extend_from_slice(w);
    }
    out
}
