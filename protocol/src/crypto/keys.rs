//! # Key Management
//!
//! secp256k1 keypairs and the address derivation that ties a key to an
//! account: `address = keccak256(uncompressed_pubkey[1..])[12..]`.
//!
//! ## Security considerations
//!
//! - Key generation pulls from `OsRng`.
//! - Secret key bytes are never logged and `Keypair` has no `Debug` output
//!   beyond the address.

use rand::rngs::OsRng;
use rand_core::RngCore;
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use std::fmt;
use thiserror::Error;

use super::hash::keccak256;
use super::signatures::RecoverableSignature;
use super::typed_data::{DelegationPayload, Eip712Domain};
use crate::types::Address;

/// Errors that can occur during key operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,
}

/// A secp256k1 keypair controlling one account.
///
/// # Examples
///
/// ```
/// use mgov_protocol::crypto::{keys::Keypair, recover_signer};
///
/// let kp = Keypair::generate();
/// let digest = [7u8; 32];
/// let sig = kp.sign_digest(&digest);
/// assert_eq!(recover_signer(&digest, &sig), kp.address());
/// ```
#[derive(Clone)]
pub struct Keypair {
    secret: SecretKey,
    public: PublicKey,
}

impl Keypair {
    /// Generates a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        loop {
            OsRng.fill_bytes(&mut bytes);
            // Out-of-range scalars are astronomically rare; draw again.
            if let Ok(kp) = Self::from_secret_bytes(&bytes) {
                return kp;
            }
        }
    }

    /// Builds a keypair from a 32-byte secret scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| KeyError::InvalidSecretKey)?;
        let public = PublicKey::from_secret_key(SECP256K1, &secret);
        Ok(Self { secret, public })
    }

    /// Parses a hex-encoded secret key, with or without `0x`.
    pub fn from_secret_hex(hex_str: &str) -> Result<Self, KeyError> {
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(stripped).map_err(|_| KeyError::InvalidSecretKey)?;
        Self::from_secret_bytes(&bytes)
    }

    /// Raw secret scalar. Handle with care.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.secret_bytes()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// The account this key controls.
    pub fn address(&self) -> Address {
        address_from_public_key(&self.public)
    }

    /// Signs a 32-byte digest, producing `(v, r, s)` with `v` in `{27, 28}`.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> RecoverableSignature {
        let message = Message::from_digest(*digest);
        let sig = SECP256K1.sign_ecdsa_recoverable(&message, &self.secret);
        let (recovery_id, compact) = sig.serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);

        RecoverableSignature {
            v: 27 + recovery_id.to_i32() as u8,
            r,
            s,
        }
    }

    /// Signs a delegation the way a wallet's `signTypedData` does.
    pub fn sign_delegation(
        &self,
        domain: &Eip712Domain,
        payload: &DelegationPayload,
    ) -> RecoverableSignature {
        self.sign_digest(&domain.digest(payload))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Derives the account address of a public key.
pub fn address_from_public_key(public: &PublicKey) -> Address {
    let uncompressed = public.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::new(bytes)
}
