//! # Signed Delegation Authenticator
//!
//! Lets a holder delegate without sending a transaction themselves: they sign
//! an EIP-712 `Delegation { delegatee, nonce, expiry }` off-chain and anyone
//! may submit it. The delegator is whoever the signature recovers to, never
//! the submitter.
//!
//! Checks run in a fixed order, and each failure has its own stable message:
//!
//! 1. the signature must recover to a non-zero address;
//! 2. the nonce must equal the signer's current nonce exactly;
//! 3. the block timestamp must not exceed the expiry.
//!
//! [`authenticate`] only checks. Consuming the nonce is left to the caller so
//! that it commits together with the delegation itself.

use mgov_protocol::crypto::signatures::{recover_signer, RecoverableSignature};
use mgov_protocol::crypto::typed_data::{DelegationPayload, Eip712Domain};
use mgov_protocol::{Address, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Authorization failures of a signed delegation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignedDelegationError {
    #[error("MGToken::delegateBySig: invalid signature")]
    InvalidSignature,

    #[error("MGToken::delegateBySig: invalid nonce")]
    InvalidNonce {
        signer: Address,
        expected: u64,
        provided: u64,
    },

    #[error("MGToken::delegateBySig: signature expired")]
    SignatureExpired { expiry: u64, now: Timestamp },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A submitted signed delegation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDelegation {
    pub delegatee: Address,
    pub nonce: u64,
    pub expiry: u64,
    #[serde(flatten)]
    pub signature: RecoverableSignature,
}

impl SignedDelegation {
    pub fn payload(&self) -> DelegationPayload {
        DelegationPayload {
            delegatee: self.delegatee,
            nonce: self.nonce,
            expiry: self.expiry,
        }
    }
}

/// Per-account signature nonces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NonceRegistry {
    nonces: HashMap<Address, u64>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The nonce the next signed delegation from `account` must carry.
    pub fn nonce_of(&self, account: &Address) -> u64 {
        self.nonces.get(account).copied().unwrap_or(0)
    }

    /// Uses up `account`'s current nonce.
    pub fn consume(&mut self, account: Address) -> u64 {
        let slot = self.nonces.entry(account).or_insert(0);
        let used = *slot;
        *slot += 1;
        used
    }
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Verifies `request` against `domain` and returns the signer.
pub fn authenticate(
    domain: &Eip712Domain,
    nonces: &NonceRegistry,
    request: &SignedDelegation,
    now: Timestamp,
) -> Result<Address, SignedDelegationError> {
    let digest = domain.digest(&request.payload());

    let signer = recover_signer(&digest, &request.signature);
    if signer.is_zero() {
        return Err(SignedDelegationError::InvalidSignature);
    }

    let expected = nonces.nonce_of(&signer);
    if request.nonce != expected {
        return Err(SignedDelegationError::InvalidNonce {
            signer,
            expected,
            provided: request.nonce,
        });
    }

    if now > request.expiry {
        return Err(SignedDelegationError::SignatureExpired {
            expiry: request.expiry,
            now,
        });
    }

    Ok(signer)
}
