//! # Typed-Data Hashing (EIP-712)
//!
//! Builds the digest a delegator signs off-chain:
//!
//! ```text
//! domainSeparator = keccak256(DOMAIN_TYPEHASH ‖ keccak256(name) ‖ chainId ‖ verifyingContract)
//! structHash      = keccak256(DELEGATION_TYPEHASH ‖ delegatee ‖ nonce ‖ expiry)
//! digest          = keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ structHash)
//! ```
//!
//! The domain pins a signature to one ledger (`name`, `verifyingContract`)
//! on one chain (`chainId`); the nonce pins it to one use.

use serde::{Deserialize, Serialize};

use super::hash::{address_word, encode_words, keccak256, uint_word};
use crate::config::{LedgerConfig, DELEGATION_TYPE, DOMAIN_TYPE};
use crate::types::Address;

/// `keccak256("EIP712Domain(string name,uint256 chainId,address verifyingContract)")`.
pub fn domain_typehash() -> [u8; 32] {
    keccak256(DOMAIN_TYPE)
}

/// `keccak256("Delegation(address delegatee,uint256 nonce,uint256 expiry)")`.
pub fn delegation_typehash() -> [u8; 32] {
    keccak256(DELEGATION_TYPE)
}

/// The signing domain of a ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip712Domain {
    pub name: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    pub fn new(name: impl Into<String>, chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: name.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// The domain a ledger built from `config` verifies against.
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.name.clone(), config.chain_id, config.verifying_contract)
    }

    pub fn separator(&self) -> [u8; 32] {
        keccak256(encode_words(&[
            domain_typehash(),
            keccak256(self.name.as_bytes()),
            uint_word(u128::from(self.chain_id)),
            address_word(&self.verifying_contract),
        ]))
    }

    /// The final digest over `payload`, ready to sign or recover against.
    pub fn digest(&self, payload: &DelegationPayload) -> [u8; 32] {
        let mut preimage = Vec::with_capacity(66);
        preimage.extend_from_slice(&[0x19, 0x01]);
        preimage.extend_from_slice(&self.separator());
        preimage.extend_from_slice(&payload.struct_hash());
        keccak256(preimage)
    }
}

/// The `Delegation` struct a delegator signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationPayload {
    pub delegatee: Address,
    pub nonce: u64,
    pub expiry: u64,
}

impl DelegationPayload {
    pub fn struct_hash(&self) -> [u8; 32] {
        keccak256(encode_words(&[
            delegation_typehash(),
            address_word(&self.delegatee),
            uint_word(u128::from(self.nonce)),
            uint_word(u128::from(self.expiry)),
        ]))
    }
}
