//! # Cryptographic Primitives
//!
//! Everything that authenticates a signed delegation flows through here:
//!
//! - **Keccak-256** for addresses, type hashes, and digests.
//! - **secp256k1** recoverable ECDSA for signatures, so the signer is derived
//!   from the signature itself rather than supplied by the caller.
//! - **EIP-712** typed-data hashing, binding each signature to one ledger on
//!   one chain.
//!
//! Curve math and hashing come from `secp256k1` and `keccak-hash`; this module
//! adds the Ethereum encodings on top.

pub mod hash;
pub mod keys;
pub mod signatures;
pub mod typed_data;

pub use hash::keccak256;
pub use keys::Keypair;
pub use signatures::{recover_signer, RecoverableSignature};
pub use typed_data::{DelegationPayload, Eip712Domain};
