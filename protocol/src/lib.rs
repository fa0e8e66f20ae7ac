// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MGov Protocol — Core Primitives
//!
//! The building blocks shared by the voting-power ledger and the node that
//! serves it. Nothing in here knows about checkpoints or delegation; this
//! crate only answers "who is this", "what did they sign", and "how is the
//! ledger configured".
//!
//! ## Modules
//!
//! - **types** — 20-byte account addresses, token amounts, block environment.
//! - **crypto** — Keccak-256, secp256k1 keys, recoverable signatures, and
//!   EIP-712 typed-data hashing for signed delegation.
//! - **config** — Compile-time constants and the runtime `LedgerConfig`.
//!
//! ## Compatibility
//!
//! Addresses, hashes, and signatures follow the Ethereum conventions byte for
//! byte. A delegation signed by an Ethereum wallet against the same domain
//! recovers to the same signer here.

pub mod config;
pub mod crypto;
pub mod types;

pub use config::LedgerConfig;
pub use types::{Address, Amount, BlockEnv, BlockNumber, Timestamp};
