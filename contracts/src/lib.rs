// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MGov Voting-Power Ledger
//!
//! A fungible token that remembers, per account, how much voting power was
//! delegated to it at every past block. Governance code asks "what did X
//! control as of block B" and gets an answer nobody can change after the fact:
//! only settled blocks may be queried, and settled history is immutable.
//!
//! - **Checkpoints** — per-account, block-indexed log of voting power with
//!   same-block overwrite and O(log n) point-in-time lookup.
//! - **Delegation** — one delegatee per account and the move-votes protocol
//!   that shifts weight between delegatees.
//! - **Ledger** — balances, allowances, and supply; the source of "amount
//!   moved" for every vote move.
//! - **Signed delegation** — EIP-712 authorization with nonces and expiry.
//! - **GovToken** — the facade tying all of the above together atomically.
//! - **DevChain** — a deterministic block producer for hosting the token
//!   locally and in tests.
//!
//! ## Design Principles
//!
//! 1. Every operation plans first and commits last. A failed call leaves no
//!    trace: no balance, checkpoint, nonce, or event.
//! 2. All arithmetic is checked. Vote underflow is a bookkeeping bug and
//!    aborts the operation instead of clamping.
//! 3. Every public type is serializable (serde) for the node API and replay
//!    files.

pub mod checkpoints;
pub mod delegation;
pub mod dev_chain;
pub mod events;
pub mod gov_token;
pub mod ledger;
pub mod signed_delegation;

pub use checkpoints::{Checkpoint, CheckpointError, CheckpointStore};
pub use delegation::{DelegationRegistry, MoveVotesError, VoteWrite};
pub use dev_chain::DevChain;
pub use events::{EventRecord, LedgerEvent};
pub use gov_token::{ErrorKind, GovError, GovToken};
pub use ledger::{BaseLedger, LedgerError};
pub use signed_delegation::{SignedDelegation, SignedDelegationError};
