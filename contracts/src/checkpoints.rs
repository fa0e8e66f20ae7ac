//! # Checkpoint Store
//!
//! Per-account history of voting power, one entry per block in which the
//! account's voting power changed.
//!
//! ## Log invariants
//!
//! - Entries are ordered by strictly increasing `from_block`.
//! - A second change within the same block overwrites the last entry instead
//!   of appending, so a block contributes at most one entry and that entry
//!   holds the net result of everything that happened in it.
//! - Entries for earlier blocks are never touched again.
//! - An account with no entries has zero voting power at every block.
//!
//! ## Lookup
//!
//! [`CheckpointStore::prior_votes`] only answers for blocks strictly before
//! the current one. The current block is still open to change, so answering
//! for it would let a caller borrow tokens, vote, and return them within one
//! block.

use mgov_protocol::types::amount_serde;
use mgov_protocol::{Address, Amount, BlockNumber};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Precondition violations on checkpoint queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckpointError {
    /// The queried block is the current block or in the future.
    #[error("MGToken::getPriorVotes: not yet determined")]
    NotYetDetermined {
        /// Block the caller asked about.
        block: BlockNumber,
        /// Block the ledger is currently executing in.
        current: BlockNumber,
    },

    /// The checkpoint index is past the end of the account's log.
    #[error("checkpoint index out of range: {index} >= {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of checkpoints the account has.
        len: usize,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Voting power held from `from_block` until the next checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub from_block: BlockNumber,
    #[serde(with = "amount_serde")]
    pub votes: Amount,
}

/// Notification that a delegate's voting power changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotesChanged {
    pub delegate: Address,
    pub previous: Amount,
    pub new: Amount,
}

/// One account's ordered checkpoint log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointLog {
    entries: Vec<Checkpoint>,
}

impl CheckpointLog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Checkpoint> {
        self.entries.get(index)
    }

    pub fn as_slice(&self) -> &[Checkpoint] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&Checkpoint> {
        self.entries.last()
    }

    /// Votes of the most recent entry, or 0.
    pub fn current_votes(&self) -> Amount {
        self.latest().map(|c| c.votes).unwrap_or(0)
    }

    /// Records `votes` as effective from `block`, returning the previous
    /// current votes. Overwrites in place when the last entry is already at
    /// `block`.
    pub fn write(&mut self, block: BlockNumber, votes: Amount) -> Amount {
        let previous = self.current_votes();
        match self.entries.last_mut() {
            Some(last) if last.from_block == block => last.votes = votes,
            last => {
                debug_assert!(
                    last.map_or(true, |c| c.from_block < block),
                    "checkpoint written for an earlier block"
                );
                self.entries.push(Checkpoint {
                    from_block: block,
                    votes,
                });
            }
        }
        previous
    }

    /// Votes effective at `block`: the entry with the largest `from_block`
    /// not exceeding it, or 0 when `block` predates the log.
    pub fn votes_at(&self, block: BlockNumber) -> Amount {
        let Some(latest) = self.entries.last() else {
            return 0;
        };
        if latest.from_block <= block {
            return latest.votes;
        }
        if self.entries[0].from_block > block {
            return 0;
        }
        // Keys are strictly increasing, so this is a plain binary search for
        // the first entry past `block`.
        let idx = self.entries.partition_point(|c| c.from_block <= block);
        self.entries[idx - 1].votes
    }
}

// ---------------------------------------------------------------------------
// CheckpointStore
// ---------------------------------------------------------------------------

/// Checkpoint logs for every account, created on first write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointStore {
    logs: HashMap<Address, CheckpointLog>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `new_votes` as `account`'s voting power from `block` onward.
    pub fn write_checkpoint(
        &mut self,
        account: Address,
        new_votes: Amount,
        block: BlockNumber,
    ) -> VotesChanged {
        let log = self.logs.entry(account).or_default();
        let previous = log.write(block, new_votes);
        tracing::trace!(
            delegate = %account,
            block,
            previous = %previous,
            new = %new_votes,
            checkpoints = log.len(),
            "checkpoint written"
        );
        VotesChanged {
            delegate: account,
            previous,
            new: new_votes,
        }
    }

    /// Voting power as of the latest checkpoint, or 0.
    pub fn current_votes(&self, account: &Address) -> Amount {
        self.logs
            .get(account)
            .map(CheckpointLog::current_votes)
            .unwrap_or(0)
    }

    /// Voting power `account` held at the end of `block`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::NotYetDetermined`] when
    /// `block >= current_block`.
    pub fn prior_votes(
        &self,
        account: &Address,
        block: BlockNumber,
        current_block: BlockNumber,
    ) -> Result<Amount, CheckpointError> {
        if block >= current_block {
            return Err(CheckpointError::NotYetDetermined {
                block,
                current: current_block,
            });
        }
        Ok(self
            .logs
            .get(account)
            .map(|log| log.votes_at(block))
            .unwrap_or(0))
    }

    pub fn num_checkpoints(&self, account: &Address) -> usize {
        self.logs.get(account).map(CheckpointLog::len).unwrap_or(0)
    }

    /// The checkpoint at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::IndexOutOfRange`] when `index` is not less
    /// than [`num_checkpoints`](Self::num_checkpoints).
    pub fn checkpoint_at(
        &self,
        account: &Address,
        index: usize,
    ) -> Result<Checkpoint, CheckpointError> {
        let log = self.logs.get(account);
        log.and_then(|l| l.get(index))
            .copied()
            .ok_or(CheckpointError::IndexOutOfRange {
                index,
                len: log.map(CheckpointLog::len).unwrap_or(0),
            })
    }

    /// Raw-slot read: the checkpoint at `index`, or `(0, 0)` for an index
    /// that was never written.
    pub fn checkpoint_or_default(&self, account: &Address, index: usize) -> Checkpoint {
        self.checkpoint_at(account, index).unwrap_or_default()
    }

    /// The whole log of `account` (empty if it has none).
    pub fn checkpoints(&self, account: &Address) -> &[Checkpoint] {
        self.logs
            .get(account)
            .map(CheckpointLog::as_slice)
            .unwrap_or(&[])
    }
}
