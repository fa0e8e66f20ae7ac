//! # Ledger Events
//!
//! Append-only journal of the notifications external indexers consume.
//! Each record carries the block it was emitted in and a global sequence
//! number, so consumers can page through with [`EventLog::since`].

use mgov_protocol::types::amount_serde;
use mgov_protocol::{Address, Amount, BlockNumber};
use serde::{Deserialize, Serialize};

/// A notification emitted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    /// Tokens moved. `from` is zero for mints, `to` is zero for burns.
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "amount_serde")]
        value: Amount,
    },
    /// An allowance was set or consumed.
    Approval {
        owner: Address,
        spender: Address,
        #[serde(with = "amount_serde")]
        value: Amount,
    },
    /// An account changed its delegatee.
    DelegateChanged {
        delegator: Address,
        from_delegate: Address,
        to_delegate: Address,
    },
    /// A delegatee's voting power changed.
    DelegateVotesChanged {
        delegate: Address,
        #[serde(with = "amount_serde")]
        previous_balance: Amount,
        #[serde(with = "amount_serde")]
        new_balance: Amount,
    },
}

/// An event stamped with where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the journal, starting at 0.
    pub sequence: u64,
    pub block: BlockNumber,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: BlockNumber, event: LedgerEvent) {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord {
            sequence,
            block,
            event,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn all(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `sequence >= from`.
    pub fn since(&self, from: u64) -> &[EventRecord] {
        let start = usize::try_from(from)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// Records emitted in `block`.
    pub fn in_block(&self, block: BlockNumber) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(move |r| r.block == block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(value: Amount) -> LedgerEvent {
        LedgerEvent::Transfer {
            from: Address::ZERO,
            to: Address::from_low_u64(1),
            value,
        }
    }

    #[test]
    fn sequence_numbers_are_dense() {
        let mut log = EventLog::new();
        log.push(1, transfer(1));
        log.push(1, transfer(2));
        log.push(2, transfer(3));
        let seqs: Vec<u64> = log.all().iter().map(|r| r.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(log.in_block(1).count(), 2);
    }

    #[test]
    fn since_pages_through_the_journal() {
        let mut log = EventLog::new();
        for i in 0..5 {
            log.push(i, transfer(u128::from(i)));
        }
        assert_eq!(log.since(3).len(), 2);
        assert_eq!(log.since(3)[0].sequence, 3);
        assert!(log.since(99).is_empty());
    }

    #[test]
    fn serializes_flat_with_tag() {
        let mut log = EventLog::new();
        log.push(
            7,
            LedgerEvent::DelegateVotesChanged {
                delegate: Address::from_low_u64(2),
                previous_balance: 0,
                new_balance: 20_000_000_000_000_000_000,
            },
        );
        let json = serde_json::to_value(&log.all()[0]).unwrap();
        assert_eq!(json["event"], "DelegateVotesChanged");
        assert_eq!(json["block"], 7);
        assert_eq!(json["new_balance"], "20000000000000000000");
    }
}
