//! # Delegation Registry & Move-Votes
//!
//! Each account points at one delegatee (or at nobody, the zero address).
//! Voting power lives with delegatees: an account's balance counts towards
//! whoever it currently delegates to, and towards nobody if it never
//! delegated. Self-delegation is how a holder activates their own balance.
//!
//! [`plan_move_votes`] is the single rule that keeps voting power consistent
//! with balances. It is a pure function of `(from, to, amount)` and the
//! delegates' current votes, and returns the checkpoint writes to perform
//! rather than performing them, so the caller can abort cleanly if anything
//! else in the same operation fails.

use mgov_protocol::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Bookkeeping violations in move-votes.
///
/// Unreachable through well-formed balance changes; seeing one means a
/// balance moved without its votes (or the reverse).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveVotesError {
    #[error("vote amount underflows: {delegate} holds {current}, removing {amount}")]
    Underflow {
        delegate: Address,
        current: Amount,
        amount: Amount,
    },

    #[error("vote amount overflows: {delegate} holds {current}, adding {amount}")]
    Overflow {
        delegate: Address,
        current: Amount,
        amount: Amount,
    },
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Current delegatee of every account that ever delegated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelegationRegistry {
    delegates: HashMap<Address, Address>,
}

impl DelegationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current delegatee of `account`, or the zero address.
    pub fn delegates(&self, account: &Address) -> Address {
        self.delegates.get(account).copied().unwrap_or(Address::ZERO)
    }

    /// Points `account` at `delegatee` and returns the previous delegatee.
    pub fn set(&mut self, account: Address, delegatee: Address) -> Address {
        self.delegates
            .insert(account, delegatee)
            .unwrap_or(Address::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Move-votes
// ---------------------------------------------------------------------------

/// A checkpoint write produced by [`plan_move_votes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteWrite {
    pub delegate: Address,
    pub previous: Amount,
    pub new: Amount,
}

/// Plans the checkpoint writes that move `amount` of voting power from
/// delegatee `from` to delegatee `to`.
///
/// The zero address on either side means "nobody": mints have no source,
/// burns have no destination, and undelegated holders contribute to neither.
/// A zero `amount` plans nothing. `from == to` plans both writes; the second
/// starts from the first's result, and the same-block overwrite rule folds
/// them into one net checkpoint.
///
/// `current_votes` supplies each delegate's present voting power.
pub fn plan_move_votes(
    current_votes: impl Fn(&Address) -> Amount,
    from: Address,
    to: Address,
    amount: Amount,
) -> Result<Vec<VoteWrite>, MoveVotesError> {
    let mut writes = Vec::with_capacity(2);
    if amount == 0 {
        return Ok(writes);
    }

    if let Some(src) = from.non_zero() {
        let current = current_votes(&src);
        let new = current
            .checked_sub(amount)
            .ok_or(MoveVotesError::Underflow {
                delegate: src,
                current,
                amount,
            })?;
        writes.push(VoteWrite {
            delegate: src,
            previous: current,
            new,
        });
    }

    if let Some(dst) = to.non_zero() {
        let current = match writes.first() {
            Some(w) if w.delegate == dst => w.new,
            _ => current_votes(&dst),
        };
        let new = current
            .checked_add(amount)
            .ok_or(MoveVotesError::Overflow {
                delegate: dst,
                current,
                amount,
            })?;
        writes.push(VoteWrite {
            delegate: dst,
            previous: current,
            new,
        });
    }

    Ok(writes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn votes(table: &[(Address, Amount)]) -> impl Fn(&Address) -> Amount + '_ {
        move |addr| {
            table
                .iter()
                .find(|(k, _)| k == addr)
                .map(|(_, v)| *v)
                .unwrap_or(0)
        }
    }

    #[test]
    fn registry_defaults_to_zero() {
        let reg = DelegationRegistry::new();
        assert_eq!(reg.delegates(&a(1)), Address::ZERO);
    }

    #[test]
    fn registry_set_returns_previous() {
        let mut reg = DelegationRegistry::new();
        assert_eq!(reg.set(a(1), a(2)), Address::ZERO);
        assert_eq!(reg.set(a(1), a(3)), a(2));
        assert_eq!(reg.delegates(&a(1)), a(3));
    }

    #[test]
    fn zero_amount_plans_nothing() {
        let plan = plan_move_votes(votes(&[]), a(1), a(2), 0).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn mint_only_credits_destination() {
        let plan = plan_move_votes(votes(&[(a(2), 5)]), Address::ZERO, a(2), 10).unwrap();
        assert_eq!(
            plan,
            vec![VoteWrite {
                delegate: a(2),
                previous: 5,
                new: 15
            }]
        );
    }

    #[test]
    fn burn_only_debits_source() {
        let plan = plan_move_votes(votes(&[(a(1), 10)]), a(1), Address::ZERO, 4).unwrap();
        assert_eq!(
            plan,
            vec![VoteWrite {
                delegate: a(1),
                previous: 10,
                new: 6
            }]
        );
    }

    #[test]
    fn undelegated_parties_move_nothing() {
        let plan = plan_move_votes(votes(&[]), Address::ZERO, Address::ZERO, 4).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn transfer_between_delegates() {
        let plan =
            plan_move_votes(votes(&[(a(1), 10), (a(2), 1)]), a(1), a(2), 3).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].new, 7);
        assert_eq!(plan[1].new, 4);
    }

    #[test]
    fn same_delegate_nets_out() {
        let plan = plan_move_votes(votes(&[(a(1), 10)]), a(1), a(1), 3).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].new, 7);
        assert_eq!(plan[1].previous, 7);
        assert_eq!(plan[1].new, 10);
    }

    #[test]
    fn underflow_aborts() {
        let err = plan_move_votes(votes(&[(a(1), 2)]), a(1), a(2), 3).unwrap_err();
        assert_eq!(
            err,
            MoveVotesError::Underflow {
                delegate: a(1),
                current: 2,
                amount: 3
            }
        );
    }

    #[test]
    fn overflow_aborts() {
        let err =
            plan_move_votes(votes(&[(a(2), Amount::MAX)]), Address::ZERO, a(2), 1).unwrap_err();
        assert!(matches!(err, MoveVotesError::Overflow { .. }));
    }
}
