//! # Base Ledger
//!
//! Balances, allowances, and total supply with ERC-20 semantics.
//!
//! Balance-changing operations are split into a *plan* step that validates
//! and computes the resulting balances without touching state, and a
//! [`BaseLedger::commit`] step that writes them. The token facade plans the
//! balance change and the matching vote move, and only commits once both
//! are known to succeed.

use mgov_protocol::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Allowance value treated as unlimited; spending from it leaves it intact.
pub const UNLIMITED_ALLOWANCE: Amount = Amount::MAX;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by balance and allowance operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ERC20: transfer from the zero address")]
    TransferFromZero,

    #[error("ERC20: transfer to the zero address")]
    TransferToZero,

    #[error("ERC20: mint to the zero address")]
    MintToZero,

    #[error("ERC20: burn from the zero address")]
    BurnFromZero,

    #[error("ERC20: approve from the zero address")]
    ApproveFromZero,

    #[error("ERC20: approve to the zero address")]
    ApproveToZero,

    #[error("ERC20: transfer amount exceeds balance")]
    InsufficientBalance { balance: Amount, amount: Amount },

    #[error("ERC20: burn amount exceeds balance")]
    BurnExceedsBalance { balance: Amount, amount: Amount },

    #[error("ERC20: insufficient allowance")]
    InsufficientAllowance { allowance: Amount, amount: Amount },

    #[error("supply overflow: minting {amount} would exceed the maximum supply")]
    SupplyOverflow { amount: Amount },
}

// ---------------------------------------------------------------------------
// BalanceChange
// ---------------------------------------------------------------------------

/// A validated, not yet applied balance change.
///
/// `from` is `None` for mints and `to` is `None` for burns; together with
/// `amount` they are exactly what the vote hook needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceChange {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub amount: Amount,
    balances: Vec<(Address, Amount)>,
    total_supply: Amount,
}

// ---------------------------------------------------------------------------
// BaseLedger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseLedger {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl BaseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Validates moving `amount` from `from` to `to`.
    pub fn plan_transfer(
        &self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<BalanceChange, LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::TransferFromZero);
        }
        if to.is_zero() {
            return Err(LedgerError::TransferToZero);
        }

        let balance = self.balance_of(&from);
        let from_after = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance { balance, amount })?;
        let to_before = if from == to {
            from_after
        } else {
            self.balance_of(&to)
        };
        // Cannot overflow: the sum of all balances equals the total supply.
        let to_after = to_before + amount;

        Ok(BalanceChange {
            from: Some(from),
            to: Some(to),
            amount,
            balances: vec![(from, from_after), (to, to_after)],
            total_supply: self.total_supply,
        })
    }

    /// Validates creating `amount` new tokens for `to`.
    pub fn plan_mint(&self, to: Address, amount: Amount) -> Result<BalanceChange, LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::MintToZero);
        }
        let total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow { amount })?;
        let to_after = self.balance_of(&to) + amount;

        Ok(BalanceChange {
            from: None,
            to: Some(to),
            amount,
            balances: vec![(to, to_after)],
            total_supply,
        })
    }

    /// Validates destroying `amount` of `from`'s tokens.
    pub fn plan_burn(&self, from: Address, amount: Amount) -> Result<BalanceChange, LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::BurnFromZero);
        }
        let balance = self.balance_of(&from);
        let from_after = balance
            .checked_sub(amount)
            .ok_or(LedgerError::BurnExceedsBalance { balance, amount })?;

        Ok(BalanceChange {
            from: Some(from),
            to: None,
            amount,
            balances: vec![(from, from_after)],
            total_supply: self.total_supply - amount,
        })
    }

    /// Applies a change produced by one of the `plan_*` methods.
    ///
    /// Must be called before any other mutation of this ledger, or the
    /// planned balances are stale.
    pub fn commit(&mut self, change: &BalanceChange) {
        for (account, balance) in &change.balances {
            self.balances.insert(*account, *balance);
        }
        self.total_supply = change.total_supply;
    }

    /// Validates an `approve`; nothing to plan beyond the guards.
    pub fn check_approve(&self, owner: &Address, spender: &Address) -> Result<(), LedgerError> {
        if owner.is_zero() {
            return Err(LedgerError::ApproveFromZero);
        }
        if spender.is_zero() {
            return Err(LedgerError::ApproveToZero);
        }
        Ok(())
    }

    pub fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances.insert((owner, spender), amount);
    }

    /// The allowance left after `spender` spends `amount` of `owner`'s tokens.
    pub fn plan_spend_allowance(
        &self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        let allowance = self.allowance(owner, spender);
        if allowance == UNLIMITED_ALLOWANCE {
            return Ok(allowance);
        }
        allowance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientAllowance { allowance, amount })
    }
}
