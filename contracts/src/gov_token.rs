//! # Governance Token
//!
//! The facade external callers talk to. It owns the base ledger, the
//! delegation registry, the checkpoint store, the signature nonces, and the
//! event journal, and it is the only thing that mutates any of them.
//!
//! ## Atomicity
//!
//! Every mutating entry point follows the same shape:
//!
//! 1. validate and plan (balance change, vote writes, allowance, nonce);
//! 2. commit everything, emit events.
//!
//! Step 1 never writes, so an error at any point leaves the token exactly as
//! it was. Step 2 never fails.
//!
//! ## Caller identity
//!
//! Entry points take the caller (`msg.sender`) explicitly. The one exception
//! is [`GovToken::delegate_by_sig`], whose delegator is recovered from the
//! signature.

use mgov_protocol::crypto::typed_data::{DelegationPayload, Eip712Domain};
use mgov_protocol::{Address, Amount, BlockEnv, BlockNumber, LedgerConfig};
use thiserror::Error;

use crate::checkpoints::{Checkpoint, CheckpointError, CheckpointStore};
use crate::delegation::{plan_move_votes, DelegationRegistry, MoveVotesError, VoteWrite};
use crate::events::{EventLog, EventRecord, LedgerEvent};
use crate::ledger::{BalanceChange, BaseLedger, LedgerError};
use crate::signed_delegation::{
    authenticate, NonceRegistry, SignedDelegation, SignedDelegationError,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything a token operation can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovError {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    SignedDelegation(#[from] SignedDelegationError),

    #[error(transparent)]
    MoveVotes(#[from] MoveVotesError),

    #[error("Ownable: caller is not the owner")]
    NotOwner { caller: Address },

    #[error("Ownable: new owner is the zero address")]
    ZeroOwner,

    #[error("block cannot move backwards: at {current}, asked for {requested}")]
    BlockRegression {
        current: BlockNumber,
        requested: BlockNumber,
    },
}

/// Coarse classification of a [`GovError`], for callers that branch on cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller asked for something that cannot be answered or done
    /// (future block, bad index, non-monotonic block).
    Precondition,
    /// Ownership or signed-delegation checks failed.
    Authorization,
    /// Balance or allowance rules rejected the operation.
    Ledger,
    /// Internal bookkeeping is inconsistent. Always a bug.
    Invariant,
}

impl GovError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovError::Checkpoint(_) | GovError::BlockRegression { .. } => ErrorKind::Precondition,
            GovError::SignedDelegation(_) | GovError::NotOwner { .. } => ErrorKind::Authorization,
            GovError::Ledger(_) | GovError::ZeroOwner => ErrorKind::Ledger,
            GovError::MoveVotes(_) => ErrorKind::Invariant,
        }
    }
}

// ---------------------------------------------------------------------------
// GovToken
// ---------------------------------------------------------------------------

/// A delegation plan: the registry update plus the vote writes it implies.
struct DelegationPlan {
    delegator: Address,
    from_delegate: Address,
    to_delegate: Address,
    writes: Vec<VoteWrite>,
}

/// Fungible token with delegated, checkpointed voting power.
#[derive(Debug, Clone)]
pub struct GovToken {
    config: LedgerConfig,
    domain: Eip712Domain,
    owner: Address,
    block: BlockEnv,
    ledger: BaseLedger,
    delegation: DelegationRegistry,
    checkpoints: CheckpointStore,
    nonces: NonceRegistry,
    events: EventLog,
}

impl GovToken {
    /// Deploys a token owned by `owner`, executing in `genesis`.
    pub fn new(config: LedgerConfig, owner: Address, genesis: BlockEnv) -> Self {
        let domain = Eip712Domain::from_config(&config);
        tracing::debug!(
            name = %config.name,
            chain_id = config.chain_id,
            owner = %owner,
            "token deployed"
        );
        Self {
            config,
            domain,
            owner,
            block: genesis,
            ledger: BaseLedger::new(),
            delegation: DelegationRegistry::new(),
            checkpoints: CheckpointStore::new(),
            nonces: NonceRegistry::new(),
            events: EventLog::new(),
        }
    }

    // -- block environment ------------------------------------------------

    pub fn block(&self) -> BlockEnv {
        self.block
    }

    /// Moves execution to `env`. Block numbers may repeat (several operations
    /// in one block) but never decrease.
    pub fn begin_block(&mut self, env: BlockEnv) -> Result<(), GovError> {
        if env.number < self.block.number {
            return Err(GovError::BlockRegression {
                current: self.block.number,
                requested: env.number,
            });
        }
        self.block = env;
        Ok(())
    }

    /// Unchecked block switch for the dev chain, which also needs to step
    /// back from a pending block to the latest sealed one.
    pub(crate) fn enter_block(&mut self, env: BlockEnv) {
        self.block = env;
    }

    // -- metadata -----------------------------------------------------------

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.config.decimals
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    pub fn domain_separator(&self) -> [u8; 32] {
        self.domain.separator()
    }

    /// The digest a delegator must sign for [`delegate_by_sig`](Self::delegate_by_sig).
    pub fn delegation_digest(&self, delegatee: Address, nonce: u64, expiry: u64) -> [u8; 32] {
        self.domain.digest(&DelegationPayload {
            delegatee,
            nonce,
            expiry,
        })
    }

    // -- balances -----------------------------------------------------------

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.ledger.balance_of(account)
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.ledger.allowance(owner, spender)
    }

    // -- votes --------------------------------------------------------------

    pub fn delegates(&self, account: &Address) -> Address {
        self.delegation.delegates(account)
    }

    pub fn nonces(&self, account: &Address) -> u64 {
        self.nonces.nonce_of(account)
    }

    pub fn current_votes(&self, account: &Address) -> Amount {
        self.checkpoints.current_votes(account)
    }

    /// Voting power of `account` at the end of a settled block.
    pub fn prior_votes(&self, account: &Address, block: BlockNumber) -> Result<Amount, GovError> {
        Ok(self
            .checkpoints
            .prior_votes(account, block, self.block.number)?)
    }

    pub fn num_checkpoints(&self, account: &Address) -> usize {
        self.checkpoints.num_checkpoints(account)
    }

    pub fn checkpoint_at(&self, account: &Address, index: usize) -> Result<Checkpoint, GovError> {
        Ok(self.checkpoints.checkpoint_at(account, index)?)
    }

    /// Raw-slot read: `(0, 0)` for indices that were never written.
    pub fn checkpoint_or_default(&self, account: &Address, index: usize) -> Checkpoint {
        self.checkpoints.checkpoint_or_default(account, index)
    }

    pub fn checkpoints(&self, account: &Address) -> &[Checkpoint] {
        self.checkpoints.checkpoints(account)
    }

    // -- events -------------------------------------------------------------

    pub fn events(&self) -> &[EventRecord] {
        self.events.all()
    }

    pub fn events_since(&self, sequence: u64) -> &[EventRecord] {
        self.events.since(sequence)
    }

    pub fn events_in_block(&self, block: BlockNumber) -> Vec<&EventRecord> {
        self.events.in_block(block).collect()
    }

    // -- ownership ----------------------------------------------------------

    fn only_owner(&self, caller: &Address) -> Result<(), GovError> {
        if *caller != self.owner {
            return Err(GovError::NotOwner { caller: *caller });
        }
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), GovError> {
        self.only_owner(&caller)?;
        if new_owner.is_zero() {
            return Err(GovError::ZeroOwner);
        }
        tracing::debug!(previous = %self.owner, new = %new_owner, "ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    // -- balance-changing operations -----------------------------------------

    /// Mints `amount` to `to`. Owner only.
    pub fn mint_to(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), GovError> {
        self.only_owner(&caller)?;
        let change = self.ledger.plan_mint(to, amount)?;
        self.apply_balance_change(change)
    }

    /// Mints `amount` to the caller. Owner only.
    pub fn mint(&mut self, caller: Address, amount: Amount) -> Result<(), GovError> {
        self.mint_to(caller, caller, amount)
    }

    /// Burns `amount` of `from`'s tokens. Owner only.
    pub fn burn(&mut self, caller: Address, from: Address, amount: Amount) -> Result<(), GovError> {
        self.only_owner(&caller)?;
        let change = self.ledger.plan_burn(from, amount)?;
        self.apply_balance_change(change)
    }

    pub fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), GovError> {
        let change = self.ledger.plan_transfer(caller, to, amount)?;
        self.apply_balance_change(change)
    }

    pub fn approve(&mut self, caller: Address, spender: Address, amount: Amount) -> Result<(), GovError> {
        self.ledger.check_approve(&caller, &spender)?;
        self.ledger.set_allowance(caller, spender, amount);
        self.events.push(
            self.block.number,
            LedgerEvent::Approval {
                owner: caller,
                spender,
                value: amount,
            },
        );
        Ok(())
    }

    /// Moves `amount` from `from` to `to`, spending the caller's allowance.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), GovError> {
        let remaining = self.ledger.plan_spend_allowance(&from, &caller, amount)?;
        let change = self.ledger.plan_transfer(from, to, amount)?;
        let writes = self.plan_hook(&change)?;

        if remaining != self.ledger.allowance(&from, &caller) {
            self.ledger.set_allowance(from, caller, remaining);
            self.events.push(
                self.block.number,
                LedgerEvent::Approval {
                    owner: from,
                    spender: caller,
                    value: remaining,
                },
            );
        }
        self.commit_balance_change(&change, writes);
        Ok(())
    }

    /// Plans the vote move that must accompany `change`.
    fn plan_hook(&self, change: &BalanceChange) -> Result<Vec<VoteWrite>, GovError> {
        let from_delegate = change
            .from
            .map(|a| self.delegation.delegates(&a))
            .unwrap_or(Address::ZERO);
        let to_delegate = change
            .to
            .map(|a| self.delegation.delegates(&a))
            .unwrap_or(Address::ZERO);

        Ok(plan_move_votes(
            |a| self.checkpoints.current_votes(a),
            from_delegate,
            to_delegate,
            change.amount,
        )?)
    }

    fn apply_balance_change(&mut self, change: BalanceChange) -> Result<(), GovError> {
        let writes = self.plan_hook(&change)?;
        self.commit_balance_change(&change, writes);
        Ok(())
    }

    fn commit_balance_change(&mut self, change: &BalanceChange, writes: Vec<VoteWrite>) {
        self.ledger.commit(change);
        self.events.push(
            self.block.number,
            LedgerEvent::Transfer {
                from: change.from.unwrap_or(Address::ZERO),
                to: change.to.unwrap_or(Address::ZERO),
                value: change.amount,
            },
        );
        tracing::debug!(
            from = ?change.from,
            to = ?change.to,
            amount = %change.amount,
            block = self.block.number,
            "balance changed"
        );
        self.commit_vote_writes(writes);
    }

    fn commit_vote_writes(&mut self, writes: Vec<VoteWrite>) {
        for w in writes {
            let changed = self
                .checkpoints
                .write_checkpoint(w.delegate, w.new, self.block.number);
            debug_assert_eq!(changed.previous, w.previous);
            self.events.push(
                self.block.number,
                LedgerEvent::DelegateVotesChanged {
                    delegate: changed.delegate,
                    previous_balance: changed.previous,
                    new_balance: changed.new,
                },
            );
        }
    }

    // -- delegation ---------------------------------------------------------

    /// Delegates the caller's voting power to `delegatee`.
    pub fn delegate(&mut self, caller: Address, delegatee: Address) -> Result<(), GovError> {
        let plan = self.plan_delegation(caller, delegatee)?;
        self.commit_delegation(plan);
        Ok(())
    }

    /// Delegates on behalf of whoever signed `request`.
    ///
    /// # Errors
    ///
    /// In this order: invalid signature, invalid nonce, signature expired.
    pub fn delegate_by_sig(&mut self, request: &SignedDelegation) -> Result<Address, GovError> {
        let signer = match authenticate(&self.domain, &self.nonces, request, self.block.timestamp) {
            Ok(signer) => signer,
            Err(e) => {
                tracing::warn!(
                    delegatee = %request.delegatee,
                    nonce = request.nonce,
                    error = %e,
                    "signed delegation rejected"
                );
                return Err(e.into());
            }
        };
        let plan = self.plan_delegation(signer, request.delegatee)?;

        self.nonces.consume(signer);
        self.commit_delegation(plan);
        Ok(signer)
    }

    fn plan_delegation(&self, delegator: Address, delegatee: Address) -> Result<DelegationPlan, GovError> {
        let from_delegate = self.delegation.delegates(&delegator);
        let writes = plan_move_votes(
            |a| self.checkpoints.current_votes(a),
            from_delegate,
            delegatee,
            self.ledger.balance_of(&delegator),
        )?;
        Ok(DelegationPlan {
            delegator,
            from_delegate,
            to_delegate: delegatee,
            writes,
        })
    }

    fn commit_delegation(&mut self, plan: DelegationPlan) {
        self.delegation.set(plan.delegator, plan.to_delegate);

        let redundant = plan.from_delegate == plan.to_delegate;
        if !redundant || self.config.emit_redundant_delegate_events {
            self.events.push(
                self.block.number,
                LedgerEvent::DelegateChanged {
                    delegator: plan.delegator,
                    from_delegate: plan.from_delegate,
                    to_delegate: plan.to_delegate,
                },
            );
        }
        tracing::debug!(
            delegator = %plan.delegator,
            from = %plan.from_delegate,
            to = %plan.to_delegate,
            block = self.block.number,
            "delegate changed"
        );
        self.commit_vote_writes(plan.writes);
    }
}
