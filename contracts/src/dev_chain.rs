//! # Dev Chain
//!
//! A single-node block producer wrapped around one [`GovToken`], behaving like
//! a local development network:
//!
//! - deploying the token mines block 1 on top of genesis block 0;
//! - with automine on, every successful transaction is mined in its own block;
//! - with automine off, transactions pile up in one pending block until
//!   [`DevChain::mine`] seals it;
//! - a rejected transaction is never included and leaves no trace;
//! - views run against the latest sealed block.
//!
//! Switching automine back on does not seal the pending block. The next
//! transaction (or [`DevChain::mine`]) does.

use mgov_protocol::{Address, Amount, BlockEnv, BlockNumber, LedgerConfig};

use crate::gov_token::{GovError, GovToken};
use crate::signed_delegation::SignedDelegation;

#[derive(Debug, Clone)]
pub struct DevChain {
    token: GovToken,
    latest: BlockEnv,
    pending: Option<BlockEnv>,
    automine: bool,
    interval: u64,
}

impl DevChain {
    /// Starts a chain at genesis and deploys a token owned by `owner`.
    pub fn new(config: LedgerConfig, owner: Address) -> Self {
        let interval = config.block_interval_secs;
        let genesis = BlockEnv::new(0, config.genesis_timestamp);
        let deploy = genesis.next(interval);

        let token = GovToken::new(config, owner, deploy);
        tracing::debug!(block = deploy.number, "dev chain started");
        Self {
            token,
            latest: deploy,
            pending: None,
            automine: true,
            interval,
        }
    }

    pub fn token(&self) -> &GovToken {
        &self.token
    }

    pub fn latest_block(&self) -> BlockEnv {
        self.latest
    }

    pub fn latest_block_number(&self) -> BlockNumber {
        self.latest.number
    }

    pub fn pending_block(&self) -> Option<BlockEnv> {
        self.pending
    }

    pub fn automine(&self) -> bool {
        self.automine
    }

    pub fn set_automine(&mut self, enabled: bool) {
        tracing::debug!(enabled, "automine toggled");
        self.automine = enabled;
    }

    /// Seals the pending block, or mines an empty one. Returns its number.
    pub fn mine(&mut self) -> BlockNumber {
        self.latest = self
            .pending
            .take()
            .unwrap_or_else(|| self.latest.next(self.interval));
        self.token.enter_block(self.latest);
        tracing::trace!(block = self.latest.number, "block mined");
        self.latest.number
    }

    /// Moves the chain forward by one block.
    pub fn advance(&mut self) -> BlockNumber {
        self.mine()
    }

    /// Mines `count` blocks.
    pub fn advance_by(&mut self, count: u64) -> BlockNumber {
        for _ in 0..count {
            self.mine();
        }
        self.latest.number
    }

    /// Runs one transaction against the token.
    ///
    /// On success the transaction is mined (automine) or joins the pending
    /// block. On failure the chain does not move.
    pub fn execute<T>(
        &mut self,
        tx: impl FnOnce(&mut GovToken) -> Result<T, GovError>,
    ) -> Result<T, GovError> {
        let env = self
            .pending
            .unwrap_or_else(|| self.latest.next(self.interval));
        self.token.enter_block(env);

        let result = tx(&mut self.token);
        if result.is_ok() {
            if self.automine {
                self.pending = None;
                self.latest = env;
            } else {
                self.pending = Some(env);
            }
        }
        self.token.enter_block(self.latest);
        result
    }

    // -- transactions -------------------------------------------------------

    pub fn delegate(&mut self, caller: Address, delegatee: Address) -> Result<(), GovError> {
        self.execute(|t| t.delegate(caller, delegatee))
    }

    pub fn delegate_by_sig(&mut self, request: &SignedDelegation) -> Result<Address, GovError> {
        self.execute(|t| t.delegate_by_sig(request))
    }

    pub fn mint_to(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), GovError> {
        self.execute(|t| t.mint_to(caller, to, amount))
    }

    pub fn mint(&mut self, caller: Address, amount: Amount) -> Result<(), GovError> {
        self.execute(|t| t.mint(caller, amount))
    }

    pub fn burn(&mut self, caller: Address, from: Address, amount: Amount) -> Result<(), GovError> {
        self.execute(|t| t.burn(caller, from, amount))
    }

    pub fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), GovError> {
        self.execute(|t| t.transfer(caller, to, amount))
    }

    pub fn approve(&mut self, caller: Address, spender: Address, amount: Amount) -> Result<(), GovError> {
        self.execute(|t| t.approve(caller, spender, amount))
    }

    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), GovError> {
        self.execute(|t| t.transfer_from(caller, from, to, amount))
    }
}
