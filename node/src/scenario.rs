//! # Scenario Replay
//!
//! Runs a scripted sequence of transactions, block controls, and
//! expectations against a fresh [`DevChain`]. Used by `mgov-node replay` to
//! reproduce governance test suites without a running server.
//!
//! ```json
//! {
//!   "owner": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
//!   "steps": [
//!     { "op": "delegate", "from": "0xf39f...", "delegatee": "0xf39f..." },
//!     { "op": "mint", "from": "0xf39f...", "to": "0xf39f...", "amount": "1000" },
//!     { "op": "advance" },
//!     { "op": "expect_prior_votes", "account": "0xf39f...", "block": 3, "votes": "1000" },
//!     { "op": "transfer", "from": "0x7099...", "to": "0xf39f...", "amount": "1",
//!       "expect_error": "ERC20: transfer amount exceeds balance" }
//!   ]
//! }
//! ```

use anyhow::{bail, Context, Result};
use mgov_contracts::{DevChain, GovError, SignedDelegation};
use mgov_protocol::crypto::keys::Keypair;
use mgov_protocol::crypto::typed_data::DelegationPayload;
use mgov_protocol::types::amount_serde;
use mgov_protocol::{Address, Amount, BlockNumber, LedgerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Token owner; allowed to mint and burn.
    pub owner: Address,
    pub steps: Vec<Step>,
}

/// One scenario step plus its expected outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    /// When set, the step must fail with exactly this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Delegate {
        from: Address,
        delegatee: Address,
    },
    /// Submits a pre-signed delegation.
    DelegateBySig(SignedDelegation),
    /// Signs a delegation with `signer_key` (hex secret) and submits it.
    SignAndDelegate {
        signer_key: String,
        delegatee: Address,
        nonce: u64,
        expiry: u64,
    },
    Mint {
        from: Address,
        /// Defaults to `from`.
        #[serde(default)]
        to: Option<Address>,
        #[serde(with = "amount_serde")]
        amount: Amount,
    },
    Burn {
        from: Address,
        account: Address,
        #[serde(with = "amount_serde")]
        amount: Amount,
    },
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "amount_serde")]
        amount: Amount,
    },
    Approve {
        from: Address,
        spender: Address,
        #[serde(with = "amount_serde")]
        amount: Amount,
    },
    TransferFrom {
        from: Address,
        owner: Address,
        to: Address,
        #[serde(with = "amount_serde")]
        amount: Amount,
    },
    SetAutomine {
        enabled: bool,
    },
    Mine,
    Advance {
        #[serde(default = "one")]
        blocks: u64,
    },
    ExpectBalance {
        account: Address,
        #[serde(with = "amount_serde")]
        balance: Amount,
    },
    ExpectVotes {
        account: Address,
        #[serde(with = "amount_serde")]
        votes: Amount,
    },
    /// `block` may be negative, meaning relative to the latest block.
    ExpectPriorVotes {
        account: Address,
        block: i64,
        #[serde(with = "amount_serde")]
        votes: Amount,
    },
    ExpectNumCheckpoints {
        account: Address,
        count: usize,
    },
    ExpectDelegate {
        account: Address,
        delegatee: Address,
    },
    ExpectNonce {
        account: Address,
        nonce: u64,
    },
}

fn one() -> u64 {
    1
}

/// Summary of a successful replay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayReport {
    pub steps: usize,
    pub transactions: usize,
    pub rejected_as_expected: usize,
    pub expectations: usize,
    pub final_block: BlockNumber,
}

impl Scenario {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Runs every step on a fresh chain, stopping at the first mismatch.
    pub fn replay(&self, config: LedgerConfig) -> Result<ReplayReport> {
        let mut chain = DevChain::new(config, self.owner);
        let mut report = ReplayReport::default();

        for (i, step) in self.steps.iter().enumerate() {
            run_step(&mut chain, step, &mut report)
                .with_context(|| format!("step {} ({:?}) failed", i, step.action))?;
            report.steps += 1;
        }

        report.final_block = chain.latest_block_number();
        tracing::info!(
            steps = report.steps,
            final_block = report.final_block,
            "scenario replayed"
        );
        Ok(report)
    }
}

fn run_step(chain: &mut DevChain, step: &Step, report: &mut ReplayReport) -> Result<()> {
    let outcome: Result<(), GovError> = match &step.action {
        Action::Delegate { from, delegatee } => chain.delegate(*from, *delegatee),
        Action::DelegateBySig(request) => chain.delegate_by_sig(request).map(|_| ()),
        Action::SignAndDelegate {
            signer_key,
            delegatee,
            nonce,
            expiry,
        } => {
            let signer = Keypair::from_secret_hex(signer_key).context("invalid signer_key")?;
            let payload = DelegationPayload {
                delegatee: *delegatee,
                nonce: *nonce,
                expiry: *expiry,
            };
            let request = SignedDelegation {
                delegatee: *delegatee,
                nonce: *nonce,
                expiry: *expiry,
                signature: signer.sign_delegation(chain.token().domain(), &payload),
            };
            chain.delegate_by_sig(&request).map(|_| ())
        }
        Action::Mint { from, to, amount } => match to {
            Some(to) => chain.mint_to(*from, *to, *amount),
            None => chain.mint(*from, *amount),
        },
        Action::Burn {
            from,
            account,
            amount,
        } => chain.burn(*from, *account, *amount),
        Action::Transfer { from, to, amount } => chain.transfer(*from, *to, *amount),
        Action::Approve {
            from,
            spender,
            amount,
        } => chain.approve(*from, *spender, *amount),
        Action::TransferFrom {
            from,
            owner,
            to,
            amount,
        } => chain.transfer_from(*from, *owner, *to, *amount),
        Action::SetAutomine { enabled } => {
            chain.set_automine(*enabled);
            return Ok(());
        }
        Action::Mine => {
            chain.mine();
            return Ok(());
        }
        Action::Advance { blocks } => {
            chain.advance_by(*blocks);
            return Ok(());
        }
        expectation => {
            check_expectation(chain, expectation)?;
            report.expectations += 1;
            return Ok(());
        }
    };

    report.transactions += 1;
    match (outcome, &step.expect_error) {
        (Ok(()), None) => Ok(()),
        (Ok(()), Some(expected)) => bail!("expected failure {:?}, but it succeeded", expected),
        (Err(e), None) => Err(e).context("unexpected failure"),
        (Err(e), Some(expected)) if e.to_string() == *expected => {
            report.rejected_as_expected += 1;
            Ok(())
        }
        (Err(e), Some(expected)) => bail!("expected failure {:?}, got {:?}", expected, e.to_string()),
    }
}

fn check_expectation(chain: &DevChain, action: &Action) -> Result<()> {
    let token = chain.token();
    match action {
        Action::ExpectBalance { account, balance } => {
            ensure_eq("balance", token.balance_of(account), *balance)
        }
        Action::ExpectVotes { account, votes } => {
            ensure_eq("current votes", token.current_votes(account), *votes)
        }
        Action::ExpectPriorVotes {
            account,
            block,
            votes,
        } => {
            let block = resolve_block(chain.latest_block_number(), *block)?;
            let actual = token.prior_votes(account, block)?;
            ensure_eq("prior votes", actual, *votes)
        }
        Action::ExpectNumCheckpoints { account, count } => {
            ensure_eq("checkpoint count", token.num_checkpoints(account), *count)
        }
        Action::ExpectDelegate { account, delegatee } => {
            ensure_eq("delegatee", token.delegates(account), *delegatee)
        }
        Action::ExpectNonce { account, nonce } => {
            ensure_eq("nonce", token.nonces(account), *nonce)
        }
        other => bail!("{:?} is not an expectation", other),
    }
}

fn resolve_block(latest: BlockNumber, block: i64) -> Result<BlockNumber> {
    if block >= 0 {
        return Ok(block as BlockNumber);
    }
    latest
        .checked_sub(block.unsigned_abs())
        .with_context(|| format!("block {} reaches before genesis", block))
}

fn ensure_eq<T: PartialEq + std::fmt::Debug>(what: &str, actual: T, expected: T) -> Result<()> {
    if actual != expected {
        bail!("{} mismatch: expected {:?}, got {:?}", what, expected, actual);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SUITE: &str = include_str!("../scenarios/delegation_suite.json");

    #[test]
    fn bundled_suite_replays_cleanly() {
        let scenario: Scenario = serde_json::from_str(SUITE).unwrap();
        let report = scenario.replay(LedgerConfig::default()).unwrap();
        assert_eq!(report.steps, scenario.steps.len());
        assert!(report.rejected_as_expected > 0);
        assert!(report.expectations > 0);
    }

    #[test]
    fn mismatch_names_the_step() {
        let owner = Address::from_low_u64(1);
        let scenario = Scenario {
            owner,
            steps: vec![
                Step {
                    action: Action::Mint {
                        from: owner,
                        to: None,
                        amount: 5,
                    },
                    expect_error: None,
                },
                Step {
                    action: Action::ExpectBalance {
                        account: owner,
                        balance: 6,
                    },
                    expect_error: None,
                },
            ],
        };
        let err = scenario.replay(LedgerConfig::default()).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("step 1"), "{chain}");
        assert!(chain.contains("balance mismatch"), "{chain}");
    }

    #[test]
    fn unexpected_success_is_a_failure() {
        let owner = Address::from_low_u64(1);
        let scenario = Scenario {
            owner,
            steps: vec![Step {
                action: Action::Mint {
                    from: owner,
                    to: None,
                    amount: 5,
                },
                expect_error: Some("Ownable: caller is not the owner".into()),
            }],
        };
        assert!(scenario.replay(LedgerConfig::default()).is_err());
    }

    #[test]
    fn relative_blocks_resolve_from_latest() {
        assert_eq!(resolve_block(10, -1).unwrap(), 9);
        assert_eq!(resolve_block(10, 4).unwrap(), 4);
        assert!(resolve_block(3, -4).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SUITE.as_bytes()).unwrap();
        let scenario = Scenario::from_json_file(file.path()).unwrap();
        assert!(!scenario.steps.is_empty());
    }
}
