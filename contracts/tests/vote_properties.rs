//! Property tests for voting-power bookkeeping.
//!
//! Drives a dev chain through seeded random sequences of mints, burns,
//! transfers, delegations and empty blocks, then checks the history against
//! a snapshot of every account's votes taken at each sealed block.

use std::collections::HashMap;

use mgov_contracts::DevChain;
use mgov_protocol::{Address, Amount, BlockNumber, LedgerConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ACCOUNTS: u64 = 5;
const STEPS: usize = 300;

fn owner() -> Address {
    Address::from_low_u64(100)
}

fn account(i: u64) -> Address {
    Address::from_low_u64(i + 1)
}

fn all_accounts() -> Vec<Address> {
    (0..ACCOUNTS).map(account).chain([owner()]).collect()
}

/// Votes every account held at the end of each sealed block.
type History = HashMap<BlockNumber, HashMap<Address, Amount>>;

fn snapshot(chain: &DevChain, history: &mut History) {
    let votes = all_accounts()
        .into_iter()
        .map(|a| (a, chain.token().current_votes(&a)))
        .collect();
    history.insert(chain.latest_block_number(), votes);
}

fn random_step(chain: &mut DevChain, rng: &mut StdRng) {
    let a = account(rng.gen_range(0..ACCOUNTS));
    let b = account(rng.gen_range(0..ACCOUNTS));
    let amount: Amount = rng.gen_range(0..50);

    // Failures (e.g. overdrafts) are expected and must leave no trace.
    let _ = match rng.gen_range(0..6) {
        0 => chain.mint_to(owner(), a, amount),
        1 => chain.burn(owner(), a, amount),
        2 | 3 => chain.transfer(a, b, amount),
        4 => chain.delegate(a, b),
        _ => {
            chain.advance();
            Ok(())
        }
    };
}

fn run(seed: u64, batched: bool) -> (DevChain, History) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut chain = DevChain::new(LedgerConfig::default(), owner());
    let mut history = History::new();
    snapshot(&chain, &mut history);

    for _ in 0..STEPS {
        if batched && rng.gen_bool(0.1) {
            let enabled = !chain.automine();
            if enabled {
                chain.mine();
            }
            chain.set_automine(enabled);
        }
        let before = chain.latest_block_number();
        random_step(&mut chain, &mut rng);
        if chain.latest_block_number() != before {
            snapshot(&chain, &mut history);
        }
    }
    chain.set_automine(true);
    chain.mine();
    snapshot(&chain, &mut history);
    chain.advance();
    (chain, history)
}

fn check_invariants(chain: &DevChain, history: &History) {
    let token = chain.token();
    let latest = chain.latest_block_number();

    // Delegated balances add up to the votes held by delegates.
    let mut expected: HashMap<Address, Amount> = HashMap::new();
    for a in all_accounts() {
        let delegatee = token.delegates(&a);
        if !delegatee.is_zero() {
            *expected.entry(delegatee).or_default() += token.balance_of(&a);
        }
    }
    for a in all_accounts() {
        assert_eq!(
            token.current_votes(&a),
            expected.get(&a).copied().unwrap_or(0),
            "votes of {a} disagree with delegated balances"
        );
    }

    for a in all_accounts() {
        let log = token.checkpoints(&a);

        // Last checkpoint is the current value.
        match log.last() {
            Some(last) => assert_eq!(last.votes, token.current_votes(&a)),
            None => assert_eq!(token.current_votes(&a), 0),
        }

        // At most one checkpoint per block, in block order.
        for pair in log.windows(2) {
            assert!(pair[0].from_block < pair[1].from_block);
        }

        // Before the first checkpoint there was nothing.
        if let Some(first) = log.first() {
            for block in 0..first.from_block {
                assert_eq!(token.prior_votes(&a, block).unwrap(), 0);
            }
        }

        // Every settled block answers with what was observed at the time.
        for (block, votes) in history {
            if *block < latest {
                assert_eq!(
                    token.prior_votes(&a, *block).unwrap(),
                    votes[&a],
                    "prior votes of {a} at block {block}"
                );
            }
        }

        assert!(token.prior_votes(&a, latest).is_err());
    }
}

#[test]
fn random_automined_sequences_keep_history_consistent() {
    for seed in 0..8 {
        let (chain, history) = run(seed, false);
        check_invariants(&chain, &history);
    }
}

#[test]
fn random_batched_sequences_keep_history_consistent() {
    for seed in 100..108 {
        let (chain, history) = run(seed, true);
        check_invariants(&chain, &history);
    }
}

#[test]
fn checkpoint_count_never_decreases() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut chain = DevChain::new(LedgerConfig::default(), owner());
    let mut counts: HashMap<Address, (usize, BlockNumber)> = HashMap::new();

    for _ in 0..STEPS {
        random_step(&mut chain, &mut rng);
        let block = chain.latest_block_number();
        for a in all_accounts() {
            let n = chain.token().num_checkpoints(&a);
            let (prev, prev_block) = counts.get(&a).copied().unwrap_or((0, 0));
            assert!(n >= prev);
            if block == prev_block {
                assert_eq!(n, prev);
            } else {
                assert!(n <= prev + 1);
            }
            counts.insert(a, (n, block));
        }
    }
}

#[test]
fn zero_amount_operations_leave_checkpoints_alone() {
    let mut chain = DevChain::new(LedgerConfig::default(), owner());
    let (a, b) = (account(0), account(1));
    chain.delegate(a, a).unwrap();
    chain.delegate(b, b).unwrap();
    chain.mint_to(owner(), a, 10).unwrap();

    let before = (chain.token().num_checkpoints(&a), chain.token().num_checkpoints(&b));
    chain.transfer(a, b, 0).unwrap();
    chain.mint_to(owner(), b, 0).unwrap();
    chain.burn(owner(), a, 0).unwrap();
    assert_eq!(
        (chain.token().num_checkpoints(&a), chain.token().num_checkpoints(&b)),
        before
    );
}

#[test]
fn votes_become_visible_one_block_after_they_change() {
    let mut chain = DevChain::new(LedgerConfig::default(), owner());
    let a = account(0);
    chain.delegate(a, a).unwrap();
    chain.mint_to(owner(), a, 42).unwrap();
    let minted_at = chain.latest_block_number();
    chain.advance();

    assert_eq!(chain.token().prior_votes(&a, minted_at - 1).unwrap(), 0);
    assert_eq!(chain.token().prior_votes(&a, minted_at).unwrap(), 42);
}
