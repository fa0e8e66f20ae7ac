// Checkpoint and delegation benchmarks for the MGov ledger.
//
// Covers point-in-time vote lookup over logs of various lengths, checkpoint
// appends, and the full delegate-then-transfer path through the token.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use mgov_contracts::{CheckpointStore, DevChain};
use mgov_protocol::crypto::keys::Keypair;
use mgov_protocol::crypto::typed_data::DelegationPayload;
use mgov_protocol::{Address, LedgerConfig};

fn store_with(account: Address, len: u64) -> CheckpointStore {
    let mut store = CheckpointStore::new();
    for block in 1..=len {
        store.write_checkpoint(account, u128::from(block), block * 2);
    }
    store
}

fn bench_prior_votes(c: &mut Criterion) {
    let mut group = c.benchmark_group("checkpoints/prior_votes");
    let account = Address::from_low_u64(1);

    for len in [16u64, 1_024, 65_536] {
        let store = store_with(account, len);
        let current = len * 2 + 1;
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            // Mid-history lookup, past the latest-entry fast path.
            b.iter(|| store.prior_votes(&account, len, current));
        });
    }

    group.finish();
}

fn bench_write_checkpoint(c: &mut Criterion) {
    let account = Address::from_low_u64(1);

    c.bench_function("checkpoints/append", |b| {
        b.iter_with_setup(
            || store_with(account, 1_024),
            |mut store| store.write_checkpoint(account, 7, 1_000_000),
        );
    });

    c.bench_function("checkpoints/overwrite_same_block", |b| {
        let mut store = store_with(account, 1_024);
        b.iter(|| store.write_checkpoint(account, 7, 2_048));
    });
}

fn bench_transfer_between_delegates(c: &mut Criterion) {
    let owner = Address::from_low_u64(100);
    let alice = Address::from_low_u64(1);
    let bob = Address::from_low_u64(2);

    let mut chain = DevChain::new(LedgerConfig::default(), owner);
    chain.delegate(alice, alice).ok();
    chain.delegate(bob, bob).ok();
    chain.mint_to(owner, alice, u128::MAX / 2).ok();

    c.bench_function("token/transfer_between_delegates", |b| {
        b.iter(|| chain.transfer(alice, bob, 1));
    });
}

fn bench_delegate_by_sig(c: &mut Criterion) {
    let signer = Keypair::generate();
    let chain = DevChain::new(LedgerConfig::default(), Address::from_low_u64(100));
    let payload = DelegationPayload {
        delegatee: Address::from_low_u64(1),
        nonce: 0,
        expiry: u64::MAX,
    };

    c.bench_function("token/delegate_by_sig_sign_and_recover", |b| {
        b.iter_with_setup(
            || chain.clone(),
            |mut chain| {
                let request = mgov_contracts::SignedDelegation {
                    delegatee: payload.delegatee,
                    nonce: payload.nonce,
                    expiry: payload.expiry,
                    signature: signer.sign_delegation(chain.token().domain(), &payload),
                };
                chain.delegate_by_sig(&request)
            },
        );
    });
}

criterion_group!(
    benches,
    bench_prior_votes,
    bench_write_checkpoint,
    bench_transfer_between_delegates,
    bench_delegate_by_sig,
);
criterion_main!(benches);
