// Signing & recovery benchmarks for signed delegation.
//
// Covers secp256k1 keypair generation, EIP-712 digest construction, signing a
// delegation, and recovering the signer at various batch sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use mgov_protocol::crypto::keys::Keypair;
use mgov_protocol::crypto::signatures::recover_signer;
use mgov_protocol::crypto::typed_data::{DelegationPayload, Eip712Domain};
use mgov_protocol::{Address, LedgerConfig};

fn payload(nonce: u64) -> DelegationPayload {
    DelegationPayload {
        delegatee: Address::from_low_u64(42),
        nonce,
        expiry: 10_000_000_000,
    }
}

fn bench_keypair_generation(c: &mut Criterion) {
    c.bench_function("secp256k1/keypair_generate", |b| {
        b.iter(Keypair::generate);
    });
}

fn bench_typed_data_digest(c: &mut Criterion) {
    let domain = Eip712Domain::from_config(&LedgerConfig::default());
    let payload = payload(7);

    c.bench_function("eip712/delegation_digest", |b| {
        b.iter(|| domain.digest(&payload));
    });
}

fn bench_sign_delegation(c: &mut Criterion) {
    let keypair = Keypair::generate();
    let domain = Eip712Domain::from_config(&LedgerConfig::default());
    let payload = payload(7);

    c.bench_function("secp256k1/sign_delegation", |b| {
        b.iter(|| keypair.sign_delegation(&domain, &payload));
    });
}

fn bench_recover_signer(c: &mut Criterion) {
    let mut group = c.benchmark_group("secp256k1/recover_signer");
    let domain = Eip712Domain::from_config(&LedgerConfig::default());

    for size in [1usize, 16, 128] {
        let signed: Vec<_> = (0..size as u64)
            .map(|nonce| {
                let keypair = Keypair::generate();
                let digest = domain.digest(&payload(nonce));
                (digest, keypair.sign_delegation(&domain, &payload(nonce)))
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &signed, |b, signed| {
            b.iter(|| {
                for (digest, signature) in signed {
                    recover_signer(digest, signature);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_keypair_generation,
    bench_typed_data_digest,
    bench_sign_delegation,
    bench_recover_signer,
);
criterion_main!(benches);
