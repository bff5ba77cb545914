//! Progress Benchmarks — Per-poll Hot Path
//!
//! Benchmarks the domain functions that run on every poll tick: claim
//! id derivation, claim classification and state transitions.
//!
//! Run with: cargo bench --bench progress_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use alloy::primitives::{Address, TxHash, B256, U256};

use onchain_kyc_tracker::domain::claim::{
    claim_id, classify, ClaimRecord, ClaimSignature, SignedClaim, KYC_TOPIC,
};
use onchain_kyc_tracker::domain::progress::{ProgressEvent, ProgressState};

/// Benchmark keccak256(abi.encode(issuer, topic)).
fn bench_claim_id(c: &mut Criterion) {
    let issuer = Address::repeat_byte(0x33);

    c.bench_function("claim_id_derivation", |b| {
        b.iter(|| claim_id(black_box(issuer), black_box(KYC_TOPIC)));
    });
}

/// Benchmark classification of a matching record.
fn bench_classify(c: &mut Criterion) {
    let issuer = Address::repeat_byte(0x33);
    let record = ClaimRecord {
        topic: U256::from(KYC_TOPIC),
        scheme: U256::from(1),
        issuer,
        ..ClaimRecord::default()
    };

    c.bench_function("claim_classify_valid", |b| {
        b.iter(|| classify(black_box(&record), black_box(issuer), KYC_TOPIC));
    });
}

/// Benchmark a full onboarding pass through the state machine.
fn bench_full_flow(c: &mut Criterion) {
    let wallet = Address::repeat_byte(0x11);
    let identity = Address::repeat_byte(0x22);
    let claim = SignedClaim {
        topic: KYC_TOPIC,
        issuer: Address::repeat_byte(0x33),
        data_hash: B256::repeat_byte(0xaa),
        signature: ClaimSignature {
            r: B256::repeat_byte(1),
            s: B256::repeat_byte(2),
            v: 27,
        },
    };

    c.bench_function("progress_full_flow", |b| {
        b.iter(|| {
            ProgressState::default()
                .apply(ProgressEvent::WalletConnected {
                    wallet,
                    ever_had_identity: false,
                    kyc_latched: false,
                })
                .apply(ProgressEvent::IdentityObserved(Some(identity)))
                .apply(ProgressEvent::SignatureObtained(claim.clone()))
                .apply(ProgressEvent::ClaimSubmitted(TxHash::repeat_byte(9)))
                .apply(ProgressEvent::ClaimObserved { valid: true })
        });
    });
}

/// Benchmark the steady-state poll: absent reads against a pending state.
fn bench_idle_poll(c: &mut Criterion) {
    let state = ProgressState::KycPending {
        wallet: Address::repeat_byte(0x11),
        identity: Address::repeat_byte(0x22),
    };

    c.bench_function("progress_idle_poll", |b| {
        b.iter(|| {
            black_box(state.clone())
                .apply(ProgressEvent::IdentityObserved(None))
                .apply(ProgressEvent::ClaimObserved { valid: false })
        });
    });
}

criterion_group!(
    benches,
    bench_claim_id,
    bench_classify,
    bench_full_flow,
    bench_idle_poll,
);
criterion_main!(benches);
