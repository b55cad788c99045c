// Vault throughput benchmarks.
//
// Covers a full deposit/redeem round trip, and deposit throughput against
// vaults that already hold many records.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use shardvault_contracts::FractionVault;
use shardvault_protocol::config::VaultConfig;
use shardvault_protocol::custody::AssetRegistry;
use shardvault_protocol::ledger::FractionBook;
use shardvault_protocol::{Address, CollectionRef, UnitId};

fn fresh_vault() -> (FractionVault, Arc<AssetRegistry>, Address, CollectionRef) {
    let config = VaultConfig::default();
    let registry = Arc::new(AssetRegistry::new(config.custody_address.clone()));
    let book = Arc::new(FractionBook::new());
    let user = Address::new("bench-user");
    registry.set_approval_for_all(&user, &config.custody_address, true);
    let vault = FractionVault::new(config, registry.clone(), book).expect("vault");
    (vault, registry, user, CollectionRef::new("bench"))
}

fn bench_round_trip(c: &mut Criterion) {
    let (vault, registry, user, collection) = fresh_vault();
    registry
        .mint_unit(&collection, UnitId(0), &user)
        .expect("mint");

    c.bench_function("vault/deposit_redeem_round_trip", |b| {
        b.iter(|| {
            let id = vault.deposit(&user, &collection, UnitId(0)).unwrap();
            vault.redeem(&user, id).unwrap();
        });
    });
}

fn bench_deposit_with_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("vault/deposit_with_history");

    for history in [0u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(history),
            &history,
            |b, &history| {
                let (vault, registry, user, collection) = fresh_vault();
                for unit in 0..history {
                    registry.mint_unit(&collection, UnitId(unit), &user).unwrap();
                    vault.deposit(&user, &collection, UnitId(unit)).unwrap();
                }
                let mut next = history;
                b.iter(|| {
                    registry.mint_unit(&collection, UnitId(next), &user).unwrap();
                    vault.deposit(&user, &collection, UnitId(next)).unwrap();
                    next += 1;
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_round_trip, bench_deposit_with_history);
criterion_main!(benches);
