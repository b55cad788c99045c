//! Provider failure tests.
//!
//! Wraps the in-memory providers in fakes that can be told to refuse
//! specific calls, and checks that a refusal midway through a deposit or
//! redemption leaves no trace in custody, the ledger, or the record book,
//! and that a refused rollback is reported rather than swallowed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shardvault_contracts::{FractionVault, RecordStatus, VaultError};
use shardvault_protocol::config::VaultConfig;
use shardvault_protocol::custody::{AssetCustody, AssetRegistry, CustodyError};
use shardvault_protocol::ledger::{FractionBook, FractionLedger, LedgerError};
use shardvault_protocol::{Address, AssetKey, ClaimId, CollectionRef, RecordId, UnitId};

/// Ledger that refuses mints while `refuse_mint` is set.
struct FlakyLedger {
    inner: FractionBook,
    refuse_mint: AtomicBool,
}

impl FractionLedger for FlakyLedger {
    fn mint(&self, claim_id: ClaimId, to: &Address, amount: u64) -> Result<(), LedgerError> {
        if self.refuse_mint.load(Ordering::SeqCst) {
            return Err(LedgerError::SupplyOverflow { claim_id, amount });
        }
        self.inner.mint(claim_id, to, amount)
    }

    fn burn(&self, claim_id: ClaimId, from: &Address, amount: u64) -> Result<(), LedgerError> {
        self.inner.burn(claim_id, from, amount)
    }

    fn balance_of(&self, claim_id: ClaimId, holder: &Address) -> u64 {
        self.inner.balance_of(claim_id, holder)
    }

    fn total_supply(&self, claim_id: ClaimId) -> u64 {
        self.inner.total_supply(claim_id)
    }
}

/// Custody that refuses releases out of the vault while `refuse_release` is
/// set, and reports every unit as held elsewhere while `seized` is set.
struct StuckCustody {
    inner: AssetRegistry,
    refuse_release: AtomicBool,
    seized: AtomicBool,
}

fn seizer() -> Address {
    Address::new("seizer")
}

impl AssetCustody for StuckCustody {
    fn transfer(
        &self,
        collection: &CollectionRef,
        unit: UnitId,
        from: &Address,
        to: &Address,
    ) -> Result<(), CustodyError> {
        if from == self.inner.custody_address() && self.seized.load(Ordering::SeqCst) {
            return Err(CustodyError::NotOwner {
                asset: AssetKey::new(collection.clone(), unit),
                claimed: from.clone(),
                owner: seizer(),
            });
        }
        if from == self.inner.custody_address() && self.refuse_release.load(Ordering::SeqCst) {
            return Err(CustodyError::AlreadyLocked(AssetKey::new(
                collection.clone(),
                unit,
            )));
        }
        self.inner.transfer(collection, unit, from, to)
    }

    fn owner_of(&self, collection: &CollectionRef, unit: UnitId) -> Option<Address> {
        if self.seized.load(Ordering::SeqCst) {
            return Some(seizer());
        }
        self.inner.owner_of(collection, unit)
    }
}

fn setup() -> (FractionVault, Arc<StuckCustody>, Arc<FlakyLedger>, CollectionRef, Address) {
    let config = VaultConfig::default();
    let custody = Arc::new(StuckCustody {
        inner: AssetRegistry::new(config.custody_address.clone()),
        refuse_release: AtomicBool::new(false),
        seized: AtomicBool::new(false),
    });
    let ledger = Arc::new(FlakyLedger {
        inner: FractionBook::new(),
        refuse_mint: AtomicBool::new(false),
    });
    let collection = CollectionRef::new("C");
    let user = Address::new("U");
    custody
        .inner
        .mint_unit(&collection, UnitId(1), &user)
        .unwrap();
    custody
        .inner
        .set_approval_for_all(&user, &config.custody_address, true);

    let vault = FractionVault::new(config, custody.clone(), ledger.clone()).unwrap();
    (vault, custody, ledger, collection, user)
}

#[test]
fn mint_failure_returns_asset_to_depositor() {
    let (vault, custody, ledger, collection, user) = setup();
    ledger.refuse_mint.store(true, Ordering::SeqCst);

    let result = vault.deposit(&user, &collection, UnitId(1));
    assert!(matches!(result, Err(VaultError::LedgerOperationFailed(_))));

    assert_eq!(custody.owner_of(&collection, UnitId(1)), Some(user.clone()));
    assert_eq!(vault.record_count(), 0);
    assert!(vault.active_record_for(&collection, UnitId(1)).is_none());

    ledger.refuse_mint.store(false, Ordering::SeqCst);
    let record_id = vault.deposit(&user, &collection, UnitId(1)).unwrap();
    assert_eq!(record_id, RecordId(0));
    assert_eq!(vault.get_record(record_id).unwrap().claim_id, ClaimId(0));
}

#[test]
fn release_failure_restores_burned_fractions() {
    let (vault, custody, _ledger, collection, user) = setup();
    let record_id = vault.deposit(&user, &collection, UnitId(1)).unwrap();
    custody.refuse_release.store(true, Ordering::SeqCst);

    let result = vault.redeem(&user, record_id);
    assert!(matches!(result, Err(VaultError::CustodyTransferFailed(_))));

    assert_eq!(vault.get_claim_balance(ClaimId(0), &user), 100);
    assert_eq!(vault.get_claim_supply(ClaimId(0)), 100);
    assert_eq!(
        vault.get_record(record_id).unwrap().status,
        RecordStatus::Active
    );
    assert_eq!(vault.events_since(0).len(), 1);

    custody.refuse_release.store(false, Ordering::SeqCst);
    vault.redeem(&user, record_id).unwrap();
    assert_eq!(custody.owner_of(&collection, UnitId(1)), Some(user));
}

#[test]
fn refused_return_after_mint_failure_is_reported() {
    let (vault, custody, ledger, collection, user) = setup();
    ledger.refuse_mint.store(true, Ordering::SeqCst);
    custody.refuse_release.store(true, Ordering::SeqCst);

    let result = vault.deposit(&user, &collection, UnitId(1));
    assert!(matches!(
        result,
        Err(VaultError::RollbackFailed { operation: "deposit", .. })
    ));

    // Nothing was recorded or minted; the unit is stranded in custody.
    assert_eq!(vault.record_count(), 0);
    assert_eq!(vault.get_claim_supply(ClaimId(0)), 0);
    assert!(vault.events_since(0).is_empty());
    assert_eq!(
        custody.owner_of(&collection, UnitId(1)),
        Some(vault.config().custody_address.clone())
    );
}

#[test]
fn redeem_burns_nothing_when_asset_left_custody() {
    let (vault, custody, ledger, collection, user) = setup();
    let record_id = vault.deposit(&user, &collection, UnitId(1)).unwrap();

    custody.seized.store(true, Ordering::SeqCst);
    custody.refuse_release.store(true, Ordering::SeqCst);
    ledger.refuse_mint.store(true, Ordering::SeqCst);

    let result = vault.redeem(&user, record_id);
    assert!(matches!(
        result,
        Err(VaultError::CustodyTransferFailed(CustodyError::NotOwner { .. }))
    ));

    assert_eq!(vault.get_claim_supply(ClaimId(0)), 100);
    assert_eq!(vault.get_claim_balance(ClaimId(0), &user), 100);
    assert_eq!(
        vault.get_record(record_id).unwrap().status,
        RecordStatus::Active
    );
    assert_eq!(vault.events_since(0).len(), 1);

    custody.seized.store(false, Ordering::SeqCst);
    custody.refuse_release.store(false, Ordering::SeqCst);
    vault.redeem(&user, record_id).unwrap();
    assert_eq!(vault.get_claim_supply(ClaimId(0)), 0);
    assert_eq!(custody.owner_of(&collection, UnitId(1)), Some(user));
}

#[test]
fn refused_restore_after_release_failure_is_reported() {
    let (vault, custody, ledger, collection, user) = setup();
    let record_id = vault.deposit(&user, &collection, UnitId(1)).unwrap();

    custody.refuse_release.store(true, Ordering::SeqCst);
    ledger.refuse_mint.store(true, Ordering::SeqCst);

    let result = vault.redeem(&user, record_id);
    assert!(matches!(
        result,
        Err(VaultError::RollbackFailed { operation: "redeem", .. })
    ));

    // The record is untouched and the unit never left custody.
    assert_eq!(
        vault.get_record(record_id).unwrap().status,
        RecordStatus::Active
    );
    assert_eq!(vault.events_since(0).len(), 1);
    assert_eq!(
        custody.owner_of(&collection, UnitId(1)),
        Some(vault.config().custody_address.clone())
    );
}
