//! # Fraction Vault Contract
//!
//! Locks a non-divisible asset unit in custody and issues a fixed supply of
//! fungible fractions against it. Whoever later holds the *entire* supply
//! may redeem: the fractions are burned and the unit is released to them.
//!
//! 1. **Deposit**: custody transfer-in, mint `fraction_supply` under a
//!    fresh claim id, append an `Active` record.
//! 2. **Trade**: holders move fractions on the ledger; the vault is not
//!    involved.
//! 3. **Redeem**: full-supply ownership check against the live ledger,
//!    burn, custody transfer-out, record becomes `Redeemed` (terminal).
//!
//! ## Consistency Model
//!
//! Records live in an append-only arena indexed by [`RecordId`]. Every
//! mutating operation runs as one critical section over the record book,
//! so concurrent redeems of the same record serialize and readers never
//! observe a half-applied deposit or redemption. Provider state is never
//! cached: the ownership check re-reads the ledger immediately before the
//! burn.
//!
//! Provider calls cannot be rolled back by the providers themselves, so
//! redeem confirms the unit is still in custody before it burns anything.
//! When a later step still fails after an earlier one succeeded, the vault
//! issues the inverse call (hand the unit back, re-mint the burned
//! fractions) before reporting the original error. If the inverse call is
//! refused too, the operation fails with [`VaultError::RollbackFailed`] and
//! the providers need manual reconciliation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shardvault_protocol::config::{ConfigError, VaultConfig};
use shardvault_protocol::custody::{AssetCustody, CustodyError};
use shardvault_protocol::ledger::{FractionLedger, LedgerError};
use shardvault_protocol::types::{
    Address, AssetKey, ClaimId, CollectionRef, RecordId, UnitId,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
///
/// Every error except [`VaultError::RollbackFailed`] leaves the record
/// book, the custody provider, and the ledger exactly as they were before
/// the call.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No record with this id exists.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// The record has already been redeemed.
    #[error("record {0} has already been redeemed")]
    AlreadyRedeemed(RecordId),

    /// The caller does not hold the entire outstanding fraction supply.
    #[error(
        "insufficient ownership of record {record_id}: {holder} holds {balance} of {required} fractions"
    )]
    InsufficientOwnership {
        /// The record the caller tried to redeem.
        record_id: RecordId,
        /// The caller.
        holder: Address,
        /// The caller's balance at check time.
        balance: u64,
        /// The full fraction supply of the record.
        required: u64,
    },

    /// The custody provider refused the asset transfer.
    #[error("custody transfer failed: {0}")]
    CustodyTransferFailed(#[source] CustodyError),

    /// The fraction ledger refused a mint or burn.
    #[error("ledger operation failed: {0}")]
    LedgerOperationFailed(#[source] LedgerError),

    /// The next claim id already has outstanding supply on the ledger,
    /// meaning another issuer shares it. Reconfigure `first_claim_id`.
    #[error("claim id {0} already has outstanding supply on the ledger")]
    ClaimIdInUse(ClaimId),

    /// A record or claim counter would overflow `u64`.
    #[error("identifier space exhausted")]
    IdSpaceExhausted,

    /// The vault was constructed with an invalid policy.
    #[error("invalid vault configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// A provider refused a step, and the inverse of an earlier,
    /// already-applied step was refused as well. No record changed, but
    /// custody or ledger state is no longer what it was before the call.
    #[error("{operation} failed ({cause}) and could not be rolled back: {rollback}")]
    RollbackFailed {
        /// `"deposit"` or `"redeem"`.
        operation: &'static str,
        /// The refusal that triggered the rollback.
        cause: String,
        /// The refusal of the inverse call.
        rollback: String,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle status of a deposit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    /// The unit is in custody and its fractions are outstanding.
    Active,
    /// The fractions were burned and the unit released. Terminal.
    Redeemed,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Active => write!(f, "Active"),
            RecordStatus::Redeemed => write!(f, "Redeemed"),
        }
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(RecordStatus::Active),
            "redeemed" => Ok(RecordStatus::Redeemed),
            other => Err(format!("unknown record status: {other}")),
        }
    }
}

/// One custodied asset unit and the fraction claim issued against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRecord {
    /// Sequential external handle.
    pub record_id: RecordId,
    /// Identity that performed the deposit. Not necessarily a current holder.
    pub depositor: Address,
    /// Custody collection the unit belongs to.
    pub asset_collection_ref: CollectionRef,
    /// The unit within the collection.
    pub asset_unit_id: UnitId,
    /// Ledger claim id minted for this record.
    pub claim_id: ClaimId,
    /// Fraction units minted at creation. Never changes.
    pub fraction_supply: u64,
    /// Current lifecycle status.
    pub status: RecordStatus,
    /// When the deposit completed.
    pub deposited_at: DateTime<Utc>,
    /// When the record was redeemed, if it has been.
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Who redeemed the record, if anyone.
    pub redeemed_by: Option<Address>,
}

impl DepositRecord {
    /// The fully qualified asset this record custodies.
    pub fn asset(&self) -> AssetKey {
        AssetKey::new(self.asset_collection_ref.clone(), self.asset_unit_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}

/// Journal entry appended on every successful state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VaultEvent {
    #[serde(rename = "deposited")]
    Deposited {
        record_id: RecordId,
        claim_id: ClaimId,
        depositor: Address,
        asset: AssetKey,
        fraction_supply: u64,
        at: DateTime<Utc>,
    },
    #[serde(rename = "redeemed")]
    Redeemed {
        record_id: RecordId,
        claim_id: ClaimId,
        redeemer: Address,
        asset: AssetKey,
        at: DateTime<Utc>,
    },
}

impl VaultEvent {
    pub fn record_id(&self) -> RecordId {
        match self {
            VaultEvent::Deposited { record_id, .. } | VaultEvent::Redeemed { record_id, .. } => {
                *record_id
            }
        }
    }
}

/// Record counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStats {
    pub total: u64,
    pub active: u64,
    pub redeemed: u64,
}

// ---------------------------------------------------------------------------
// Record book
// ---------------------------------------------------------------------------

/// Append-only record arena plus the indexes derived from it.
#[derive(Debug, Default)]
struct RecordBook {
    /// `records[i].record_id == RecordId(i)`. Never shrinks.
    records: Vec<DepositRecord>,
    /// Asset -> the single `Active` record custodying it.
    active_by_asset: HashMap<AssetKey, RecordId>,
    next_claim_id: u64,
    events: Vec<VaultEvent>,
}

impl RecordBook {
    fn new(first_claim_id: u64) -> Self {
        Self {
            next_claim_id: first_claim_id,
            ..Default::default()
        }
    }

    /// Ids the next deposit will take, without consuming them.
    fn peek_ids(&self) -> Result<(RecordId, ClaimId), VaultError> {
        let record_id = u64::try_from(self.records.len()).map_err(|_| VaultError::IdSpaceExhausted)?;
        self.next_claim_id
            .checked_add(1)
            .ok_or(VaultError::IdSpaceExhausted)?;
        Ok((RecordId(record_id), ClaimId(self.next_claim_id)))
    }

    fn get(&self, record_id: RecordId) -> Result<&DepositRecord, VaultError> {
        record_id
            .index()
            .and_then(|i| self.records.get(i))
            .ok_or(VaultError::NotFound(record_id))
    }

    fn append(&mut self, record: DepositRecord) {
        self.active_by_asset
            .insert(record.asset(), record.record_id);
        self.next_claim_id = record.claim_id.0 + 1;
        self.events.push(VaultEvent::Deposited {
            record_id: record.record_id,
            claim_id: record.claim_id,
            depositor: record.depositor.clone(),
            asset: record.asset(),
            fraction_supply: record.fraction_supply,
            at: record.deposited_at,
        });
        self.records.push(record);
    }

    fn mark_redeemed(&mut self, record_id: RecordId, redeemer: &Address) {
        let now = Utc::now();
        let Some(record) = record_id.index().and_then(|i| self.records.get_mut(i)) else {
            return;
        };
        record.status = RecordStatus::Redeemed;
        record.redeemed_at = Some(now);
        record.redeemed_by = Some(redeemer.clone());

        let asset = record.asset();
        let claim_id = record.claim_id;
        self.active_by_asset.remove(&asset);
        self.events.push(VaultEvent::Redeemed {
            record_id,
            claim_id,
            redeemer: redeemer.clone(),
            asset,
            at: now,
        });
    }
}

// ---------------------------------------------------------------------------
// FractionVault
// ---------------------------------------------------------------------------

/// The vault core. Sole writer of deposit-record state.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct FractionVault {
    config: VaultConfig,
    custody: Arc<dyn AssetCustody>,
    ledger: Arc<dyn FractionLedger>,
    book: Mutex<RecordBook>,
}

impl std::fmt::Debug for FractionVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FractionVault")
            .field("config", &self.config)
            .field("records", &self.book.lock().records.len())
            .finish()
    }
}

impl FractionVault {
    /// Creates an empty vault over the given providers.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] if the policy fails validation.
    pub fn new(
        config: VaultConfig,
        custody: Arc<dyn AssetCustody>,
        ledger: Arc<dyn FractionLedger>,
    ) -> Result<Self, VaultError> {
        config.validate()?;
        let book = RecordBook::new(config.first_claim_id);
        Ok(Self {
            config,
            custody,
            ledger,
            book: Mutex::new(book),
        })
    }

    /// The policy this vault was created with.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Fraction units minted per deposit.
    pub fn fraction_supply(&self) -> u64 {
        self.config.fraction_supply
    }

    /// Locks `unit` of `collection` in custody and mints its fractions to
    /// `caller`. Returns the new record's id.
    ///
    /// # Errors
    ///
    /// - [`VaultError::CustodyTransferFailed`] if the unit is already in an
    ///   active record, or the custody provider refuses the transfer.
    /// - [`VaultError::LedgerOperationFailed`] if the mint is refused; the
    ///   unit is handed back to `caller` first.
    /// - [`VaultError::ClaimIdInUse`] / [`VaultError::IdSpaceExhausted`].
    ///
    /// On any error no record, id, or mint becomes visible.
    pub fn deposit(
        &self,
        caller: &Address,
        collection: &CollectionRef,
        unit: UnitId,
    ) -> Result<RecordId, VaultError> {
        let mut book = self.book.lock();
        let asset = AssetKey::new(collection.clone(), unit);

        if let Some(existing) = book.active_by_asset.get(&asset) {
            tracing::warn!(%asset, record_id = %existing, %caller, "deposit rejected: asset already locked");
            return Err(VaultError::CustodyTransferFailed(
                CustodyError::AlreadyLocked(asset),
            ));
        }

        let (record_id, claim_id) = book.peek_ids()?;
        if self.ledger.total_supply(claim_id) != 0 {
            tracing::warn!(%claim_id, "deposit rejected: claim id already issued on ledger");
            return Err(VaultError::ClaimIdInUse(claim_id));
        }

        let supply = self.config.fraction_supply;
        let custody = &self.config.custody_address;

        tracing::debug!(%asset, %caller, "transferring asset into custody");
        self.custody
            .transfer(collection, unit, caller, custody)
            .map_err(|e| {
                tracing::warn!(%asset, %caller, error = %e, "deposit rejected by custody provider");
                VaultError::CustodyTransferFailed(e)
            })?;

        tracing::debug!(%claim_id, %caller, supply, "minting fractions");
        if let Err(e) = self.ledger.mint(claim_id, caller, supply) {
            tracing::warn!(%claim_id, error = %e, "mint failed, returning asset to depositor");
            if let Err(undo) = self.custody.transfer(collection, unit, custody, caller) {
                tracing::error!(%asset, %caller, error = %undo, "failed to return asset after mint failure");
                return Err(VaultError::RollbackFailed {
                    operation: "deposit",
                    cause: e.to_string(),
                    rollback: undo.to_string(),
                });
            }
            return Err(VaultError::LedgerOperationFailed(e));
        }

        book.append(DepositRecord {
            record_id,
            depositor: caller.clone(),
            asset_collection_ref: collection.clone(),
            asset_unit_id: unit,
            claim_id,
            fraction_supply: supply,
            status: RecordStatus::Active,
            deposited_at: Utc::now(),
            redeemed_at: None,
            redeemed_by: None,
        });

        tracing::info!(%record_id, %claim_id, %asset, depositor = %caller, supply, "asset deposited");
        Ok(record_id)
    }

    /// Burns the full fraction supply of `record_id` from `caller` and
    /// releases the custodied unit to them.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotFound`] if no such record exists.
    /// - [`VaultError::AlreadyRedeemed`] if the record is terminal.
    /// - [`VaultError::InsufficientOwnership`] if `caller` holds less than
    ///   the full supply, however large a majority.
    /// - [`VaultError::CustodyTransferFailed`] if the custody provider no
    ///   longer reports the unit in vault custody. Nothing is burned.
    /// - [`VaultError::LedgerOperationFailed`] / [`VaultError::CustodyTransferFailed`]
    ///   if a provider refuses; burned fractions are re-minted first.
    /// - [`VaultError::RollbackFailed`] if the release and the re-mint are
    ///   both refused.
    pub fn redeem(&self, caller: &Address, record_id: RecordId) -> Result<(), VaultError> {
        let mut book = self.book.lock();

        let record = book.get(record_id)?;
        if record.status == RecordStatus::Redeemed {
            tracing::warn!(%record_id, %caller, "redeem rejected: already redeemed");
            return Err(VaultError::AlreadyRedeemed(record_id));
        }
        let claim_id = record.claim_id;
        let required = record.fraction_supply;
        let collection = record.asset_collection_ref.clone();
        let unit = record.asset_unit_id;
        let asset = record.asset();

        // Authoritative read, immediately before acting on it.
        let balance = self.ledger.balance_of(claim_id, caller);
        if balance < required {
            tracing::warn!(%record_id, %caller, balance, required, "redeem rejected: insufficient ownership");
            return Err(VaultError::InsufficientOwnership {
                record_id,
                holder: caller.clone(),
                balance,
                required,
            });
        }

        // The burn is only undone by a re-mint, so the release must be known
        // to be possible before it happens.
        let custody = &self.config.custody_address;
        match self.custody.owner_of(&collection, unit) {
            Some(owner) if &owner == custody => {}
            Some(owner) => {
                tracing::warn!(%record_id, %asset, %owner, "redeem rejected: asset no longer in custody");
                return Err(VaultError::CustodyTransferFailed(CustodyError::NotOwner {
                    asset,
                    claimed: custody.clone(),
                    owner,
                }));
            }
            None => {
                tracing::warn!(%record_id, %asset, "redeem rejected: custody provider does not know the asset");
                return Err(VaultError::CustodyTransferFailed(CustodyError::UnknownAsset(asset)));
            }
        }

        tracing::debug!(%claim_id, %caller, required, "burning fractions");
        self.ledger
            .burn(claim_id, caller, required)
            .map_err(|e| {
                tracing::warn!(%record_id, %caller, error = %e, "burn refused by ledger");
                VaultError::LedgerOperationFailed(e)
            })?;

        tracing::debug!(%record_id, %caller, "releasing asset from custody");
        if let Err(e) = self.custody.transfer(&collection, unit, custody, caller) {
            tracing::warn!(%record_id, error = %e, "release failed, restoring burned fractions");
            if let Err(undo) = self.ledger.mint(claim_id, caller, required) {
                tracing::error!(%claim_id, %caller, error = %undo, "failed to restore fractions after release failure");
                return Err(VaultError::RollbackFailed {
                    operation: "redeem",
                    cause: e.to_string(),
                    rollback: undo.to_string(),
                });
            }
            return Err(VaultError::CustodyTransferFailed(e));
        }

        book.mark_redeemed(record_id, caller);
        tracing::info!(%record_id, %claim_id, redeemer = %caller, "asset redeemed");
        Ok(())
    }

    // -- Queries ------------------------------------------------------------

    /// Returns a snapshot of a record.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] if no such record exists.
    pub fn get_record(&self, record_id: RecordId) -> Result<DepositRecord, VaultError> {
        self.book.lock().get(record_id).cloned()
    }

    /// All records deposited by `depositor`, in id order.
    pub fn records_by_depositor(&self, depositor: &Address) -> Vec<DepositRecord> {
        self.book
            .lock()
            .records
            .iter()
            .filter(|r| &r.depositor == depositor)
            .cloned()
            .collect()
    }

    /// All records with the given status, in id order.
    pub fn records_by_status(&self, status: RecordStatus) -> Vec<DepositRecord> {
        self.book
            .lock()
            .records
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    /// The `Active` record custodying a unit, if any.
    pub fn active_record_for(
        &self,
        collection: &CollectionRef,
        unit: UnitId,
    ) -> Option<DepositRecord> {
        let book = self.book.lock();
        let asset = AssetKey::new(collection.clone(), unit);
        book.active_by_asset
            .get(&asset)
            .and_then(|id| id.index())
            .and_then(|i| book.records.get(i))
            .cloned()
    }

    /// Live ledger balance of `holder` for `claim_id`.
    pub fn get_claim_balance(&self, claim_id: ClaimId, holder: &Address) -> u64 {
        // Held so the read cannot interleave with a deposit or redemption.
        let _book = self.book.lock();
        self.ledger.balance_of(claim_id, holder)
    }

    /// Live outstanding supply of `claim_id`.
    pub fn get_claim_supply(&self, claim_id: ClaimId) -> u64 {
        let _book = self.book.lock();
        self.ledger.total_supply(claim_id)
    }

    /// Number of records ever created.
    pub fn record_count(&self) -> usize {
        self.book.lock().records.len()
    }

    /// Record counts by status.
    pub fn stats(&self) -> VaultStats {
        let book = self.book.lock();
        let total = book.records.len() as u64;
        let active = book.active_by_asset.len() as u64;
        VaultStats {
            total,
            active,
            redeemed: total - active,
        }
    }

    /// Journal entries from position `offset` onwards.
    pub fn events_since(&self, offset: usize) -> Vec<VaultEvent> {
        let book = self.book.lock();
        book.events.get(offset..).map(<[_]>::to_vec).unwrap_or_default()
    }
}
