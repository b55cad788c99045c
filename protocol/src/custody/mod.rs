//! # Custody Module: Non-Divisible Asset Custody
//!
//! The vault never owns asset records itself. It asks a custody provider to
//! move a unit from a holder into vault custody on deposit, and back out on
//! redemption. This module defines that capability and ships an in-memory
//! provider for tests and the devnet node.
//!
//! ```text
//! mod.rs       - AssetCustody trait and CustodyError
//! registry.rs  - AssetRegistry: in-memory owner/approval bookkeeping
//! ```

pub mod registry;

use thiserror::Error;

use crate::types::{Address, AssetKey, CollectionRef, UnitId};

pub use registry::AssetRegistry;

/// Errors reported by a custody provider.
///
/// The vault propagates these unmodified inside
/// `VaultError::CustodyTransferFailed`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CustodyError {
    /// The unit does not exist in the collection.
    #[error("unknown asset {0}")]
    UnknownAsset(AssetKey),

    /// `from` is not the current owner of the unit.
    #[error("{claimed} does not own {asset} (owner is {owner})")]
    NotOwner {
        asset: AssetKey,
        claimed: Address,
        owner: Address,
    },

    /// The unit is already held in vault custody.
    #[error("{0} is already locked in custody")]
    AlreadyLocked(AssetKey),

    /// The owner has not granted the vault transfer authority.
    #[error("vault is not approved to move {0}")]
    NotApproved(AssetKey),

    /// The asset already exists (devnet minting only).
    #[error("asset {0} already exists")]
    AlreadyExists(AssetKey),
}

/// Capability interface the vault consumes from an asset custody provider.
///
/// Implementations are shared and externally mutable: holders trade units
/// through the provider directly, so every method takes `&self` and the
/// provider synchronizes internally.
pub trait AssetCustody: Send + Sync {
    /// Moves one unit from `from` to `to`.
    ///
    /// Authorization (ownership and, where required, approval of the
    /// vault) is the provider's responsibility.
    fn transfer(
        &self,
        collection: &CollectionRef,
        unit: UnitId,
        from: &Address,
        to: &Address,
    ) -> Result<(), CustodyError>;

    /// Returns the current owner of a unit, or `None` if it does not exist.
    fn owner_of(&self, collection: &CollectionRef, unit: UnitId) -> Option<Address>;
}
