//! # In-Memory Asset Registry
//!
//! A minimal non-fungible registry with owner-per-unit bookkeeping and two
//! flavours of operator approval: per unit, and blanket ("for all").
//!
//! The registry is constructed with the vault's custody address. Transfers
//! out of custody are initiated by the vault itself and need no approval;
//! transfers into custody need the owner to have approved the vault.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use super::{AssetCustody, CustodyError};
use crate::types::{Address, AssetKey, CollectionRef, UnitId};

/// Per-unit state.
#[derive(Clone, Debug)]
struct UnitEntry {
    owner: Address,
    /// Operator approved for this unit only. Cleared on every transfer.
    approved: Option<Address>,
}

#[derive(Debug, Default)]
struct RegistryState {
    units: HashMap<AssetKey, UnitEntry>,
    /// `(owner, operator)` pairs with blanket approval.
    operators: HashSet<(Address, Address)>,
}

/// In-memory custody provider.
#[derive(Debug)]
pub struct AssetRegistry {
    custody: Address,
    state: RwLock<RegistryState>,
}

impl AssetRegistry {
    /// Creates an empty registry whose vault holds assets as `custody`.
    pub fn new(custody: Address) -> Self {
        Self {
            custody,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// The address the vault holds custodied units under.
    pub fn custody_address(&self) -> &Address {
        &self.custody
    }

    /// Creates a new unit owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`CustodyError::AlreadyExists`] if the unit is already minted.
    pub fn mint_unit(
        &self,
        collection: &CollectionRef,
        unit: UnitId,
        owner: &Address,
    ) -> Result<(), CustodyError> {
        let key = AssetKey::new(collection.clone(), unit);
        let mut state = self.state.write();
        if state.units.contains_key(&key) {
            return Err(CustodyError::AlreadyExists(key));
        }
        tracing::debug!(asset = %key, owner = %owner, "asset unit minted");
        state.units.insert(
            key,
            UnitEntry {
                owner: owner.clone(),
                approved: None,
            },
        );
        Ok(())
    }

    /// Approves `operator` to move one unit on the owner's behalf.
    ///
    /// # Errors
    ///
    /// Returns [`CustodyError::UnknownAsset`] or [`CustodyError::NotOwner`].
    pub fn approve(
        &self,
        owner: &Address,
        collection: &CollectionRef,
        unit: UnitId,
        operator: &Address,
    ) -> Result<(), CustodyError> {
        let key = AssetKey::new(collection.clone(), unit);
        let mut state = self.state.write();
        let entry = state
            .units
            .get_mut(&key)
            .ok_or_else(|| CustodyError::UnknownAsset(key.clone()))?;
        if &entry.owner != owner {
            return Err(CustodyError::NotOwner {
                asset: key,
                claimed: owner.clone(),
                owner: entry.owner.clone(),
            });
        }
        entry.approved = Some(operator.clone());
        Ok(())
    }

    /// Grants or revokes blanket approval of `operator` over all of
    /// `owner`'s units.
    pub fn set_approval_for_all(&self, owner: &Address, operator: &Address, approved: bool) {
        let pair = (owner.clone(), operator.clone());
        let mut state = self.state.write();
        if approved {
            state.operators.insert(pair);
        } else {
            state.operators.remove(&pair);
        }
    }

    /// Number of units currently held in custody.
    pub fn custodied_count(&self) -> usize {
        self.state
            .read()
            .units
            .values()
            .filter(|e| e.owner == self.custody)
            .count()
    }
}

impl AssetCustody for AssetRegistry {
    fn transfer(
        &self,
        collection: &CollectionRef,
        unit: UnitId,
        from: &Address,
        to: &Address,
    ) -> Result<(), CustodyError> {
        let key = AssetKey::new(collection.clone(), unit);
        let mut state = self.state.write();

        let entry = state
            .units
            .get(&key)
            .ok_or_else(|| CustodyError::UnknownAsset(key.clone()))?;

        // Anything already sitting in custody can only leave through the
        // vault's own withdrawal.
        if entry.owner == self.custody && from != &self.custody {
            return Err(CustodyError::AlreadyLocked(key));
        }
        if &entry.owner != from {
            return Err(CustodyError::NotOwner {
                asset: key,
                claimed: from.clone(),
                owner: entry.owner.clone(),
            });
        }
        if from != &self.custody {
            let per_unit = entry.approved.as_ref() == Some(&self.custody);
            let blanket = state
                .operators
                .contains(&(from.clone(), self.custody.clone()));
            if !per_unit && !blanket {
                return Err(CustodyError::NotApproved(key));
            }
        }

        if let Some(entry) = state.units.get_mut(&key) {
            entry.owner = to.clone();
            entry.approved = None;
        }
        tracing::debug!(asset = %key, from = %from, to = %to, "asset unit transferred");
        Ok(())
    }

    fn owner_of(&self, collection: &CollectionRef, unit: UnitId) -> Option<Address> {
        let key = AssetKey::new(collection.clone(), unit);
        self.state.read().units.get(&key).map(|e| e.owner.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (AssetRegistry, CollectionRef, Address) {
        let registry = AssetRegistry::new(Address::new("vault"));
        let collection = CollectionRef::new("punks");
        let alice = Address::new("alice");
        registry.mint_unit(&collection, UnitId(1), &alice).unwrap();
        (registry, collection, alice)
    }

    #[test]
    fn mint_sets_owner() {
        let (registry, collection, alice) = setup();
        assert_eq!(registry.owner_of(&collection, UnitId(1)), Some(alice));
        assert_eq!(registry.owner_of(&collection, UnitId(2)), None);
    }

    #[test]
    fn duplicate_mint_rejected() {
        let (registry, collection, _alice) = setup();
        let bob = Address::new("bob");
        let result = registry.mint_unit(&collection, UnitId(1), &bob);
        assert!(matches!(result, Err(CustodyError::AlreadyExists(_))));
    }

    #[test]
    fn transfer_into_custody_requires_approval() {
        let (registry, collection, alice) = setup();
        let vault = registry.custody_address().clone();

        let result = registry.transfer(&collection, UnitId(1), &alice, &vault);
        assert!(matches!(result, Err(CustodyError::NotApproved(_))));

        registry
            .approve(&alice, &collection, UnitId(1), &vault)
            .unwrap();
        registry
            .transfer(&collection, UnitId(1), &alice, &vault)
            .unwrap();
        assert_eq!(registry.owner_of(&collection, UnitId(1)), Some(vault));
        assert_eq!(registry.custodied_count(), 1);
    }

    #[test]
    fn blanket_approval_covers_every_unit() {
        let (registry, collection, alice) = setup();
        let vault = registry.custody_address().clone();
        registry.mint_unit(&collection, UnitId(2), &alice).unwrap();
        registry.set_approval_for_all(&alice, &vault, true);

        registry
            .transfer(&collection, UnitId(1), &alice, &vault)
            .unwrap();
        registry
            .transfer(&collection, UnitId(2), &alice, &vault)
            .unwrap();
        assert_eq!(registry.custodied_count(), 2);
    }

    #[test]
    fn revoked_blanket_approval_blocks_transfer() {
        let (registry, collection, alice) = setup();
        let vault = registry.custody_address().clone();
        registry.set_approval_for_all(&alice, &vault, true);
        registry.set_approval_for_all(&alice, &vault, false);

        let result = registry.transfer(&collection, UnitId(1), &alice, &vault);
        assert!(matches!(result, Err(CustodyError::NotApproved(_))));
    }

    #[test]
    fn non_owner_cannot_transfer() {
        let (registry, collection, _alice) = setup();
        let mallory = Address::new("mallory");
        let vault = registry.custody_address().clone();
        let result = registry.transfer(&collection, UnitId(1), &mallory, &vault);
        assert!(matches!(result, Err(CustodyError::NotOwner { .. })));
    }

    #[test]
    fn custodied_unit_reports_already_locked() {
        let (registry, collection, alice) = setup();
        let vault = registry.custody_address().clone();
        registry.set_approval_for_all(&alice, &vault, true);
        registry
            .transfer(&collection, UnitId(1), &alice, &vault)
            .unwrap();

        let result = registry.transfer(&collection, UnitId(1), &alice, &vault);
        assert!(matches!(result, Err(CustodyError::AlreadyLocked(_))));
    }

    #[test]
    fn per_unit_approval_cleared_after_transfer() {
        let (registry, collection, alice) = setup();
        let vault = registry.custody_address().clone();
        registry
            .approve(&alice, &collection, UnitId(1), &vault)
            .unwrap();
        registry
            .transfer(&collection, UnitId(1), &alice, &vault)
            .unwrap();
        registry
            .transfer(&collection, UnitId(1), &vault, &alice)
            .unwrap();

        let result = registry.transfer(&collection, UnitId(1), &alice, &vault);
        assert!(matches!(result, Err(CustodyError::NotApproved(_))));
    }

    #[test]
    fn approve_by_non_owner_rejected() {
        let (registry, collection, _alice) = setup();
        let bob = Address::new("bob");
        let vault = registry.custody_address().clone();
        let result = registry.approve(&bob, &collection, UnitId(1), &vault);
        assert!(matches!(result, Err(CustodyError::NotOwner { .. })));
    }

    #[test]
    fn unknown_asset_rejected() {
        let (registry, collection, alice) = setup();
        let vault = registry.custody_address().clone();
        let result = registry.transfer(&collection, UnitId(99), &alice, &vault);
        assert!(matches!(result, Err(CustodyError::UnknownAsset(_))));
    }
}
