//! # Fraction Book
//!
//! In-memory multi-claim fungible ledger. Maintains per-claim supply and
//! per-holder balances atomically under a single lock; every mutation uses
//! checked arithmetic.
//!
//! Holders move fractions between each other with [`FractionBook::transfer`].
//! The vault never calls it, it only mints and burns.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{FractionLedger, LedgerError};
use crate::config::DEFAULT_METADATA_URI;
use crate::types::{Address, ClaimId};

/// Supply information for a claim id that has been minted at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimInfo {
    pub claim_id: ClaimId,
    /// Units currently outstanding.
    pub total_supply: u64,
    /// Timestamp of the first mint.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct BookState {
    claims: HashMap<ClaimId, ClaimInfo>,
    /// `claim_id -> (holder -> balance)`.
    balances: HashMap<ClaimId, HashMap<Address, u64>>,
}

/// In-memory fraction ledger provider.
#[derive(Debug)]
pub struct FractionBook {
    metadata_uri: String,
    state: RwLock<BookState>,
}

impl FractionBook {
    /// Creates an empty ledger with the default metadata URI template.
    pub fn new() -> Self {
        Self::with_metadata_uri(DEFAULT_METADATA_URI)
    }

    /// Creates an empty ledger. `{id}` in `uri` is replaced by the claim id.
    pub fn with_metadata_uri(uri: impl Into<String>) -> Self {
        Self {
            metadata_uri: uri.into(),
            state: RwLock::new(BookState::default()),
        }
    }

    /// Metadata URI for a claim id.
    pub fn uri(&self, claim_id: ClaimId) -> String {
        self.metadata_uri.replace("{id}", &claim_id.to_string())
    }

    /// Returns supply information, or `None` if the claim was never minted.
    pub fn claim_info(&self, claim_id: ClaimId) -> Option<ClaimInfo> {
        self.state.read().claims.get(&claim_id).cloned()
    }

    /// Moves `amount` units of `claim_id` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroAmount`] for a zero transfer and
    /// [`LedgerError::InsufficientBalance`] if `from` holds too little.
    pub fn transfer(
        &self,
        claim_id: ClaimId,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let mut state = self.state.write();
        let balances = state.balances.entry(claim_id).or_default();

        let from_balance = balances.get(from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(LedgerError::InsufficientBalance {
                claim_id,
                holder: from.clone(),
                balance: from_balance,
                amount,
            });
        }
        // Self-transfer is a no-op once the balance check has passed.
        if from == to {
            return Ok(());
        }

        // Supply bounds every balance, so the credit cannot overflow.
        let to_balance = balances.get(to).copied().unwrap_or(0);
        balances.insert(from.clone(), from_balance - amount);
        balances.insert(to.clone(), to_balance + amount);
        tracing::debug!(%claim_id, %from, %to, amount, "fractions transferred");
        Ok(())
    }

    /// Every holder with a positive balance for `claim_id`, sorted by address.
    pub fn holders(&self, claim_id: ClaimId) -> Vec<(Address, u64)> {
        let state = self.state.read();
        let mut holders: Vec<(Address, u64)> = state
            .balances
            .get(&claim_id)
            .map(|b| {
                b.iter()
                    .filter(|(_, amount)| **amount > 0)
                    .map(|(holder, amount)| (holder.clone(), *amount))
                    .collect()
            })
            .unwrap_or_default();
        holders.sort();
        holders
    }
}

impl Default for FractionBook {
    fn default() -> Self {
        Self::new()
    }
}

impl FractionLedger for FractionBook {
    fn mint(&self, claim_id: ClaimId, to: &Address, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let mut state = self.state.write();

        let current_supply = state
            .claims
            .get(&claim_id)
            .map(|c| c.total_supply)
            .unwrap_or(0);
        let new_supply = current_supply
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow { claim_id, amount })?;

        state
            .claims
            .entry(claim_id)
            .or_insert_with(|| ClaimInfo {
                claim_id,
                total_supply: 0,
                created_at: Utc::now(),
            })
            .total_supply = new_supply;

        let balance = state
            .balances
            .entry(claim_id)
            .or_default()
            .entry(to.clone())
            .or_insert(0);
        // Balance <= previous supply, and supply + amount did not overflow.
        *balance += amount;

        tracing::debug!(%claim_id, %to, amount, "fractions minted");
        Ok(())
    }

    fn burn(&self, claim_id: ClaimId, from: &Address, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let mut state = self.state.write();

        let balance = state
            .balances
            .get(&claim_id)
            .and_then(|b| b.get(from))
            .copied()
            .unwrap_or(0);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                claim_id,
                holder: from.clone(),
                balance,
                amount,
            });
        }

        if let Some(b) = state.balances.get_mut(&claim_id) {
            b.insert(from.clone(), balance - amount);
        }
        if let Some(info) = state.claims.get_mut(&claim_id) {
            info.total_supply = info.total_supply.saturating_sub(amount);
        }

        tracing::debug!(%claim_id, %from, amount, "fractions burned");
        Ok(())
    }

    fn balance_of(&self, claim_id: ClaimId, holder: &Address) -> u64 {
        self.state
            .read()
            .balances
            .get(&claim_id)
            .and_then(|b| b.get(holder))
            .copied()
            .unwrap_or(0)
    }

    fn total_supply(&self, claim_id: ClaimId) -> u64 {
        self.state
            .read()
            .claims
            .get(&claim_id)
            .map(|c| c.total_supply)
            .unwrap_or(0)
    }
}
