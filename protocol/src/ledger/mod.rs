//! # Ledger Module: Fungible Fraction Claims
//!
//! Fractions are plain fungible balances indexed by a [`ClaimId`]. The vault
//! mints a fixed supply under a fresh claim id on deposit and burns the whole
//! supply on redemption; everything in between (holders trading fractions)
//! happens directly against the ledger provider.
//!
//! ```text
//! mod.rs        - FractionLedger trait and LedgerError
//! fractions.rs  - FractionBook: in-memory balances and supply
//! ```

pub mod fractions;

use thiserror::Error;

use crate::types::{Address, ClaimId};

pub use fractions::{ClaimInfo, FractionBook};

/// Errors reported by a fraction ledger provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The holder does not have enough units for a burn or transfer.
    #[error("insufficient balance for claim {claim_id}: {holder} has {balance}, needs {amount}")]
    InsufficientBalance {
        claim_id: ClaimId,
        holder: Address,
        balance: u64,
        amount: u64,
    },

    /// Minting would overflow the claim's supply or a balance.
    #[error("supply overflow: minting {amount} of claim {claim_id} would exceed u64::MAX")]
    SupplyOverflow { claim_id: ClaimId, amount: u64 },

    /// Zero-amount mints, burns, and transfers are rejected.
    #[error("amount must be positive")]
    ZeroAmount,
}

/// Capability interface the vault consumes from a fraction ledger provider.
///
/// Like [`crate::custody::AssetCustody`], implementations are shared with
/// third parties and synchronize internally.
pub trait FractionLedger: Send + Sync {
    /// Creates `amount` units of `claim_id` in `to`'s balance.
    fn mint(&self, claim_id: ClaimId, to: &Address, amount: u64) -> Result<(), LedgerError>;

    /// Destroys `amount` units of `claim_id` from `from`'s balance.
    fn burn(&self, claim_id: ClaimId, from: &Address, amount: u64) -> Result<(), LedgerError>;

    /// Current balance of `holder` for `claim_id`. Zero if unknown.
    fn balance_of(&self, claim_id: ClaimId, holder: &Address) -> u64;

    /// Current outstanding supply of `claim_id`. Zero if unknown.
    fn total_supply(&self, claim_id: ClaimId) -> u64;
}
