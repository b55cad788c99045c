//! # Shardvault Contracts
//!
//! Business logic of the Shardvault ledger. One contract lives here:
//!
//! - **Fraction Vault**: custody of non-divisible assets, issuance of a
//!   fixed fraction supply per deposit, and all-or-nothing redemption by
//!   whoever reassembles that supply.
//!
//! ## Design Principles
//!
//! 1. All supply arithmetic is checked. Wrapping arithmetic and ownership
//!    do not mix.
//! 2. State transitions are explicit: enum variants, not boolean flags.
//! 3. Providers are capabilities (`AssetCustody`, `FractionLedger`), never
//!    concrete dependencies, so the vault runs against in-memory fakes.
//! 4. Every public type is serializable (serde) for wire transport.

pub mod fraction_vault;

pub use fraction_vault::{
    DepositRecord, FractionVault, RecordStatus, VaultError, VaultEvent, VaultStats,
};
