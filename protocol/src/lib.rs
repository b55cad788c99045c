// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Shardvault Protocol: Core Library
//!
//! Shared vocabulary for the Shardvault custody-and-fractionalization
//! ledger: identifiers, vault policy, and the two capability interfaces the
//! vault consumes from the outside world.
//!
//! ## Architecture
//!
//! - **types**: Newtype identifiers: addresses, collections, units, records, claims.
//! - **config**: Policy constants and [`config::VaultConfig`].
//! - **custody**: The [`custody::AssetCustody`] capability and an in-memory registry.
//! - **ledger**: The [`ledger::FractionLedger`] capability and an in-memory fraction book.
//!
//! The vault itself lives in `shardvault-contracts`. Nothing in this crate
//! knows about deposit records.

pub mod config;
pub mod custody;
pub mod ledger;
pub mod types;

pub use types::{Address, AssetKey, ClaimId, CollectionRef, RecordId, UnitId};
