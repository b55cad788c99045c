//! # Vault Configuration & Constants
//!
//! Every magic number in Shardvault lives here. If you're hardcoding a
//! fraction count somewhere else, you're doing it wrong.
//!
//! The fraction supply per deposit is policy, not physics: it is carried
//! in [`VaultConfig`] and only defaults to [`DEFAULT_FRACTION_SUPPLY`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Address;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The vault protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Fractionalization Policy
// ---------------------------------------------------------------------------

/// Number of fraction units minted per deposit unless configured otherwise.
/// 100 makes one unit read as one percent, which is what humans expect.
pub const DEFAULT_FRACTION_SUPPLY: u64 = 100;

/// Upper bound on the per-deposit fraction supply. Large enough for any
/// sane denomination, small enough that summing balances of a few
/// thousand records never comes near `u64::MAX`.
pub const MAX_FRACTION_SUPPLY: u64 = 1_000_000_000_000_000;

/// Default identity under which the vault holds custodied assets.
pub const DEFAULT_CUSTODY_ADDRESS: &str = "shardvault:custody";

/// Default first claim id. Operators sharing a fraction ledger with other
/// issuers offset this to stay clear of foreign claim ids.
pub const DEFAULT_FIRST_CLAIM_ID: u64 = 0;

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Default HTTP API port for the devnet node.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Default base URI for fraction metadata. `{id}` is replaced with the
/// decimal claim id.
pub const DEFAULT_METADATA_URI: &str = "https://metadata.example.com/{id}.json";

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

/// Errors raised while validating a [`VaultConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A zero supply would make every record instantly redeemable by anyone.
    #[error("fraction supply must be positive")]
    ZeroFractionSupply,

    #[error("fraction supply {0} exceeds maximum {MAX_FRACTION_SUPPLY}")]
    FractionSupplyTooLarge(u64),

    #[error("custody address must not be blank")]
    BlankCustodyAddress,
}

/// Runtime policy for a vault instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Fraction units minted per deposit. Fixed for the record's lifetime.
    pub fraction_supply: u64,
    /// Identity that holds custodied assets on the vault's behalf.
    pub custody_address: Address,
    /// Claim id assigned to the first deposit.
    pub first_claim_id: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            fraction_supply: DEFAULT_FRACTION_SUPPLY,
            custody_address: Address::new(DEFAULT_CUSTODY_ADDRESS),
            first_claim_id: DEFAULT_FIRST_CLAIM_ID,
        }
    }
}

impl VaultConfig {
    /// Returns a config with the given supply and defaults elsewhere.
    pub fn with_fraction_supply(fraction_supply: u64) -> Self {
        Self {
            fraction_supply,
            ..Default::default()
        }
    }

    /// Checks the policy invariants the vault relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fraction_supply == 0 {
            return Err(ConfigError::ZeroFractionSupply);
        }
        if self.fraction_supply > MAX_FRACTION_SUPPLY {
            return Err(ConfigError::FractionSupplyTooLarge(self.fraction_supply));
        }
        if self.custody_address.is_blank() {
            return Err(ConfigError::BlankCustodyAddress);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = VaultConfig::default();
        assert_eq!(config.fraction_supply, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_supply_rejected() {
        let config = VaultConfig::with_fraction_supply(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroFractionSupply));
    }

    #[test]
    fn oversized_supply_rejected() {
        let config = VaultConfig::with_fraction_supply(MAX_FRACTION_SUPPLY + 1);
        assert_eq!(
            config.validate(),
            Err(ConfigError::FractionSupplyTooLarge(MAX_FRACTION_SUPPLY + 1))
        );
    }

    #[test]
    fn blank_custody_address_rejected() {
        let config = VaultConfig {
            custody_address: Address::new(" "),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BlankCustodyAddress));
    }

    #[test]
    fn test_ports_are_distinct() {
        assert_ne!(DEFAULT_RPC_PORT, DEFAULT_METRICS_PORT);
    }

    #[test]
    fn test_metadata_uri_has_placeholder() {
        assert!(DEFAULT_METADATA_URI.contains("{id}"));
    }
}
