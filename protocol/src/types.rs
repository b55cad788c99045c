//! Core identifiers shared by the vault and its providers.
//!
//! These types form the vocabulary of every vault operation. They are thin
//! newtypes so that a record id can never be passed where a claim id is
//! expected, which is exactly the confusion an append-only ledger with two
//! independent counters invites.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// An opaque account identity, as attributed by the transport layer.
///
/// The vault never interprets addresses; it only compares them for
/// equality. The custody address of the vault itself is an ordinary
/// `Address` configured at startup.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wraps a raw identity string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the identity string is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Asset identifiers
// ---------------------------------------------------------------------------

/// Opaque reference to a custody collection (e.g. a contract address or a
/// registry namespace).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionRef(String);

impl CollectionRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollectionRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a single asset unit within a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully qualified asset unit: which collection, which unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetKey {
    pub collection: CollectionRef,
    pub unit: UnitId,
}

impl AssetKey {
    pub fn new(collection: CollectionRef, unit: UnitId) -> Self {
        Self { collection, unit }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.collection, self.unit)
    }
}

// ---------------------------------------------------------------------------
// Ledger identifiers
// ---------------------------------------------------------------------------

/// External handle of a deposit record. Assigned sequentially from zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Returns the arena index for this record, or `None` if the id does
    /// not fit the platform's address space.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier under which fraction units for one record are minted.
///
/// Assigned by the vault, never by the ledger, and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub u64);

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_serialize_transparently() {
        let json = serde_json::to_string(&RecordId(3)).unwrap();
        assert_eq!(json, "3");

        let json = serde_json::to_string(&Address::new("alice")).unwrap();
        assert_eq!(json, "\"alice\"");

        let claim: ClaimId = serde_json::from_str("42").unwrap();
        assert_eq!(claim, ClaimId(42));
    }

    #[test]
    fn blank_address_detected() {
        assert!(Address::new("   ").is_blank());
        assert!(Address::new("").is_blank());
        assert!(!Address::new("bob").is_blank());
    }

    #[test]
    fn record_index_matches_id() {
        assert_eq!(RecordId(0).index(), Some(0));
        assert_eq!(RecordId(41).index(), Some(41));
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn record_index_rejects_ids_beyond_address_space() {
        assert_eq!(RecordId(1 << 32).index(), None);
    }

    #[test]
    fn asset_key_display() {
        let key = AssetKey::new(CollectionRef::new("punks"), UnitId(7));
        assert_eq!(key.to_string(), "punks#7");
    }
}
