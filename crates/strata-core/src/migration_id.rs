//! Strongly-typed migration identifier.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Identifier of a migration.
///
/// Ids order lexicographically (byte-wise), which is the only ordering the
/// engine knows about. Prefix them with a timestamp or a zero-padded number
/// to get a stable total order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MigrationId(String);

impl MigrationId {
    /// Create a new `MigrationId`, panicking if the id is invalid.
    ///
    /// Prefer [`try_new`](Self::try_new) when handling untrusted input.
    pub fn new(id: impl Into<String>) -> Self {
        let s = id.into();
        assert!(Self::is_valid(&s), "invalid MigrationId: {s:?}");
        Self(s)
    }

    /// Try to create a new `MigrationId`.
    ///
    /// Returns `None` for empty ids and ids with leading or trailing
    /// whitespace, which would not survive a round trip through the CLI.
    pub fn try_new(id: impl Into<String>) -> Option<Self> {
        let s = id.into();
        if Self::is_valid(&s) {
            Some(Self(s))
        } else {
            None
        }
    }

    fn is_valid(s: &str) -> bool {
        !s.is_empty() && s.trim() == s
    }

    /// Return the underlying id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for MigrationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MigrationId::try_new(s)
            .ok_or_else(|| serde::de::Error::custom("MigrationId must be non-empty and trimmed"))
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MigrationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for MigrationId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MigrationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MigrationId {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        MigrationId::try_new(s).ok_or("MigrationId must be non-empty and trimmed")
    }
}

impl TryFrom<&str> for MigrationId {
    type Error = &'static str;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        MigrationId::try_new(s).ok_or("MigrationId must be non-empty and trimmed")
    }
}

impl PartialEq<str> for MigrationId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MigrationId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for MigrationId {
    fn eq(&self, other: &String) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "migration_id_test.rs"]
mod tests;
