//! Normalized card identity used as the cache lookup key

use crate::inventory::InventoryEntry;
use std::fmt;

/// Normalized identity of a card: name plus optional set code.
///
/// Built only through [`CardKey::new`], so two keys compare equal exactly when
/// their normalized name and set code match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardKey {
    name: String,
    set: Option<String>,
}

impl CardKey {
    /// Normalize a name and optional set code into a key.
    ///
    /// The name is trimmed, whitespace runs collapse to a single space, and the
    /// result is lowercased. Empty set codes are treated as absent.
    pub fn new(name: &str, set: Option<&str>) -> Self {
        let name = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let set = set
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        Self { name, set }
    }

    pub fn from_entry(entry: &InventoryEntry) -> Self {
        Self::new(entry.name(), entry.set_code())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&self) -> Option<&str> {
        self.set.as_deref()
    }

    /// Set code column value as stored ("" when absent)
    pub(crate) fn set_column(&self) -> &str {
        self.set.as_deref().unwrap_or("")
    }
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.set {
            Some(set) => write!(f, "{} ({})", self.name, set),
            None => write!(f, "{}", self.name),
        }
    }
}
