//! Cached card record types

use crate::card_key::CardKey;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use mtg_common::ScryfallCard;
use serde::{Deserialize, Serialize};

/// Result of the last lookup for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Resolved,
    NotFound,
    /// Lookup failed transiently; only used for unstored best-effort placeholders
    Error,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Resolved => "resolved",
            FetchStatus::NotFound => "not_found",
            FetchStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resolved" => Some(FetchStatus::Resolved),
            "not_found" => Some(FetchStatus::NotFound),
            "error" => Some(FetchStatus::Error),
            _ => None,
        }
    }
}

/// Card details kept from a successful lookup
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CardMetadata {
    pub scryfall_id: String,
    pub display_name: String,
    pub set_code: String,
    pub set_name: Option<String>,
    pub collector_number: String,
    pub rarity: Option<String>,
    pub type_line: Option<String>,
    pub mana_cost: Option<String>,
    pub oracle_text: Option<String>,
    pub image_url: Option<String>,
}

impl From<&ScryfallCard> for CardMetadata {
    fn from(card: &ScryfallCard) -> Self {
        Self {
            scryfall_id: card.id.clone(),
            display_name: card.name.clone(),
            set_code: card.set.clone(),
            set_name: card.set_name.clone(),
            collector_number: card.collector_number.clone(),
            rarity: card.rarity.clone(),
            type_line: card.full_type_line(),
            mana_cost: card.full_mana_cost(),
            oracle_text: card.full_oracle_text(),
            image_url: card.image_url().map(str::to_string),
        }
    }
}

impl CardMetadata {
    /// File name used for this card's image in the cache and output assets
    pub fn image_file_name(&self) -> String {
        let slug: String = self
            .scryfall_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{}.jpg", slug)
    }
}

/// One entry of the metadata cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCardRecord {
    pub key: CardKey,
    pub metadata: Option<CardMetadata>,
    /// Image file name inside the cache image directory
    pub image_file: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub status: FetchStatus,
}

impl CachedCardRecord {
    pub fn resolved(
        key: CardKey,
        metadata: CardMetadata,
        image_file: Option<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            metadata: Some(metadata),
            image_file,
            fetched_at: fetched_at.trunc_subsecs(0),
            status: FetchStatus::Resolved,
        }
    }

    pub fn not_found(key: CardKey, fetched_at: DateTime<Utc>) -> Self {
        Self {
            key,
            metadata: None,
            image_file: None,
            fetched_at: fetched_at.trunc_subsecs(0),
            status: FetchStatus::NotFound,
        }
    }

    /// Placeholder for a key whose lookup failed in best-effort mode
    pub fn unavailable(key: CardKey, at: DateTime<Utc>) -> Self {
        Self {
            key,
            metadata: None,
            image_file: None,
            fetched_at: at.trunc_subsecs(0),
            status: FetchStatus::Error,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == FetchStatus::Resolved
    }

    /// Time elapsed since the record was fetched
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }
}
