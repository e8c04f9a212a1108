//! Remote lookup boundary used by the metadata cache

use crate::cache::CardMetadata;
use crate::card_key::CardKey;
use mtg_common::FetchError;
use std::future::Future;

/// Card details plus the downloaded image, if the card has one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedCard {
    pub metadata: CardMetadata,
    pub image: Option<Vec<u8>>,
}

/// Definitive answer from the remote source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(FetchedCard),
    /// The source has no card for this key
    NotFound,
}

/// Looks up card metadata and images for a key.
///
/// Implementations return `Err` only for transient failures; an unknown card
/// is `Ok(FetchOutcome::NotFound)`.
pub trait CardFetcher: Send + Sync + 'static {
    fn fetch(&self, key: &CardKey) -> impl Future<Output = Result<FetchOutcome, FetchError>> + Send;
}
