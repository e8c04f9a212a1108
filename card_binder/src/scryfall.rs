//! Scryfall API client
//!
//! Looks cards up by exact name (optionally restricted to a set) and
//! downloads their `normal` size image. Uses async reqwest with a shared
//! client, a per-request timeout and a minimum spacing between API calls.

use crate::cache::CardMetadata;
use crate::card_key::CardKey;
use crate::config::{FetchSettings, USER_AGENT};
use crate::fetcher::{CardFetcher, FetchOutcome, FetchedCard};
use mtg_common::{FetchError, ScryfallCard, ScryfallErrorBody};
use reqwest::StatusCode;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// HTTP client for the Scryfall API
pub struct ScryfallClient {
    http: reqwest::Client,
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl ScryfallClient {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            min_interval: settings.min_interval,
            last_request: Mutex::new(None),
        })
    }

    /// Lookup URL for a key: `/cards/named?exact=<name>[&set=<set>]`
    pub fn named_url(&self, key: &CardKey) -> String {
        let mut url = format!(
            "{}/cards/named?exact={}",
            self.base_url,
            urlencoding::encode(key.name())
        );
        if let Some(set) = key.set() {
            url.push_str("&set=");
            url.push_str(&urlencoding::encode(set));
        }
        url
    }

    /// Wait until at least `min_interval` has passed since the previous API call
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Fetch card data; `Ok(None)` when Scryfall has no such card
    pub async fn fetch_card(&self, key: &CardKey) -> Result<Option<ScryfallCard>, FetchError> {
        let url = self.named_url(key);
        self.throttle().await;
        log::debug!("Fetching card from Scryfall: {}", url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            match response.json::<ScryfallErrorBody>().await {
                Ok(body) => log::debug!("Scryfall has no card for {}: {}", key, body.details),
                Err(_) => log::debug!("Scryfall has no card for {}", key),
            }
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }

        let body = response.text().await?;
        let card: ScryfallCard = serde_json::from_str(&body)?;
        Ok(Some(card))
    }

    /// Download image bytes; `Ok(None)` when the image is gone (404)
    pub async fn fetch_image(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        log::debug!("Fetching image from URL: {}", url);

        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            log::warn!("Image not found at {}", url);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }
        Ok(Some(response.bytes().await?.to_vec()))
    }
}

impl CardFetcher for ScryfallClient {
    async fn fetch(&self, key: &CardKey) -> Result<FetchOutcome, FetchError> {
        let Some(card) = self.fetch_card(key).await? else {
            return Ok(FetchOutcome::NotFound);
        };

        let metadata = CardMetadata::from(&card);
        let image = match card.image_url() {
            Some(url) => self.fetch_image(url).await?,
            None => {
                log::warn!("Scryfall card {} has no image", card.name);
                None
            }
        };

        log::info!(
            "Fetched {} ({} #{})",
            metadata.display_name,
            metadata.set_code.to_uppercase(),
            metadata.collector_number
        );
        Ok(FetchOutcome::Found(FetchedCard { metadata, image }))
    }
}

#[cfg(test)]
#[path = "scryfall_tests.rs"]
mod tests;
