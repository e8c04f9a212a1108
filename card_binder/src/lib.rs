//! Card Binder - static HTML binder views for MTG inventories
//!
//! Resolves an inventory list against Scryfall through a persistent local
//! cache and renders the cards as a paginated, browsable binder.

pub mod binder;
pub mod cache;
pub mod card_key;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod inventory;
pub mod registry;
pub mod render;
pub mod scryfall;

pub use binder::{create_binder, edit_binder, BinderEdit, BinderSummary, CreateRequest};
pub use cache::{CachePolicy, CacheStore, CachedCardRecord, CardMetadata, FetchStatus, MetadataCache};
pub use card_key::CardKey;
pub use config::{FailurePolicy, FetchSettings, OutputMode, PageLayout, Settings};
pub use error::{BinderError, Result};
pub use fetcher::{CardFetcher, FetchOutcome, FetchedCard};
pub use inventory::{parse_inventory, read_inventory, Condition, InventoryEntry, LineFormat, ParseOptions};
pub use scryfall::ScryfallClient;
