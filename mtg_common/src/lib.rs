//! Shared types for MTG card tooling
//!
//! Holds the Scryfall response model and the transient fetch-error taxonomy
//! used by the card binder.

pub mod error;
pub mod scryfall;

pub use error::FetchError;
pub use scryfall::{CardFace, ImageUris, ScryfallCard, ScryfallErrorBody};
