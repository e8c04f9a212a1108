//! Static HTML binder view
//!
//! [`render_binder`] lays resolved cards out on fixed-size pages in inventory
//! order and produces every output file in memory; [`write_binder`] puts them
//! on disk. Rendering is a pure function of its inputs, so identical inputs
//! give byte-identical pages.

mod html;
mod output;

pub use html::escape_html;
pub use output::{check_output_dir, write_binder, MANIFEST_FILE_NAME};

use crate::cache::{CachedCardRecord, FetchStatus};
use crate::config::PageLayout;
use crate::error::Result;
use crate::inventory::{Condition, InventoryEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Stylesheet copied to `assets/styles.css`
pub const STYLESHEET: &str = include_str!("../../static/styles.css");

/// Relative directory of copied card images inside the output
pub const IMAGE_ASSET_DIR: &str = "assets/images";

/// Data bound to one card slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileView {
    pub name: String,
    pub owned: u32,
    pub foil: bool,
    pub condition: Condition,
    /// Path relative to the page, absent for placeholders
    pub image_path: Option<String>,
}

impl TileView {
    pub fn new(entry: &InventoryEntry, record: &CachedCardRecord) -> Self {
        let name = record
            .metadata
            .as_ref()
            .filter(|_| record.is_resolved())
            .map(|meta| meta.display_name.clone())
            .unwrap_or_else(|| entry.name().to_string());
        Self {
            name,
            owned: entry.quantity(),
            foil: entry.is_foil(),
            condition: entry.condition(),
            image_path: record
                .image_file
                .as_ref()
                .map(|file| format!("{}/{}", IMAGE_ASSET_DIR, file)),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.image_path.is_none()
    }
}

impl From<&ManifestCard> for TileView {
    fn from(card: &ManifestCard) -> Self {
        Self {
            name: card.display_name.clone(),
            owned: card.quantity,
            foil: card.foil,
            condition: card.condition,
            image_path: card
                .image
                .as_ref()
                .map(|file| format!("{}/{}", IMAGE_ASSET_DIR, file)),
        }
    }
}

/// An image to copy from the cache into the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub source: PathBuf,
    /// File name under `assets/images/`
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub file_name: String,
    pub html: String,
}

/// Every file of a binder view, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBinder {
    pub pages: Vec<RenderedPage>,
    pub index: String,
    pub manifest: Vec<ImageAsset>,
    pub binder_json: String,
}

/// One card as listed in `binder.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestCard {
    /// Name as listed in the inventory
    pub name: String,
    /// Name shown on the tile
    pub display_name: String,
    pub quantity: u32,
    pub set_code: Option<String>,
    pub condition: Condition,
    pub foil: bool,
    pub status: FetchStatus,
    pub scryfall_id: Option<String>,
    pub image: Option<String>,
}

/// Contents of `binder.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinderManifest {
    pub name: String,
    #[serde(default)]
    pub layout: PageLayout,
    pub pages: usize,
    pub cards: Vec<ManifestCard>,
}

impl BinderManifest {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// File name of a 1-based page: `binder001.html`
pub fn page_file_name(page_number: usize) -> String {
    format!("binder{:03}.html", page_number)
}

/// Lay tiles out on pages of `layout`, returning the pages and the index
fn render_pages(name: &str, tiles: &[TileView], layout: PageLayout) -> (Vec<RenderedPage>, String) {
    let page_size = layout.page_size().max(1);
    let total_pages = tiles.len().div_ceil(page_size);

    let pages = tiles
        .chunks(page_size)
        .enumerate()
        .map(|(i, chunk)| {
            let mut slots: Vec<Option<&TileView>> = chunk.iter().map(Some).collect();
            slots.resize(page_size, None);
            RenderedPage {
                file_name: page_file_name(i + 1),
                html: html::render_page(name, i + 1, total_pages, i * page_size, &slots, layout),
            }
        })
        .collect();

    (pages, html::render_index(name, total_pages, tiles.len()))
}

/// Render resolved cards into pages, index, image manifest and `binder.json`.
///
/// Cards keep the order of `cards`; the last page is padded with empty slots.
pub fn render_binder(
    name: &str,
    cards: &[(InventoryEntry, CachedCardRecord)],
    layout: PageLayout,
    image_dir: &Path,
) -> Result<RenderedBinder> {
    let tiles: Vec<TileView> = cards
        .iter()
        .map(|(entry, record)| TileView::new(entry, record))
        .collect();
    let (pages, index) = render_pages(name, &tiles, layout);

    let mut seen = HashSet::new();
    let manifest = cards
        .iter()
        .filter_map(|(_, record)| record.image_file.as_ref())
        .filter(|file| seen.insert(file.as_str()))
        .map(|file| ImageAsset {
            source: image_dir.join(file),
            file_name: file.clone(),
        })
        .collect();

    let binder_manifest = BinderManifest {
        name: name.to_string(),
        layout,
        pages: pages.len(),
        cards: cards
            .iter()
            .zip(&tiles)
            .map(|((entry, record), tile)| ManifestCard {
                name: entry.name().to_string(),
                display_name: tile.name.clone(),
                quantity: entry.quantity(),
                set_code: entry.set_code().map(str::to_string),
                condition: entry.condition(),
                foil: entry.is_foil(),
                status: record.status,
                scryfall_id: record.metadata.as_ref().map(|m| m.scryfall_id.clone()),
                image: record.image_file.clone(),
            })
            .collect(),
    };

    Ok(RenderedBinder {
        pages,
        index,
        manifest,
        binder_json: serde_json::to_string_pretty(&binder_manifest)?,
    })
}

/// Render pages and index again from an existing `binder.json`.
///
/// Images are already in place, so the result copies none.
pub fn rerender_binder(manifest: &BinderManifest) -> Result<RenderedBinder> {
    let tiles: Vec<TileView> = manifest.cards.iter().map(TileView::from).collect();
    let (pages, index) = render_pages(&manifest.name, &tiles, manifest.layout);
    let manifest = BinderManifest {
        pages: pages.len(),
        ..manifest.clone()
    };

    Ok(RenderedBinder {
        pages,
        index,
        manifest: Vec::new(),
        binder_json: serde_json::to_string_pretty(&manifest)?,
    })
}
