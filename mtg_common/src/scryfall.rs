//! Scryfall API response model

use serde::{Deserialize, Serialize};

/// Scryfall card response
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScryfallCard {
    pub id: String,
    pub name: String,
    pub set: String,
    #[serde(default)]
    pub set_name: Option<String>,
    pub collector_number: String,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    /// For double-faced cards, images are in card_faces
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ImageUris {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CardFace {
    pub name: String,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
}

impl ScryfallCard {
    /// Get the primary image URL (normal size)
    pub fn image_url(&self) -> Option<&str> {
        // Try direct image_uris first
        if let Some(ref uris) = self.image_uris {
            return uris.normal.as_deref();
        }
        // For double-faced cards, get front face image
        self.card_faces
            .as_ref()
            .and_then(|faces| faces.first())
            .and_then(|face| face.image_uris.as_ref())
            .and_then(|uris| uris.normal.as_deref())
    }

    /// Type line, joining faces with " // " when only the faces carry one
    pub fn full_type_line(&self) -> Option<String> {
        self.type_line
            .clone()
            .or_else(|| self.join_faces(|face| face.type_line.as_deref()))
    }

    /// Mana cost, joining faces with " // " when only the faces carry one
    pub fn full_mana_cost(&self) -> Option<String> {
        self.mana_cost
            .clone()
            .filter(|cost| !cost.is_empty())
            .or_else(|| self.join_faces(|face| face.mana_cost.as_deref()))
    }

    /// Oracle text, joining faces with " // " when only the faces carry one
    pub fn full_oracle_text(&self) -> Option<String> {
        self.oracle_text
            .clone()
            .or_else(|| self.join_faces(|face| face.oracle_text.as_deref()))
    }

    fn join_faces<'a>(&'a self, field: impl Fn(&'a CardFace) -> Option<&'a str>) -> Option<String> {
        let faces = self.card_faces.as_ref()?;
        let parts: Vec<&str> = faces.iter().filter_map(field).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" // "))
        }
    }
}

/// Scryfall API error response
#[derive(Debug, Deserialize, Clone)]
pub struct ScryfallErrorBody {
    pub status: u16,
    pub code: String,
    pub details: String,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}
