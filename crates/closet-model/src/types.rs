//! Core domain types for the closet.
//!
//! This module defines the records we persist (items, inspirations,
//! preferences) and the response-only types produced by the AI workflows.
//! Every persisted type serializes with camelCase field names; that JSON is
//! the format used both in device-local storage and in remote documents.

use crate::image::ImagePayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a clothing item (UUID v4 string for new items)
pub type ItemId = String;

/// Unique identifier for a saved inspiration
pub type InspirationId = String;

/// Label used when a classification could not be determined
pub const UNKNOWN_LABEL: &str = "unknown";

// =============================================================================
// Clothing items
// =============================================================================

/// One catalogued piece of clothing.
///
/// Items are replace-only: nothing mutates an item in place, a new version
/// replaces the old one under the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothingItem {
    pub id: ItemId,
    pub image: ImagePayload,
    /// Coarse label (top, bottom, shoes, outerwear, ...)
    pub category: String,
    /// Fine label (t-shirt, jeans, sneakers, ...)
    pub sub_category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Hex strings, always `#`-prefixed
    #[serde(default)]
    pub dominant_colors: Vec<String>,
    #[serde(default)]
    pub has_pattern: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_description: Option<String>,
}

impl ClothingItem {
    /// Build a new item with a fresh id from an intake result.
    pub fn new(image: ImagePayload, classification: ItemClassification) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), image, classification)
    }

    pub fn with_id(
        id: impl Into<ItemId>,
        image: ImagePayload,
        classification: ItemClassification,
    ) -> Self {
        Self {
            id: id.into(),
            image,
            category: classification.category,
            sub_category: classification.sub_category,
            tags: classification.tags,
            dominant_colors: classification.dominant_colors,
            has_pattern: classification.has_pattern,
            pattern_description: classification.pattern_description,
        }
    }

    /// The classification part of the item, without the image.
    pub fn classification(&self) -> ItemClassification {
        ItemClassification {
            category: self.category.clone(),
            sub_category: self.sub_category.clone(),
            tags: self.tags.clone(),
            dominant_colors: self.dominant_colors.clone(),
            has_pattern: self.has_pattern,
            pattern_description: self.pattern_description.clone(),
        }
    }
}

/// Result of tagging an image.
///
/// All six fields are always populated; see [`ItemClassification::unknown`]
/// for the fallback used whenever the vision model cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemClassification {
    pub category: String,
    pub sub_category: String,
    pub tags: Vec<String>,
    pub dominant_colors: Vec<String>,
    pub has_pattern: bool,
    pub pattern_description: Option<String>,
}

impl ItemClassification {
    /// The fixed "unknown" classification.
    pub fn unknown() -> Self {
        Self {
            category: UNKNOWN_LABEL.to_string(),
            sub_category: UNKNOWN_LABEL.to_string(),
            tags: Vec::new(),
            dominant_colors: Vec::new(),
            has_pattern: false,
            pattern_description: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }
}

impl Default for ItemClassification {
    fn default() -> Self {
        Self::unknown()
    }
}

// =============================================================================
// Inspirations
// =============================================================================

/// A generated outfit the user chose to keep.
///
/// Items are snapshots taken when the outfit was saved; later edits or
/// removals in the catalog do not reach back into an inspiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspiration {
    pub id: InspirationId,
    pub description: String,
    #[serde(default)]
    pub items: Vec<ClothingItem>,
    pub created_at: DateTime<Utc>,
}

impl Inspiration {
    pub fn new(description: impl Into<String>, items: Vec<ClothingItem>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            items,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// User preferences
// =============================================================================

/// Gender hint used when tagging and styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = crate::ClosetError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(crate::ClosetError::ValidationError(format!(
                "unknown gender `{other}`"
            ))),
        }
    }
}

/// Clothing sizes, each optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sizes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shoes: Option<String>,
}

/// Per-identity style preferences.
///
/// `Default` is the documented default object: no gender, no sizes and
/// empty lists. It is what a fresh identity (or a corrupt stored value)
/// starts from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub style_preferences: Vec<String>,
    #[serde(default)]
    pub sizes: Sizes,
    #[serde(default)]
    pub favorite_colors: Vec<String>,
    #[serde(default)]
    pub occasions: Vec<String>,
}

impl UserPreferences {
    /// Apply a partial update: present fields replace, absent ones are kept.
    pub fn merge(&mut self, patch: &PreferencesPatch) {
        if let Some(gender) = patch.gender {
            self.gender = Some(gender);
        }
        if let Some(styles) = &patch.style_preferences {
            self.style_preferences = styles.clone();
        }
        if let Some(sizes) = &patch.sizes {
            self.sizes = sizes.clone();
        }
        if let Some(colors) = &patch.favorite_colors {
            self.favorite_colors = colors.clone();
        }
        if let Some(occasions) = &patch.occasions {
            self.occasions = occasions.clone();
        }
    }
}

/// A partial preferences update.
///
/// Serializes only the fields that are present, which is exactly the body of
/// a merge-write against a remote preferences document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_preferences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Sizes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occasions: Option<Vec<String>>,
}

impl PreferencesPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// Outfit suggestions (response-only)
// =============================================================================

/// An outfit proposed by the generative model (or by the local fallback).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitSuggestion {
    pub description: String,
    #[serde(default)]
    pub item_ids: Vec<ItemId>,
    #[serde(default)]
    pub missing_items: Vec<String>,
    #[serde(default)]
    pub weather_warnings: Vec<String>,
    #[serde(default)]
    pub alternative_outfits: Vec<AlternativeOutfit>,
}

/// An alternate look attached to a suggestion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeOutfit {
    pub description: String,
    #[serde(default)]
    pub item_ids: Vec<ItemId>,
    #[serde(default)]
    pub rationale: String,
}

/// Latitude/longitude pair for the weather lookup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
