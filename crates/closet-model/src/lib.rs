//! # Closet Model Crate
//!
//! Domain types shared by every other crate in the workspace.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (ClothingItem, Inspiration, UserPreferences,
//!   OutfitSuggestion)
//! - **image**: Base64 data-URL image payloads
//! - **index**: The ordered, id-keyed `Catalog`
//! - **parser**: Parse-or-default coercion of loosely-typed model replies
//! - **error**: Error types for malformed closet data
//!
//! ## Example Usage
//!
//! ```ignore
//! use closet_model::{Catalog, ClothingItem, ItemClassification};
//!
//! let classification = ItemClassification::from_model_reply(&reply_text);
//! let item = ClothingItem::new(image, classification);
//!
//! let mut catalog = Catalog::new();
//! catalog.insert(item);
//! ```

// Public modules
pub mod error;
pub mod image;
pub mod index;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{ClosetError, Result};
pub use image::ImagePayload;
pub use index::Catalog;
pub use parser::{extract_json_object, parse_embedded_object};
pub use types::{
    // Type aliases
    InspirationId,
    ItemId,
    // Core types
    AlternativeOutfit,
    ClothingItem,
    Coordinates,
    Inspiration,
    ItemClassification,
    OutfitSuggestion,
    PreferencesPatch,
    Sizes,
    UserPreferences,
    // Enums
    Gender,
    UNKNOWN_LABEL,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preferences() {
        let prefs = UserPreferences::default();
        assert!(prefs.gender.is_none());
        assert!(prefs.style_preferences.is_empty());
        assert!(prefs.favorite_colors.is_empty());
        assert_eq!(prefs.sizes, Sizes::default());
    }

    #[test]
    fn test_preferences_merge_keeps_absent_fields() {
        let mut prefs = UserPreferences {
            gender: Some(Gender::Female),
            style_preferences: vec!["minimal".to_string()],
            ..UserPreferences::default()
        };

        prefs.merge(&PreferencesPatch {
            favorite_colors: Some(vec!["#000000".to_string()]),
            ..PreferencesPatch::default()
        });

        assert_eq!(prefs.gender, Some(Gender::Female));
        assert_eq!(prefs.style_preferences, vec!["minimal"]);
        assert_eq!(prefs.favorite_colors, vec!["#000000"]);
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = PreferencesPatch {
            gender: Some(Gender::Other),
            ..PreferencesPatch::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"gender": "other"}));
        assert!(PreferencesPatch::default().is_empty());
    }

    #[test]
    fn test_clothing_item_json_shape() {
        let item = ClothingItem::with_id(
            "a",
            ImagePayload::from_bytes("image/png", &[1]),
            ItemClassification {
                category: "top".to_string(),
                sub_category: "t-shirt".to_string(),
                tags: vec!["casual".to_string()],
                dominant_colors: vec!["#ffffff".to_string()],
                has_pattern: false,
                pattern_description: None,
            },
        );

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["subCategory"], "t-shirt");
        assert_eq!(json["dominantColors"][0], "#ffffff");
        assert!(json.get("patternDescription").is_none());
        assert_eq!(item.classification().category, "top");
    }

    #[test]
    fn test_gender_parsing() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("m".parse::<Gender>().unwrap(), Gender::Male);
        assert!("robot".parse::<Gender>().is_err());
    }
}
