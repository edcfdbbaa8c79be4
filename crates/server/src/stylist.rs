//! Outfit-idea generation.
//!
//! ## Algorithm
//! 1. Fail fast if the generative model has no credential
//! 2. Describe the weather at the given coordinates (never fatal)
//! 3. Snapshot the catalog and render the prompt
//! 4. Ask the model once and coerce the reply, keeping only snapshot ids
//! 5. On any provider or parse failure, fall back to a fixed suggestion
//!    built from the first catalog items
//!
//! The credential check is the only way [`OutfitGenerator::generate_outfit_idea`]
//! returns an error.

use std::sync::Arc;
use std::time::Instant;

use closet_model::{
    ClothingItem, Coordinates, Inspiration, OutfitSuggestion, UserPreferences,
    parse_embedded_object,
};
use providers::{GenerativeModel, WeatherLookup};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::prompt::{PromptContext, build_outfit_prompt, snapshot_catalog, snapshot_ids};

pub const WEATHER_UNAVAILABLE: &str = "Weather unavailable";
pub const WEATHER_NOT_PROVIDED: &str = "Weather not provided";

/// Number of catalog items the fallback outfit uses
const FALLBACK_ITEM_COUNT: usize = 2;

#[derive(Error, Debug)]
pub enum StylistError {
    #[error("Outfit generation needs a credential for {model}: set {variable}")]
    MissingCredential { model: String, variable: &'static str },
}

/// Everything optional that can shape a suggestion
#[derive(Debug, Clone, Default)]
pub struct OutfitRequest {
    pub coordinates: Option<Coordinates>,
    pub occasion: Option<String>,
    pub catalog: Option<Vec<ClothingItem>>,
    pub liked_outfits: Vec<Inspiration>,
    pub preferences: Option<UserPreferences>,
}

impl OutfitRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_occasion(mut self, occasion: impl Into<String>) -> Self {
        self.occasion = Some(occasion.into());
        self
    }

    pub fn with_catalog(mut self, catalog: Vec<ClothingItem>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_liked_outfits(mut self, liked: Vec<Inspiration>) -> Self {
        self.liked_outfits = liked;
        self
    }

    pub fn with_preferences(mut self, preferences: UserPreferences) -> Self {
        self.preferences = Some(preferences);
        self
    }
}

/// The suggestion used when the model cannot be reached or understood.
///
/// With items, it picks the first two in catalog order. Without, every
/// field is empty.
pub fn fallback_suggestion(catalog: Option<&[ClothingItem]>) -> OutfitSuggestion {
    let picked: Vec<&ClothingItem> = catalog
        .unwrap_or_default()
        .iter()
        .take(FALLBACK_ITEM_COUNT)
        .collect();

    let description = match picked.as_slice() {
        [] => String::new(),
        [only] => format!("A simple look from your closet: {}.", only.sub_category),
        [first, second, ..] => format!(
            "A simple look from your closet: {} with {}.",
            first.sub_category, second.sub_category
        ),
    };

    OutfitSuggestion {
        description,
        item_ids: picked.iter().map(|item| item.id.clone()).collect(),
        ..OutfitSuggestion::default()
    }
}

#[derive(Clone)]
pub struct OutfitGenerator {
    model: Arc<dyn GenerativeModel>,
    weather: Arc<dyn WeatherLookup>,
}

impl OutfitGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>, weather: Arc<dyn WeatherLookup>) -> Self {
        Self { model, weather }
    }

    /// Generate one outfit suggestion for `request`.
    #[instrument(skip_all, fields(
        model = self.model.name(),
        occasion = request.occasion.as_deref(),
        catalog = request.catalog.as_ref().map(Vec::len),
    ))]
    pub async fn generate_outfit_idea(
        &self,
        request: &OutfitRequest,
    ) -> Result<OutfitSuggestion, StylistError> {
        // Step 1: credentials, before anything touches the network
        if !self.model.has_credentials() {
            return Err(StylistError::MissingCredential {
                model: self.model.name().to_string(),
                variable: "GEMINI_API_KEY",
            });
        }
        let start = Instant::now();

        // Step 2: weather
        let weather = self.describe_weather(request.coordinates).await;

        // Step 3: prompt
        let catalog = request.catalog.as_deref();
        let snapshot = snapshot_catalog(catalog.unwrap_or_default());
        let known_ids = snapshot_ids(&snapshot);
        let prompt = build_outfit_prompt(&PromptContext {
            weather: &weather,
            occasion: request.occasion.as_deref(),
            preferences: request.preferences.as_ref(),
            items: &snapshot,
            liked_outfits: &request.liked_outfits,
        });
        debug!(prompt_len = prompt.len(), items = snapshot.len(), "Outfit prompt built");

        // Step 4-5: ask, coerce or fall back
        let suggestion = match self.model.generate(&prompt, None).await {
            Ok(reply) => match parse_embedded_object(&reply) {
                Some(value) => OutfitSuggestion::from_loose_json(&value, &known_ids),
                None => {
                    warn!("Outfit reply had no usable JSON object, using fallback");
                    fallback_suggestion(catalog)
                }
            },
            Err(e) => {
                warn!(error = %e, "Outfit request failed, using fallback");
                fallback_suggestion(catalog)
            }
        };

        info!(
            items = suggestion.item_ids.len(),
            alternatives = suggestion.alternative_outfits.len(),
            "Outfit suggested in {:.2?}",
            start.elapsed()
        );
        Ok(suggestion)
    }

    async fn describe_weather(&self, coordinates: Option<Coordinates>) -> String {
        let Some(coordinates) = coordinates else {
            return WEATHER_NOT_PROVIDED.to_string();
        };
        match self.weather.describe(coordinates).await {
            Ok(description) => description,
            Err(e) => {
                warn!(error = %e, "Weather lookup failed");
                WEATHER_UNAVAILABLE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closet_model::{ImagePayload, ItemClassification};

    fn item(id: &str, sub_category: &str) -> ClothingItem {
        ClothingItem::with_id(
            id,
            ImagePayload::from_bytes("image/png", &[1]),
            ItemClassification {
                sub_category: sub_category.to_string(),
                ..ItemClassification::unknown()
            },
        )
    }

    #[test]
    fn test_fallback_with_two_or_more_items() {
        let catalog = vec![item("a", "t-shirt"), item("b", "jeans"), item("c", "boots")];
        let suggestion = fallback_suggestion(Some(catalog.as_slice()));

        assert_eq!(suggestion.item_ids, vec!["a", "b"]);
        assert_eq!(
            suggestion.description,
            "A simple look from your closet: t-shirt with jeans."
        );
        assert!(suggestion.missing_items.is_empty());
        assert!(suggestion.weather_warnings.is_empty());
        assert!(suggestion.alternative_outfits.is_empty());
    }

    #[test]
    fn test_fallback_with_one_item() {
        let catalog = vec![item("a", "dress")];
        let suggestion = fallback_suggestion(Some(catalog.as_slice()));
        assert_eq!(suggestion.item_ids, vec!["a"]);
        assert_eq!(suggestion.description, "A simple look from your closet: dress.");
    }

    #[test]
    fn test_fallback_without_catalog_is_empty() {
        assert_eq!(fallback_suggestion(None), OutfitSuggestion::default());
        assert_eq!(fallback_suggestion(Some(&[][..])), OutfitSuggestion::default());
    }
}
