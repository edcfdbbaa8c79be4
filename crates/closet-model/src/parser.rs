//! Parse-or-default helpers for loosely-typed model replies.
//!
//! The generative model answers in free text that is *expected* to contain
//! one JSON object. Nothing enforces a schema on the provider side, so every
//! workflow funnels the reply through this module:
//!
//! 1. [`extract_json_object`] cuts the text from the first `{` to the last `}`
//! 2. `serde_json` parses that slice into a [`Value`]
//! 3. the `from_loose_json` constructors coerce each field to its expected
//!    type, substituting a default for anything missing or malformed
//!
//! The rest of the system only ever sees fully populated, strongly typed
//! results.

use crate::types::{AlternativeOutfit, ItemClassification, ItemId, OutfitSuggestion, UNKNOWN_LABEL};
use serde_json::Value;
use std::collections::HashSet;

/// Description used when the model omits one
pub const PLACEHOLDER_DESCRIPTION: &str = "Outfit suggestion";

/// Return the slice from the first `{` through the last `}`.
///
/// Returns `None` when the text has no opening brace, or no closing brace
/// after it. The slice is not guaranteed to be valid JSON.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Extract and parse the embedded JSON object, if there is a well-formed one.
pub fn parse_embedded_object(text: &str) -> Option<Value> {
    let slice = extract_json_object(text)?;
    match serde_json::from_str::<Value>(slice) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

// =============================================================================
// Field coercion
// =============================================================================

/// A trimmed, non-empty string field, or `None`.
pub fn loose_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Keep only the well-typed (non-empty string) members of an array field.
pub fn loose_string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| loose_string(Some(item)))
                .collect()
        })
        .unwrap_or_default()
}

/// A boolean field, defaulting to `false`.
pub fn loose_bool(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

// =============================================================================
// Tagging replies
// =============================================================================

impl ItemClassification {
    /// Coerce a parsed tagging reply.
    ///
    /// Colors additionally have to start with `#`; anything else the model
    /// put in that list (color names, numbers) is dropped.
    pub fn from_loose_json(value: &Value) -> Self {
        let dominant_colors = loose_string_list(value.get("dominantColors"))
            .into_iter()
            .filter(|color| color.starts_with('#'))
            .collect();

        Self {
            category: loose_string(value.get("category"))
                .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            sub_category: loose_string(value.get("subCategory"))
                .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            tags: loose_string_list(value.get("tags")),
            dominant_colors,
            has_pattern: loose_bool(value.get("hasPattern")),
            pattern_description: loose_string(value.get("patternDescription")),
        }
    }

    /// Full parse-or-default boundary for a raw tagging reply.
    ///
    /// Anything that is not an embedded JSON object yields
    /// [`ItemClassification::unknown`].
    pub fn from_model_reply(reply: &str) -> Self {
        match parse_embedded_object(reply) {
            Some(value) => Self::from_loose_json(&value),
            None => Self::unknown(),
        }
    }
}

// =============================================================================
// Outfit replies
// =============================================================================

impl OutfitSuggestion {
    /// Coerce a parsed outfit reply.
    ///
    /// `known_ids` is the set of item ids that were sent to the model. Ids the
    /// model invents (or remembers from elsewhere) are dropped here, so a
    /// suggestion never references an item outside its request snapshot.
    pub fn from_loose_json(value: &Value, known_ids: &HashSet<ItemId>) -> Self {
        let alternative_outfits = value
            .get("alternativeOutfits")
            .and_then(Value::as_array)
            .map(|alternates| {
                alternates
                    .iter()
                    .filter(|alt| alt.is_object())
                    .map(|alt| AlternativeOutfit {
                        description: loose_string(alt.get("description"))
                            .unwrap_or_else(|| PLACEHOLDER_DESCRIPTION.to_string()),
                        item_ids: known_item_ids(alt.get("itemIds"), known_ids),
                        rationale: loose_string(alt.get("rationale")).unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            description: loose_string(value.get("description"))
                .unwrap_or_else(|| PLACEHOLDER_DESCRIPTION.to_string()),
            item_ids: known_item_ids(value.get("itemIds"), known_ids),
            missing_items: loose_string_list(value.get("missingItems")),
            weather_warnings: loose_string_list(value.get("weatherWarnings")),
            alternative_outfits,
        }
    }
}

/// String ids that exist in `known_ids`, deduplicated, in reply order.
fn known_item_ids(value: Option<&Value>, known_ids: &HashSet<ItemId>) -> Vec<ItemId> {
    let mut seen = HashSet::new();
    loose_string_list(value)
        .into_iter()
        .filter(|id| known_ids.contains(id) && seen.insert(id.clone()))
        .collect()
}
