//! Outfit prompt assembly.
//!
//! ## Algorithm
//! 1. Reduce the catalog to [`ItemSnapshot`]s (no image data), in parallel
//!    for large catalogs
//! 2. Render one prompt: guidance, context (weather, occasion, preferences),
//!    the snapshot, liked outfits, the branching instruction and the reply
//!    schema
//!
//! The model only ever sees snapshot ids, and replies are filtered back to
//! those ids, so the snapshot is also the set of ids a suggestion may use.

use std::collections::HashSet;
use std::fmt::Write;

use closet_model::{ClothingItem, Inspiration, ItemId, UserPreferences};
use rayon::prelude::*;
use serde::Serialize;

/// Catalogs at least this large are snapshotted on the rayon pool
pub const PARALLEL_SNAPSHOT_THRESHOLD: usize = 64;

/// Occasion used when the caller gives none
pub const DEFAULT_OCCASION: &str = "everyday wear";

const STYLE_GUIDANCE: &str = "\
Style guidance:
- Balance proportions: pair a relaxed piece with a fitted one.
- Keep one focal point per outfit (a statement piece, pattern or color).
- Match formality across pieces, and dress for the occasion first.";

const COLOR_GUIDANCE: &str = "\
Color theory:
- Neutrals (black, white, grey, navy, beige, denim) go with everything.
- Use complementary colors for contrast or analogous colors for harmony.
- Limit an outfit to about three colors, repeating one to tie it together.";

const TREND_GUIDANCE: &str = "\
Current trends:
- Relaxed tailoring, wide-leg trousers and layered knitwear.
- Tonal dressing in a single color family.
- Minimal accessories with one standout piece.";

const RESPONSE_SCHEMA: &str = r#"Respond with exactly one JSON object and no other text:
{
  "description": "one or two sentences describing the outfit",
  "itemIds": ["ids of the closet items to wear"],
  "missingItems": ["pieces that would complete the look but are not in the closet"],
  "weatherWarnings": ["anything to watch out for given the weather"],
  "alternativeOutfits": [
    {"description": "...", "itemIds": ["..."], "rationale": "why this also works"}
  ]
}"#;

/// A catalog item as the model sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub category: String,
    pub sub_category: String,
    pub tags: Vec<String>,
    pub colors: Vec<String>,
}

impl From<&ClothingItem> for ItemSnapshot {
    fn from(item: &ClothingItem) -> Self {
        Self {
            id: item.id.clone(),
            category: item.category.clone(),
            sub_category: item.sub_category.clone(),
            tags: item.tags.clone(),
            colors: item.dominant_colors.clone(),
        }
    }
}

/// Strip image data from every item, preserving catalog order.
pub fn snapshot_catalog(items: &[ClothingItem]) -> Vec<ItemSnapshot> {
    if items.len() >= PARALLEL_SNAPSHOT_THRESHOLD {
        items.par_iter().map(ItemSnapshot::from).collect()
    } else {
        items.iter().map(ItemSnapshot::from).collect()
    }
}

/// Ids a reply is allowed to reference
pub fn snapshot_ids(snapshot: &[ItemSnapshot]) -> HashSet<ItemId> {
    snapshot.iter().map(|item| item.id.clone()).collect()
}

/// Inputs to [`build_outfit_prompt`]
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub weather: &'a str,
    pub occasion: Option<&'a str>,
    pub preferences: Option<&'a UserPreferences>,
    pub items: &'a [ItemSnapshot],
    pub liked_outfits: &'a [Inspiration],
}

/// Render the single outfit-request prompt.
pub fn build_outfit_prompt(ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::with_capacity(2048 + ctx.items.len() * 96);

    prompt.push_str("You are a personal stylist putting together an outfit.\n\n");
    for section in [STYLE_GUIDANCE, COLOR_GUIDANCE, TREND_GUIDANCE] {
        prompt.push_str(section);
        prompt.push_str("\n\n");
    }

    // Writing to a String cannot fail.
    let _ = writeln!(prompt, "Weather: {}", ctx.weather);
    let occasion = ctx
        .occasion
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .unwrap_or(DEFAULT_OCCASION);
    let _ = writeln!(prompt, "Occasion: {occasion}");
    write_preferences(&mut prompt, ctx.preferences);
    prompt.push('\n');

    if ctx.items.is_empty() {
        prompt.push_str(
            "The user has not shared their closet. Suggest a general outfit built from \
             wardrobe essentials, list the pieces in \"missingItems\", and leave \"itemIds\" \
             empty.\n\n",
        );
    } else {
        prompt.push_str("Closet items (JSON, one per line):\n");
        for item in ctx.items {
            if let Ok(line) = serde_json::to_string(item) {
                prompt.push_str(&line);
                prompt.push('\n');
            }
        }
        prompt.push_str(
            "\nBuild the outfit only from the closet items above and reference them by \"id\" \
             in \"itemIds\". Put anything the closet lacks in \"missingItems\".\n\n",
        );
    }

    write_liked_outfits(&mut prompt, ctx.liked_outfits);

    prompt.push_str(RESPONSE_SCHEMA);
    prompt
}

fn write_preferences(prompt: &mut String, preferences: Option<&UserPreferences>) {
    let Some(prefs) = preferences else {
        return;
    };
    if let Some(gender) = prefs.gender {
        let _ = writeln!(prompt, "Dressing for: {gender}");
    }
    if !prefs.style_preferences.is_empty() {
        let _ = writeln!(prompt, "Preferred styles: {}", prefs.style_preferences.join(", "));
    }
    if !prefs.favorite_colors.is_empty() {
        let _ = writeln!(prompt, "Favorite colors: {}", prefs.favorite_colors.join(", "));
    }
}

fn write_liked_outfits(prompt: &mut String, liked: &[Inspiration]) {
    if liked.is_empty() {
        return;
    }
    prompt.push_str(
        "Outfits the user liked before (use them as taste signals, do not repeat them):\n",
    );
    for inspiration in liked {
        let pieces: Vec<&str> = inspiration
            .items
            .iter()
            .map(|item| item.sub_category.as_str())
            .collect();
        let _ = writeln!(prompt, "- {} [{}]", inspiration.description, pieces.join(", "));
    }
    prompt.push('\n');
}
