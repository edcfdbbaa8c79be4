//! Item tagging with a vision-capable generative model.
//!
//! One prompt, one image, one free-text reply. The reply goes through
//! [`ItemClassification::from_model_reply`], so whatever the model says the
//! caller gets a fully populated classification.

use std::sync::Arc;

use closet_model::{Gender, ImagePayload, ItemClassification};
use providers::GenerativeModel;
use tracing::{debug, info, instrument, warn};

/// Build the tagging instruction for an optional gender hint.
pub fn tagging_prompt(gender: Option<Gender>) -> String {
    let wearer = match gender {
        Some(Gender::Male) => "a man's wardrobe",
        Some(Gender::Female) => "a woman's wardrobe",
        Some(Gender::Other) | None => "a wardrobe",
    };

    format!(
        "You are cataloguing a single clothing item from {wearer}. \
         Look at the photo and answer with exactly one JSON object and nothing else, \
         using this shape:\n\
         {{\n\
         \x20 \"category\": \"top | bottom | dress | outerwear | shoes | accessory\",\n\
         \x20 \"subCategory\": \"specific garment type, e.g. t-shirt, jeans, sneakers\",\n\
         \x20 \"tags\": [\"style or occasion keywords, e.g. casual, formal, summer\"],\n\
         \x20 \"dominantColors\": [\"hex colors such as #1a2b3c, most dominant first\"],\n\
         \x20 \"hasPattern\": true or false,\n\
         \x20 \"patternDescription\": \"short description, or null when plain\"\n\
         }}"
    )
}

/// Tags clothing photos, degrading to the "unknown" classification.
#[derive(Clone)]
pub struct ItemTagger {
    model: Arc<dyn GenerativeModel>,
}

impl ItemTagger {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Classify one clothing photo.
    ///
    /// Never fails: a missing credential, a provider error or an unusable
    /// reply all yield [`ItemClassification::unknown`].
    #[instrument(skip_all, fields(model = self.model.name(), image = %image))]
    pub async fn tag_clothing_item(
        &self,
        image: &ImagePayload,
        gender: Option<Gender>,
    ) -> ItemClassification {
        if !self.model.has_credentials() {
            warn!("Generative model has no credential, item left untagged");
            return ItemClassification::unknown();
        }

        let prompt = tagging_prompt(gender);
        let reply = match self.model.generate(&prompt, Some(image)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Tagging request failed, item left untagged");
                return ItemClassification::unknown();
            }
        };
        debug!(reply_len = reply.len(), "Tagging reply received");

        let classification = ItemClassification::from_model_reply(&reply);
        if classification.is_unknown() {
            warn!("Tagging reply yielded no classification");
        } else {
            info!(
                category = %classification.category,
                sub_category = %classification.sub_category,
                "Item tagged"
            );
        }
        classification
    }
}
