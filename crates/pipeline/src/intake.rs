//! The intake pipeline: background removal, then tagging.

use std::time::Instant;

use closet_model::{ClothingItem, Gender, ImagePayload};
use tracing::{info, instrument};

use crate::background::BackgroundRemover;
use crate::tagging::ItemTagger;

/// Turns one uploaded photo into a catalog-ready [`ClothingItem`].
///
/// Both stages degrade instead of failing, so `process` always produces an
/// item: worst case it carries the original photo and an "unknown"
/// classification.
#[derive(Clone)]
pub struct IntakePipeline {
    remover: BackgroundRemover,
    tagger: ItemTagger,
}

impl IntakePipeline {
    pub fn new(remover: BackgroundRemover, tagger: ItemTagger) -> Self {
        Self { remover, tagger }
    }

    pub fn remover(&self) -> &BackgroundRemover {
        &self.remover
    }

    pub fn tagger(&self) -> &ItemTagger {
        &self.tagger
    }

    /// Run both stages on `image`; the tagger sees the cleaned image.
    #[instrument(skip_all)]
    pub async fn process(&self, image: &ImagePayload, gender: Option<Gender>) -> ClothingItem {
        let start = Instant::now();

        let cleaned = self.remover.remove_background(image).await;
        let classification = self.tagger.tag_clothing_item(&cleaned, gender).await;
        let item = ClothingItem::new(cleaned, classification);

        info!(
            item_id = %item.id,
            category = %item.category,
            "Intake finished in {:.2?}",
            start.elapsed()
        );
        item
    }
}
