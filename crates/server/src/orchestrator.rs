//! # Closet Service
//!
//! This module wires every component behind one façade:
//! 1. Provider clients (model, inference, storage, weather)
//! 2. The intake pipeline (background removal, then tagging)
//! 3. The outfit generator
//! 4. Identity-dependent synchronization of the closet view
//! 5. Checkout links
//!
//! ## Learning Goals
//!
//! This component teaches you:
//! - Sharing trait objects across components with Arc
//! - Keeping typed errors in libraries and adding anyhow context at the edge
//! - Awaiting background writes only where the caller needs durability
//! - Instrumentation and timing

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use closet_model::{
    ClosetError, ClothingItem, Coordinates, ImagePayload, Inspiration, ItemClassification,
    OutfitSuggestion, PreferencesPatch, UserPreferences,
};
use persistence::{Backends, ClosetSync, FileKeyValueStore, Identity, InMemoryDocumentStore};
use pipeline::{BackgroundRemover, IntakePipeline, ItemTagger};
use providers::{
    GeminiClient, HttpObjectStore, OpenWeatherClient, ReplicateClient, build_http_client,
};
use tracing::{info, instrument};

use crate::checkout::{CheckoutLinks, Plan};
use crate::config::AppConfig;
use crate::stylist::{OutfitGenerator, OutfitRequest};

/// Options for one outfit request made through the service
#[derive(Debug, Clone, Default)]
pub struct SuggestOptions {
    pub coordinates: Option<Coordinates>,
    pub occasion: Option<String>,
    /// Send the catalog to the model (otherwise a general suggestion)
    pub use_catalog: bool,
}

/// Main façade over the closet workflows
#[derive(Clone)]
pub struct ClosetService {
    intake: IntakePipeline,
    stylist: OutfitGenerator,
    sync: Arc<ClosetSync>,
    checkout: CheckoutLinks,
}

impl ClosetService {
    pub fn new(
        intake: IntakePipeline,
        stylist: OutfitGenerator,
        sync: Arc<ClosetSync>,
        checkout: CheckoutLinks,
    ) -> Self {
        Self {
            intake,
            stylist,
            sync,
            checkout,
        }
    }

    /// Build the production service from configuration.
    ///
    /// Guest data lives in files under `config.data_dir`. Signed-in sessions
    /// use an in-process document store.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let http = build_http_client().context("Failed to build HTTP client")?;

        let model = Arc::new(GeminiClient::new(http.clone(), config.gemini));
        let remover = BackgroundRemover::new(
            Arc::new(HttpObjectStore::new(http.clone(), config.storage)),
            Arc::new(ReplicateClient::new(http.clone(), config.replicate)),
        )
        .with_poll_policy(config.poll);
        let intake = IntakePipeline::new(remover, ItemTagger::new(model.clone()));
        let stylist = OutfitGenerator::new(
            model,
            Arc::new(OpenWeatherClient::new(http, config.weather)),
        );

        let backends = Backends::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(FileKeyValueStore::new(config.data_dir)),
        );
        let sync = Arc::new(ClosetSync::new(backends));

        Ok(Self::new(intake, stylist, sync, config.checkout))
    }

    pub fn sync(&self) -> &Arc<ClosetSync> {
        &self.sync
    }

    /// Load the closet for `identity`.
    pub async fn switch_identity(&self, identity: Identity) -> Result<()> {
        let label = identity.to_string();
        self.sync
            .switch_identity(identity)
            .await
            .with_context(|| format!("Failed to load closet for {label}"))
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Run the intake pipeline on `image` and store the result.
    ///
    /// Returns once the item has been written to the active backend.
    #[instrument(skip_all)]
    pub async fn add_item_from_image(&self, image: ImagePayload) -> Result<ClothingItem> {
        let start = Instant::now();
        let gender = self.sync.preferences().gender;

        let item = self.intake.process(&image, gender).await;
        self.sync
            .add_item(item.clone())
            .await
            .context("Item write task failed")?;

        info!(
            item_id = %item.id,
            "Added {} / {} in {:.2?}",
            item.category,
            item.sub_category,
            start.elapsed()
        );
        Ok(item)
    }

    pub async fn remove_item(&self, id: &str) -> Result<ClothingItem> {
        let item = self.sync.item(id).ok_or_else(|| ClosetError::MissingReference {
            entity: "item".to_string(),
            id: id.to_string(),
        })?;
        if let Some(write) = self.sync.remove_item(id) {
            write.await.context("Item removal task failed")?;
        }
        Ok(item)
    }

    pub fn list_items(&self) -> Vec<ClothingItem> {
        self.sync.items()
    }

    /// Tag an image without storing anything.
    pub async fn tag_image(&self, image: &ImagePayload) -> ItemClassification {
        let gender = self.sync.preferences().gender;
        self.intake.tagger().tag_clothing_item(image, gender).await
    }

    /// Remove an image's background without storing anything.
    pub async fn remove_background(&self, image: &ImagePayload) -> ImagePayload {
        self.intake.remover().remove_background(image).await
    }

    // ========================================================================
    // Outfits
    // ========================================================================

    /// Ask for an outfit using the live closet, saved inspirations and
    /// preferences.
    #[instrument(skip_all, fields(use_catalog = options.use_catalog))]
    pub async fn suggest_outfit(&self, options: SuggestOptions) -> Result<OutfitSuggestion> {
        let snapshot = self.sync.snapshot();

        let mut request = OutfitRequest::new()
            .with_liked_outfits(snapshot.inspirations)
            .with_preferences(snapshot.preferences);
        if options.use_catalog {
            request = request.with_catalog(snapshot.catalog.into());
        }
        if let Some(coordinates) = options.coordinates {
            request = request.with_coordinates(coordinates);
        }
        if let Some(occasion) = options.occasion {
            request = request.with_occasion(occasion);
        }

        let suggestion = self.stylist.generate_outfit_idea(&request).await?;
        Ok(suggestion)
    }

    pub async fn save_inspiration(&self, suggestion: &OutfitSuggestion) -> Result<Inspiration> {
        let (inspiration, write) = self.sync.save_inspiration(suggestion);
        write.await.context("Inspiration write task failed")?;
        Ok(inspiration)
    }

    pub fn list_inspirations(&self) -> Vec<Inspiration> {
        self.sync.inspirations()
    }

    // ========================================================================
    // Preferences and checkout
    // ========================================================================

    pub fn preferences(&self) -> UserPreferences {
        self.sync.preferences()
    }

    /// Merge `patch` into the preferences and return the result.
    pub async fn update_preferences(&self, patch: PreferencesPatch) -> Result<UserPreferences> {
        if patch.is_empty() {
            return Ok(self.preferences());
        }
        self.sync
            .update_preferences(patch)
            .await
            .context("Preferences write task failed")?;
        Ok(self.preferences())
    }

    pub fn checkout_url(&self, plan: Plan, reference_id: &str) -> Result<String> {
        let url = self.checkout.checkout_url(plan, reference_id)?;
        Ok(url)
    }
}
