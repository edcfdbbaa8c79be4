//! Server crate for the closet assistant.
//!
//! This crate contains the outfit generator, configuration, checkout links
//! and the [`ClosetService`] façade that coordinates every component.

pub mod checkout;
pub mod config;
pub mod orchestrator;
pub mod prompt;
pub mod stylist;

pub use checkout::{CheckoutError, CheckoutLinks, Plan};
pub use config::{AppConfig, ConfigError};
pub use orchestrator::{ClosetService, SuggestOptions};
pub use prompt::{ItemSnapshot, PromptContext, build_outfit_prompt, snapshot_catalog};
pub use stylist::{
    OutfitGenerator, OutfitRequest, StylistError, WEATHER_NOT_PROVIDED, WEATHER_UNAVAILABLE,
    fallback_suggestion,
};
