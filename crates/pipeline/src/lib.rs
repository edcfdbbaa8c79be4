//! Intake pipeline for new clothing photos.
//!
//! This crate provides:
//! - [`BackgroundRemover`] for the upload → submit → poll → download workflow
//! - [`ItemTagger`] for model-based classification
//! - [`IntakePipeline`] composing the two
//! - [`PollPolicy`] / [`poll_until`], the bounded polling primitive
//!
//! ## Architecture
//! A photo moves through the pipeline in stages:
//! 1. Its background is removed by a hosted inference job (fallback: original photo)
//! 2. The cleaned image is shrunk and re-encoded as PNG under a byte ceiling
//! 3. A generative model tags it (fallback: "unknown" classification)
//!
//! Neither stage returns an error to the caller. [`IntakeError`] only shows
//! up in the `try_*` variants and in fallback log lines.
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{BackgroundRemover, IntakePipeline, ItemTagger};
//!
//! let remover = BackgroundRemover::new(store, replicate);
//! let tagger = ItemTagger::new(gemini);
//! let intake = IntakePipeline::new(remover, tagger);
//!
//! let item = intake.process(&photo, Some(Gender::Female)).await;
//! catalog.insert(item);
//! ```

pub mod background;
pub mod error;
pub mod image_ops;
pub mod intake;
pub mod polling;
pub mod tagging;

// Re-export main types
pub use background::{BackgroundRemover, UPLOAD_PREFIX};
pub use error::{IntakeError, Result};
pub use image_ops::{ImageLimits, MAX_DIMENSION, MAX_PAYLOAD_BYTES, fit_and_encode_png};
pub use intake::IntakePipeline;
pub use polling::{PollOutcome, PollPolicy, poll_until};
pub use tagging::{ItemTagger, tagging_prompt};
