//! Error types for the intake pipeline.
//!
//! These errors never leave the pipeline's public workflows: the
//! background-removal and tagging entry points catch them and return their
//! documented fallbacks. They exist so the fallback log line says *why*.

use closet_model::ClosetError;
use providers::{JobState, ProviderError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid image payload: {0}")]
    Payload(#[from] ClosetError),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Inference job ended in state {state:?}: {reason}")]
    JobFailed { state: JobState, reason: String },

    #[error("Inference job did not finish after {attempts} status checks")]
    TimedOut { attempts: u32 },

    #[error("Inference job succeeded without an output image")]
    NoOutput,

    #[error("Encoded image is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Image worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
