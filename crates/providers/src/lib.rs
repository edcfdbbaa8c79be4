//! Clients for the hosted services the closet depends on.
//!
//! This crate provides thin, typed wrappers over four HTTP APIs:
//! - a vision-capable generative model (Gemini `generateContent`)
//! - a background-removal inference service (Replicate predictions)
//! - public-read object storage (S3-style `PUT`)
//! - point weather lookup (OpenWeatherMap)
//!
//! Each one sits behind a trait so workflows can be exercised against fakes.
//! None of these clients retry or fall back; that policy belongs to the
//! callers in the `pipeline` and `server` crates.

pub mod error;
pub mod http;
pub mod inference;
pub mod model;
pub mod storage;
pub mod weather;

pub use error::{ProviderError, Result};
pub use http::build_http_client;
pub use inference::{
    BackgroundRemovalProvider, InferenceJob, JobState, JobStatus, ReplicateClient,
    ReplicateConfig,
};
pub use model::{GeminiClient, GeminiConfig, GenerativeModel};
pub use storage::{HttpObjectStore, ObjectStore, StorageConfig};
pub use weather::{OpenWeatherClient, OpenWeatherConfig, WeatherLookup};
