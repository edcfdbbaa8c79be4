//! Background removal via an asynchronous inference job.
//!
//! ## Algorithm
//! 1. Upload the input image to object storage under a fresh key
//! 2. Submit an inference job pointing at the public URL
//! 3. Poll the job's status URL under a [`PollPolicy`]
//! 4. Download the produced image, shrink and re-encode it as PNG
//! 5. Reject results over the byte ceiling
//!
//! Any failure along the way means "keep the original image". The caller
//! never sees an error from [`BackgroundRemover::remove_background`].

use std::sync::Arc;
use std::time::Instant;

use closet_model::ImagePayload;
use providers::{BackgroundRemovalProvider, JobState, JobStatus, ObjectStore};
use tracing::{debug, info, instrument, warn};

use crate::error::{IntakeError, Result};
use crate::image_ops::{ImageLimits, fit_and_encode_png};
use crate::polling::{PollOutcome, PollPolicy, poll_until};

/// Key prefix for uploaded intake images
pub const UPLOAD_PREFIX: &str = "closet-uploads";

/// Removes image backgrounds, falling back to the input on any failure.
#[derive(Clone)]
pub struct BackgroundRemover {
    store: Arc<dyn ObjectStore>,
    provider: Arc<dyn BackgroundRemovalProvider>,
    policy: PollPolicy,
    limits: ImageLimits,
}

impl BackgroundRemover {
    /// Create a remover with the default poll policy and image limits.
    pub fn new(store: Arc<dyn ObjectStore>, provider: Arc<dyn BackgroundRemovalProvider>) -> Self {
        Self {
            store,
            provider,
            policy: PollPolicy::default(),
            limits: ImageLimits::default(),
        }
    }

    /// Configure the status polling schedule (default: 20 × 1.5 s)
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Configure the size bounds for produced images
    pub fn with_limits(mut self, limits: ImageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Remove the background from `image`.
    ///
    /// Returns either a PNG no larger than the configured ceiling, or a
    /// clone of `image` itself.
    #[instrument(skip_all, fields(input = %image))]
    pub async fn remove_background(&self, image: &ImagePayload) -> ImagePayload {
        let start = Instant::now();
        match self.try_remove_background(image).await {
            Ok(result) => {
                info!(
                    output_bytes = result.len(),
                    "Background removed in {:.2?}",
                    start.elapsed()
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "Background removal failed, keeping original image");
                image.clone()
            }
        }
    }

    /// The fallible workflow behind [`remove_background`](Self::remove_background).
    pub async fn try_remove_background(&self, image: &ImagePayload) -> Result<ImagePayload> {
        // Step 1: upload
        let key = format!(
            "{UPLOAD_PREFIX}/{}.{}",
            uuid::Uuid::new_v4(),
            image.extension()
        );
        let public_url = self
            .store
            .put(&key, image.decode()?, image.mime_type(), true)
            .await?;
        debug!(%key, "Uploaded input image");

        // Step 2: submit
        let job = self.provider.submit(&public_url).await?;
        debug!(job_id = %job.id, "Inference job submitted");

        // Step 3: poll
        let status = self.wait_for_job(&job).await?;
        let output_url = status.first_output().ok_or(IntakeError::NoOutput)?;

        // Step 4: download and re-encode off the async threads
        let produced = self.provider.download(output_url).await?;
        let limits = self.limits;
        let payload =
            tokio::task::spawn_blocking(move || fit_and_encode_png(&produced, &limits)).await??;

        Ok(payload)
    }

    /// Poll until the job succeeds; failure, cancellation and timeout are errors.
    async fn wait_for_job(&self, job: &providers::InferenceJob) -> Result<JobStatus> {
        let provider = self.provider.as_ref();
        let outcome = poll_until(
            &self.policy,
            move |_attempt| provider.status(job),
            |status: &JobStatus| status.state.is_terminal(),
        )
        .await?;

        match outcome {
            PollOutcome::Completed { value, attempts } if value.state == JobState::Succeeded => {
                debug!(attempts, "Inference job succeeded");
                Ok(value)
            }
            PollOutcome::Completed { value, .. } => Err(IntakeError::JobFailed {
                state: value.state,
                reason: value.error.unwrap_or_else(|| "no error message".to_string()),
            }),
            PollOutcome::TimedOut { attempts, .. } => Err(IntakeError::TimedOut { attempts }),
        }
    }
}
