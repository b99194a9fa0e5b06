use async_trait::async_trait;
use aws_sdk_cloudfront::error::DisplayErrorContext;
use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};
use thiserror::Error;
use tracing::info;

/// every path the distribution serves.
pub const INVALIDATE_ALL: &str = "/*";

#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("Invalid invalidation request for {distribution_id}\n{message}")]
    Build { distribution_id: String, message: String },
    #[error("Failed to create invalidation for {distribution_id}\n{message}")]
    Create { distribution_id: String, message: String },
}

/// evicts paths from every edge cache of a distribution.
#[async_trait]
pub trait Invalidator: Send + Sync {
    /// cloudfront treats a repeated `caller_reference` as the same request
    /// and creates nothing, so callers pass a fresh one per deployment.
    /// Returns the location of the created invalidation, if cloudfront gave one.
    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> Result<Option<String>, InvalidationError>;
}

pub struct CloudFrontInvalidator {
    client: aws_sdk_cloudfront::Client,
}

impl CloudFrontInvalidator {
    pub fn new(client: aws_sdk_cloudfront::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Invalidator for CloudFrontInvalidator {
    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> Result<Option<String>, InvalidationError> {
        let build_err = |message: String| InvalidationError::Build {
            distribution_id: distribution_id.to_string(),
            message,
        };
        let paths = Paths::builder()
            .quantity(paths.len() as i32)
            .set_items(Some(paths.to_vec()))
            .build()
            .map_err(|e| build_err(e.to_string()))?;
        let batch = InvalidationBatch::builder()
            .paths(paths)
            .caller_reference(caller_reference)
            .build()
            .map_err(|e| build_err(e.to_string()))?;

        let output = self.client.create_invalidation()
            .distribution_id(distribution_id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(|e| InvalidationError::Create {
                distribution_id: distribution_id.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        let location = output.location().map(str::to_string);
        info!(distribution_id, caller_reference, ?location, "invalidation created");
        Ok(location)
    }
}
