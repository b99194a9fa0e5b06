use std::path::PathBuf;

use aws_cfn_stack::StackOutputs;
use aws_cloudfront_distribution::{Invalidator, INVALIDATE_ALL};
use aws_s3::{upload_assets, AssetManifest, ObjectStore};
use sitestack_lib::ActionNode;
use tracing::info;
use uuid::Uuid;

use super::{OUTPUT_BUCKET_NAME, OUTPUT_DISTRIBUTION_ID};
use crate::SiteError;

/// copies the build output into the bucket, then invalidates the
/// distribution so the new assets are served right away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketDeployment {
    pub name: String,
    pub source: PathBuf,
    pub bucket_logical_id: String,
    pub distribution_logical_id: String,
    pub invalidation_paths: Vec<String>,
    pub prune: bool,
}

/// physical ids the deployment writes to, read from the stack outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTargets {
    pub bucket_name: String,
    pub distribution_id: String,
}

impl DeploymentTargets {
    pub fn from_outputs(outputs: &StackOutputs) -> Result<Self, SiteError> {
        let get = |key: &str| outputs.get(key)
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| SiteError::MissingOutput(key.to_string()));
        Ok(Self {
            bucket_name: get(OUTPUT_BUCKET_NAME)?,
            distribution_id: get(OUTPUT_DISTRIBUTION_ID)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    pub uploaded: usize,
    pub deleted: usize,
    pub caller_reference: String,
    pub invalidation_location: Option<String>,
}

impl BucketDeployment {
    pub fn new<S1: Into<String>, S2: Into<String>, S3: Into<String>>(
        name: S1,
        source: PathBuf,
        bucket_logical_id: S2,
        distribution_logical_id: S3,
        prune: bool,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            bucket_logical_id: bucket_logical_id.into(),
            distribution_logical_id: distribution_logical_id.into(),
            invalidation_paths: vec![INVALIDATE_ALL.to_string()],
            prune,
        }
    }

    /// runs only once both the bucket and the distribution exist.
    pub fn action_node(&self) -> ActionNode {
        ActionNode {
            name: self.name.clone(),
            depends_on: vec![self.bucket_logical_id.clone(), self.distribution_logical_id.clone()],
        }
    }

    /// unique per call. Cloudfront ignores a reused reference, and a
    /// redeploy of an earlier build still has to evict what is cached now.
    pub fn caller_reference(&self, manifest: &AssetManifest) -> String {
        format!("{}-{}-{}", self.name, manifest.fingerprint(), Uuid::new_v4().simple())
    }

    pub fn manifest(&self) -> Result<AssetManifest, SiteError> {
        Ok(AssetManifest::scan(&self.source)?)
    }

    pub async fn run(
        &self,
        store: &dyn ObjectStore,
        invalidator: &dyn Invalidator,
        outputs: &StackOutputs,
    ) -> Result<DeploymentReport, SiteError> {
        let targets = DeploymentTargets::from_outputs(outputs)?;
        let manifest = self.manifest()?;
        info!(
            source = ?self.source,
            files = manifest.files.len(),
            bytes = manifest.total_size(),
            bucket = %targets.bucket_name,
            "publishing assets"
        );
        let uploaded = upload_assets(store, &targets.bucket_name, &manifest, self.prune).await?;

        let caller_reference = self.caller_reference(&manifest);
        let invalidation_location = invalidator
            .create_invalidation(&targets.distribution_id, &self.invalidation_paths, &caller_reference)
            .await?;
        Ok(DeploymentReport {
            uploaded: uploaded.uploaded,
            deleted: uploaded.deleted,
            caller_reference,
            invalidation_location,
        })
    }
}
