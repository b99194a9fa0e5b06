//! Declares a static website on AWS: a private S3 bucket behind a
//! CloudFront distribution, served over https on a domain and its `www`
//! subdomain, plus the step that publishes built assets into it.
//!
//! The declaration is synthesized into a CloudFormation template by
//! [`StaticWebsite::synthesize`]. Deploying that template and running the
//! [`BucketDeployment`] is left to the caller (see `sitestack_cli`).

use std::path::PathBuf;

use thiserror::Error;

pub mod config;
pub mod context;
pub mod resources;

#[cfg(test)]
mod module_testing;

pub use config::SiteConfig;
pub use context::{resolve_hosted_zone, LookupContext, CONTEXT_FILE_NAME};
pub use resources::*;

pub use aws_cfn_stack::{StackDeployer, StackOutputs};
pub use aws_cloudfront_distribution::{CloudFrontInvalidator, Invalidator};
pub use aws_route53::{HostedZone, Route53ZoneLookup, ZoneLookup};
pub use aws_s3::{ObjectStore, S3ObjectStore};
pub use sitestack_lib::{diff_templates, Template, TemplateDiff};

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Failed to read {path:?}\n{source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("Failed to parse {path:?}\n{source}")]
    ConfigParse { path: PathBuf, #[source] source: toml::de::Error },
    #[error("Invalid site config\n{0}")]
    InvalidConfig(String),
    #[error("Failed to parse lookup context {path:?}\n{source}")]
    Context { path: PathBuf, #[source] source: serde_json::Error },
    #[error("Stack outputs are missing '{0}'. Has the stack been deployed?")]
    MissingOutput(String),
    #[error(transparent)]
    Region(#[from] aws_regions::RegionError),
    #[error(transparent)]
    Stack(#[from] sitestack_lib::StackError),
    #[error(transparent)]
    Lookup(#[from] aws_route53::LookupError),
    #[error(transparent)]
    Asset(#[from] aws_s3::AssetError),
    #[error(transparent)]
    Invalidation(#[from] aws_cloudfront_distribution::InvalidationError),
    #[error(transparent)]
    Deploy(#[from] aws_cfn_stack::DeployError),
}
