use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sitestack_lib::validate_stack_name;

use crate::SiteError;

pub const DEFAULT_BUILD_OUTPUT_PATH: &str = "../frontend/dist";
pub const CONFIG_FILE_NAME: &str = "site.toml";

fn default_build_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_BUILD_OUTPUT_PATH)
}

fn default_region() -> String {
    aws_regions::CLOUDFRONT_CERTIFICATE_REGION.to_string()
}

fn default_true() -> bool {
    true
}

/// everything a site declaration is derived from. Usually read from `site.toml`:
///
/// ```toml
/// stack_id = "IacStack"
/// root_domain = "example.com"
/// build_output_path = "../frontend/dist"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// names the stack, and is folded into the bucket name and logical ids.
    pub stack_id: String,
    /// the site is served on this name and on `www.` plus this name.
    pub root_domain: String,
    #[serde(default = "default_build_output_path")]
    pub build_output_path: PathBuf,
    #[serde(default = "default_region")]
    pub region: String,
    /// defaults to the managed CachingOptimized policy.
    #[serde(default)]
    pub cache_policy_id: Option<String>,
    /// skips the hosted zone lookup when set.
    #[serde(default)]
    pub hosted_zone_id: Option<String>,
    /// delete objects from the bucket that are no longer in the build output.
    #[serde(default = "default_true")]
    pub prune: bool,
}

impl SiteConfig {
    pub fn new<S1: Into<String>, S2: Into<String>>(stack_id: S1, root_domain: S2) -> Self {
        Self {
            stack_id: stack_id.into(),
            root_domain: root_domain.into(),
            build_output_path: default_build_output_path(),
            region: default_region(),
            cache_policy_id: None,
            hosted_zone_id: None,
            prune: true,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, SiteError> {
        let config: Self = toml::from_str(s).map_err(|source| SiteError::ConfigParse {
            path: PathBuf::from(CONFIG_FILE_NAME),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// reads and validates a config file. A relative `build_output_path`
    /// is resolved against the directory the file lives in.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SiteError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|source| SiteError::Io { path: path.to_path_buf(), source })?;
        let mut config: Self = toml::from_str(&data)
            .map_err(|source| SiteError::ConfigParse { path: path.to_path_buf(), source })?;
        if config.build_output_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.build_output_path = dir.join(&config.build_output_path);
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn www_domain(&self) -> String {
        format!("www.{}", self.root_domain)
    }

    /// the root domain first, then `www.`
    pub fn domains(&self) -> [String; 2] {
        [self.root_domain.clone(), self.www_domain()]
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_id
    }

    pub fn validate(&self) -> Result<(), SiteError> {
        validate_stack_name(&self.stack_id)?;
        if self.root_domain.contains('*') {
            return Err(SiteError::InvalidConfig(format!("root_domain {} cannot be a wildcard", self.root_domain)));
        }
        aws_acm_cert::verify_domain_name(&self.root_domain).map_err(SiteError::InvalidConfig)?;
        aws_regions::verify_cloudfront_certificate_region(&self.region)?;
        if let Some(id) = &self.cache_policy_id {
            if id.trim().is_empty() {
                return Err(SiteError::InvalidConfig("cache_policy_id cannot be empty".into()));
            }
        }
        Ok(())
    }
}
