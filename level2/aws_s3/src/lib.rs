use serde_json::{json, Value};
use sitestack_lib::{get_ref, sub, verify_resource_name, CfnResource};

pub mod assets;

pub use assets::{
    content_type_for, upload_assets, AssetError, AssetFile, AssetManifest, ObjectStore, S3ObjectStore,
    UploadReport, DELETE_BATCH_SIZE,
};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const CLOUDFRONT_SERVICE_PRINCIPAL: &str = "cloudfront.amazonaws.com";
pub const DEFAULT_INDEX_DOCUMENT: &str = "index.html";

/// a private bucket that holds the built site. Every public access
/// path is blocked, objects are only ever read by the distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteBucket {
    /// physical name of the S3 bucket. Must be globally unique.
    pub bucket_name: String,
    pub index_document: String,
}

impl WebsiteBucket {
    pub fn new<S: Into<String>>(bucket_name: S) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            index_document: DEFAULT_INDEX_DOCUMENT.to_string(),
        }
    }
}

impl CfnResource for WebsiteBucket {
    fn type_string(&self) -> &'static str {
        "AWS::S3::Bucket"
    }

    fn properties(&self) -> Value {
        json!({
            "BucketName": self.bucket_name,
            "WebsiteConfiguration": {
                "IndexDocument": self.index_document,
            },
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true,
            },
        })
    }

    fn validate(&self) -> Result<(), String> {
        verify_bucket_name(&self.bucket_name)?;
        if self.index_document.is_empty() {
            return Err("Index document cannot be empty".into());
        }
        Ok(())
    }
}

pub fn verify_bucket_name(bucket_name: &str) -> Result<(), String> {
    if bucket_name.len() > 63 || bucket_name.len() < 3 {
        return Err(format!("Invalid bucket name {:?}\nMust be between 3 and 63 characters", bucket_name));
    }
    let valid_char_check = |c: char| -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-'
    };
    if !bucket_name.chars().all(valid_char_check) {
        return Err(format!("Invalid bucket name {:?}\nMay only contain lowercase letters, numbers, dots, and dashes", bucket_name));
    }
    let first_ok = bucket_name.chars().next().map(|c| c.is_ascii_alphanumeric()).unwrap_or(false);
    let last_ok = bucket_name.chars().last().map(|c| c.is_ascii_alphanumeric()).unwrap_or(false);
    if !first_ok || !last_ok {
        return Err(format!("Invalid bucket name {:?}\nFirst and last character must be either a lowercase letter or a number", bucket_name));
    }
    if bucket_name.contains("..") {
        return Err(format!("Invalid bucket name {:?}\nMay not contain two consecutive dots", bucket_name));
    }
    Ok(())
}

/// a policy document with one entry per (effect, action, resource, principal) tuple.
/// Conditions are attached separately.
pub fn create_policy_doc(statements: &[(&str, &str, Value, Value)]) -> Value {
    let statements: Vec<Value> = statements.iter()
        .map(|(effect, action, resource, principal)| json!({
            "Effect": effect,
            "Action": action,
            "Resource": resource,
            "Principal": principal,
        }))
        .collect();
    json!({
        "Version": POLICY_VERSION,
        "Statement": statements,
    })
}

/// ARN of a distribution as cloudformation will render it at deploy time.
pub fn distribution_source_arn(distribution_logical_id: &str) -> Value {
    sub(format!("arn:aws:cloudfront::${{AWS::AccountId}}:distribution/${{{distribution_logical_id}}}"))
}

/// same as [`distribution_source_arn`] but for already known physical values.
pub fn resolved_distribution_source_arn(account_id: &str, distribution_id: &str) -> String {
    format!("arn:aws:cloudfront::{account_id}:distribution/{distribution_id}")
}

/// grants `s3:GetObject` on every object in the bucket to the cloudfront service
/// principal, but only when the request comes from one specific distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionReadPolicy {
    pub bucket_logical_id: String,
    pub distribution_logical_id: String,
}

impl DistributionReadPolicy {
    pub fn new<S1: Into<String>, S2: Into<String>>(bucket_logical_id: S1, distribution_logical_id: S2) -> Self {
        Self {
            bucket_logical_id: bucket_logical_id.into(),
            distribution_logical_id: distribution_logical_id.into(),
        }
    }

    pub fn policy_document(&self) -> Value {
        let objects = sub(format!("${{{}.Arn}}/*", self.bucket_logical_id));
        let mut doc = create_policy_doc(&[(
            "Allow",
            "s3:GetObject",
            objects,
            json!({ "Service": CLOUDFRONT_SERVICE_PRINCIPAL }),
        )]);
        if let Some(statement) = doc["Statement"].get_mut(0) {
            statement["Condition"] = json!({
                "StringEquals": {
                    "AWS:SourceArn": distribution_source_arn(&self.distribution_logical_id),
                }
            });
        }
        doc
    }
}

impl CfnResource for DistributionReadPolicy {
    fn type_string(&self) -> &'static str {
        "AWS::S3::BucketPolicy"
    }

    fn properties(&self) -> Value {
        json!({
            "Bucket": get_ref(&self.bucket_logical_id),
            "PolicyDocument": self.policy_document(),
        })
    }

    fn validate(&self) -> Result<(), String> {
        // logical ids are strictly alphanumeric, so a wildcard
        // source ARN can never be produced from them.
        verify_resource_name(&self.bucket_logical_id).map_err(|e| e.to_string())?;
        verify_resource_name(&self.distribution_logical_id).map_err(|e| e.to_string())?;
        Ok(())
    }
}
