use serde_json::{json, Value};
use sitestack_lib::{get_att, CfnResource, PropertyOverride};

pub mod invalidation;
mod s3_website_distribution;

pub use invalidation::{CloudFrontInvalidator, InvalidationError, Invalidator, INVALIDATE_ALL};
pub use s3_website_distribution::S3WebsiteDistribution;

/// the hosted zone id that every cloudfront distribution lives in.
/// Alias records pointing at a distribution must use this.
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// managed "CachingOptimized" cache policy.
/// https://docs.aws.amazon.com/AmazonCloudFront/latest/DeveloperGuide/using-managed-cache-policies.html#managed-cache-caching-optimized
pub const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

pub const DEFAULT_ORIGIN_ID: &str = "origin1";
pub const MINIMUM_TLS_VERSION: &str = "TLSv1.2_2021";

/// where the origin access control id is written inside the distribution's properties.
pub const ORIGIN_ACCESS_CONTROL_PATH: &str = "DistributionConfig.Origins.0.OriginAccessControlId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerProtocolPolicy {
    AllowAll,
    #[default]
    RedirectToHttps,
    HttpsOnly,
}

impl ViewerProtocolPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewerProtocolPolicy::AllowAll => "allow-all",
            ViewerProtocolPolicy::RedirectToHttps => "redirect-to-https",
            ViewerProtocolPolicy::HttpsOnly => "https-only",
        }
    }
}

/// rewrites an origin error into a different response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error_code: u16,
    pub response_code: u16,
    pub response_page_path: String,
    /// seconds
    pub error_caching_min_ttl: u64,
}

impl ErrorResponse {
    pub(crate) fn to_value(&self) -> Value {
        json!({
            "ErrorCode": self.error_code,
            "ResponseCode": self.response_code,
            "ResponsePagePath": self.response_page_path,
            "ErrorCachingMinTTL": self.error_caching_min_ttl,
        })
    }
}

/// a private bucket answers 403 for keys that don't exist. Serving the index
/// instead lets a single page app handle its own routes.
pub fn spa_error_responses(index_document: &str) -> Vec<ErrorResponse> {
    vec![ErrorResponse {
        error_code: 403,
        response_code: 200,
        response_page_path: format!("/{}", index_document.trim_start_matches('/')),
        error_caching_min_ttl: 60,
    }]
}

/// lets a distribution sign its requests to a private S3 origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginAccessControl {
    /// must be unique within the account.
    pub name: String,
    pub description: Option<String>,
}

impl CfnResource for OriginAccessControl {
    fn type_string(&self) -> &'static str {
        "AWS::CloudFront::OriginAccessControl"
    }

    fn properties(&self) -> Value {
        let mut config = json!({
            "Name": self.name,
            "OriginAccessControlOriginType": "s3",
            "SigningBehavior": "always",
            "SigningProtocol": "sigv4",
        });
        if let Some(description) = &self.description {
            config["Description"] = json!(description);
        }
        json!({ "OriginAccessControlConfig": config })
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.name.len() > 64 {
            return Err(format!("Invalid origin access control name {:?}\nMust be between 1 and 64 characters", self.name));
        }
        Ok(())
    }
}

/// the distribution's origin is written without an origin access control.
/// This patches the id of `oac_logical_id` into it after synthesis.
pub fn attach_origin_access_control(distribution_logical_id: &str, oac_logical_id: &str) -> PropertyOverride {
    PropertyOverride::new(distribution_logical_id, ORIGIN_ACCESS_CONTROL_PATH, get_att(oac_logical_id, "Id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitestack_lib::Template;

    #[test]
    fn origin_access_control_signs_s3_requests() {
        let oac = OriginAccessControl { name: "StaticWebOriginAccessControl".into(), description: None };
        let props = oac.properties();
        assert_eq!(props["OriginAccessControlConfig"]["OriginAccessControlOriginType"], "s3");
        assert_eq!(props["OriginAccessControlConfig"]["SigningBehavior"], "always");
        assert_eq!(props["OriginAccessControlConfig"]["SigningProtocol"], "sigv4");
        assert!(props["OriginAccessControlConfig"].get("Description").is_none());
        assert!(OriginAccessControl { name: "x".repeat(65), description: None }.validate().is_err());
    }

    #[test]
    fn spa_errors_point_at_the_index() {
        let responses = spa_error_responses("/index.html");
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].response_page_path, "/index.html");
        assert_eq!(responses[0].error_code, 403);
        assert_eq!(responses[0].response_code, 200);
        assert_eq!(responses[0].error_caching_min_ttl, 60);
    }

    #[test]
    fn oac_override_lands_on_first_origin() {
        let distribution = S3WebsiteDistribution::new("Bucket", "Cert", vec!["example.com".into()]);
        let mut template = Template::default();
        template.resources.insert("Dist".into(), sitestack_lib::Resource::new("Dist", distribution).to_saved());
        attach_origin_access_control("Dist", "Oac").apply(&mut template).unwrap();
        let origin = &template.resources["Dist"].properties["DistributionConfig"]["Origins"][0];
        assert_eq!(origin["OriginAccessControlId"], get_att("Oac", "Id"));
        assert_eq!(origin["Id"], DEFAULT_ORIGIN_ID);
    }
}
