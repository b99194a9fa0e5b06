use serde_json::{json, Value};
use sitestack_lib::{get_att, get_ref, CfnResource};

use crate::{ErrorResponse, ViewerProtocolPolicy, CACHING_OPTIMIZED_POLICY_ID, DEFAULT_ORIGIN_ID, MINIMUM_TLS_VERSION};

/// a distribution in front of a single private S3 bucket, served
/// over https on custom domains using an ACM certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3WebsiteDistribution {
    pub bucket_logical_id: String,
    pub certificate_logical_id: String,
    pub aliases: Vec<String>,
    pub default_root_object: String,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    pub cache_policy_id: String,
    pub error_responses: Vec<ErrorResponse>,
    pub price_class: String,
    pub enabled: bool,
}

impl S3WebsiteDistribution {
    pub fn new<S1: Into<String>, S2: Into<String>>(bucket_logical_id: S1, certificate_logical_id: S2, aliases: Vec<String>) -> Self {
        Self {
            bucket_logical_id: bucket_logical_id.into(),
            certificate_logical_id: certificate_logical_id.into(),
            aliases,
            default_root_object: "index.html".to_string(),
            viewer_protocol_policy: ViewerProtocolPolicy::default(),
            cache_policy_id: CACHING_OPTIMIZED_POLICY_ID.to_string(),
            error_responses: vec![],
            price_class: "PriceClass_100".to_string(),
            enabled: true,
        }
    }
}

impl CfnResource for S3WebsiteDistribution {
    fn type_string(&self) -> &'static str {
        "AWS::CloudFront::Distribution"
    }

    fn properties(&self) -> Value {
        // OriginAccessIdentity must be present (and empty) for an
        // s3 origin that is signed with an origin access control instead.
        let origin = json!({
            "Id": DEFAULT_ORIGIN_ID,
            "DomainName": get_att(&self.bucket_logical_id, "RegionalDomainName"),
            "S3OriginConfig": { "OriginAccessIdentity": "" },
        });
        let error_responses: Vec<Value> = self.error_responses.iter().map(ErrorResponse::to_value).collect();
        let mut config = json!({
            "Enabled": self.enabled,
            "Aliases": self.aliases,
            "DefaultRootObject": self.default_root_object,
            "Origins": [origin],
            "DefaultCacheBehavior": {
                "TargetOriginId": DEFAULT_ORIGIN_ID,
                "ViewerProtocolPolicy": self.viewer_protocol_policy.as_str(),
                "CachePolicyId": self.cache_policy_id,
                "Compress": true,
                "AllowedMethods": ["GET", "HEAD"],
                "CachedMethods": ["GET", "HEAD"],
            },
            "ViewerCertificate": {
                "AcmCertificateArn": get_ref(&self.certificate_logical_id),
                "SslSupportMethod": "sni-only",
                "MinimumProtocolVersion": MINIMUM_TLS_VERSION,
            },
            "HttpVersion": "http2",
            "IPV6Enabled": true,
            "PriceClass": self.price_class,
        });
        if !error_responses.is_empty() {
            config["CustomErrorResponses"] = Value::Array(error_responses);
        }
        json!({ "DistributionConfig": config })
    }

    fn validate(&self) -> Result<(), String> {
        if self.aliases.is_empty() {
            return Err("Distribution must have at least one alias to use a certificate".into());
        }
        if self.default_root_object.starts_with('/') {
            return Err(format!("Invalid default root object {:?}\nMust not start with '/'", self.default_root_object));
        }
        if self.cache_policy_id.is_empty() {
            return Err("Cache policy id cannot be empty".into());
        }
        for response in self.error_responses.iter() {
            if !(400..600).contains(&response.error_code) {
                return Err(format!("Invalid error code {}\nMust be a 4xx or 5xx status", response.error_code));
            }
            if !response.response_page_path.starts_with('/') {
                return Err(format!("Invalid response page path {:?}\nMust start with '/'", response.response_page_path));
            }
        }
        Ok(())
    }
}
