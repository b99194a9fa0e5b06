use std::collections::BTreeMap;

use aws_acm_cert::DnsValidatedCertificate;
use aws_cloudfront_distribution::{
    attach_origin_access_control, spa_error_responses, OriginAccessControl, S3WebsiteDistribution,
    CLOUDFRONT_HOSTED_ZONE_ID,
};
use aws_route53::{AliasRecord, HostedZone};
use aws_s3::{DistributionReadPolicy, WebsiteBucket};
use sitestack_lib::{
    get_att, get_ref, synthesize, Parameter, Resource, ResourceOutput, StackInput, Synthesized,
};
use tracing::info;

use super::{bucket_name_for, logical_id, BucketDeployment};
use crate::{SiteConfig, SiteError};

pub const HOSTED_ZONE_PARAMETER: &str = "HostedZoneId";
pub const HOSTED_ZONE_PARAMETER_TYPE: &str = "AWS::Route53::HostedZone::Id";
pub const OAC_NAME_PREFIX: &str = "StaticWebOriginAccessControl";

pub const OUTPUT_BUCKET_NAME: &str = "BucketName";
pub const OUTPUT_DISTRIBUTION_ID: &str = "DistributionId";
pub const OUTPUT_DISTRIBUTION_DOMAIN_NAME: &str = "DistributionDomainName";
pub const OUTPUT_CERTIFICATE_ARN: &str = "CertificateArn";

/// logical ids of everything a site declares. All derived from the stack id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalIds {
    pub hosted_zone: String,
    pub bucket: String,
    pub certificate: String,
    pub origin_access_control: String,
    pub distribution: String,
    pub bucket_policy: String,
    pub root_record: String,
    pub www_record: String,
    pub deployment: String,
}

impl LogicalIds {
    pub fn new(id: &str) -> Self {
        Self {
            hosted_zone: HOSTED_ZONE_PARAMETER.to_string(),
            bucket: logical_id("Bucket", id),
            certificate: logical_id("Certificate", id),
            origin_access_control: logical_id("OriginAccessControl", id),
            distribution: logical_id("Distribution", id),
            bucket_policy: logical_id("BucketPolicy", id),
            root_record: logical_id("RootRecord", id),
            www_record: logical_id("WwwRecord", id),
            deployment: logical_id("BucketDeployment", id),
        }
    }
}

/// a synthesized site, ready to deploy.
#[derive(Debug, Clone)]
pub struct SitePlan {
    pub synthesized: Synthesized,
    pub deployment: BucketDeployment,
    /// values passed for the template parameters on deploy.
    pub parameters: BTreeMap<String, String>,
}

impl SitePlan {
    pub fn stack_name(&self) -> &str {
        &self.synthesized.stack_name
    }

    pub fn template_body(&self) -> Result<String, serde_json::Error> {
        self.synthesized.template_body()
    }
}

/// the full topology of one site: bucket, certificate, distribution,
/// bucket policy, both alias records, and the asset deployment.
#[derive(Debug, Clone)]
pub struct StaticWebsite {
    config: SiteConfig,
    hosted_zone: HostedZone,
    ids: LogicalIds,
}

impl StaticWebsite {
    pub fn new(config: SiteConfig, hosted_zone: HostedZone) -> Result<Self, SiteError> {
        config.validate()?;
        if hosted_zone.id.is_empty() {
            return Err(SiteError::InvalidConfig(format!("Hosted zone for {} has no id", config.root_domain)));
        }
        let ids = LogicalIds::new(&config.stack_id);
        Ok(Self { config, hosted_zone, ids })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn ids(&self) -> &LogicalIds {
        &self.ids
    }

    pub fn hosted_zone(&self) -> &HostedZone {
        &self.hosted_zone
    }

    pub fn bucket(&self) -> WebsiteBucket {
        WebsiteBucket::new(bucket_name_for(&self.config.stack_id))
    }

    pub fn certificate(&self) -> DnsValidatedCertificate {
        DnsValidatedCertificate {
            domain_name: self.config.root_domain.clone(),
            subject_alternative_names: vec![self.config.www_domain()],
            hosted_zone_id: get_ref(&self.ids.hosted_zone),
            name: Some(format!("Certificate-{}", self.config.stack_id)),
        }
    }

    /// OAC names are unique per account, so the stack id is part of it.
    pub fn origin_access_control(&self) -> OriginAccessControl {
        OriginAccessControl {
            name: format!("{OAC_NAME_PREFIX}{}", self.config.stack_id),
            description: Some(format!("Signs requests from the {} distribution to its bucket", self.config.root_domain)),
        }
    }

    pub fn distribution(&self) -> S3WebsiteDistribution {
        let bucket = self.bucket();
        let mut distribution = S3WebsiteDistribution::new(
            &self.ids.bucket,
            &self.ids.certificate,
            self.config.domains().to_vec(),
        );
        distribution.error_responses = spa_error_responses(&bucket.index_document);
        distribution.default_root_object = bucket.index_document;
        if let Some(id) = &self.config.cache_policy_id {
            distribution.cache_policy_id = id.clone();
        }
        distribution
    }

    pub fn bucket_policy(&self) -> DistributionReadPolicy {
        DistributionReadPolicy::new(&self.ids.bucket, &self.ids.distribution)
    }

    /// root first, then www.
    pub fn records(&self) -> [(String, AliasRecord); 2] {
        let record = |name: String| AliasRecord {
            name,
            hosted_zone_id: get_ref(&self.ids.hosted_zone),
            target_dns_name: get_att(&self.ids.distribution, "DomainName"),
            target_hosted_zone_id: CLOUDFRONT_HOSTED_ZONE_ID.to_string(),
        };
        [
            (self.ids.root_record.clone(), record(self.config.root_domain.clone())),
            (self.ids.www_record.clone(), record(self.config.www_domain())),
        ]
    }

    pub fn deployment(&self) -> BucketDeployment {
        BucketDeployment::new(
            &self.ids.deployment,
            self.config.build_output_path.clone(),
            &self.ids.bucket,
            &self.ids.distribution,
            self.config.prune,
        )
    }

    fn outputs(&self) -> BTreeMap<String, ResourceOutput> {
        let mut outputs = BTreeMap::new();
        outputs.insert(OUTPUT_BUCKET_NAME.to_string(), ResourceOutput::new(
            "Bucket holding the site assets",
            get_ref(&self.ids.bucket),
        ));
        outputs.insert(OUTPUT_DISTRIBUTION_ID.to_string(), ResourceOutput::new(
            "Distribution serving the site",
            get_ref(&self.ids.distribution),
        ));
        outputs.insert(OUTPUT_DISTRIBUTION_DOMAIN_NAME.to_string(), ResourceOutput::new(
            "Domain name of the distribution",
            get_att(&self.ids.distribution, "DomainName"),
        ));
        outputs.insert(OUTPUT_CERTIFICATE_ARN.to_string(), ResourceOutput::new(
            "Viewer certificate of the distribution",
            get_ref(&self.ids.certificate),
        ));
        outputs
    }

    /// the stack as written, before synthesis. Resources are listed in
    /// no particular order, the apply order comes from their references.
    pub fn declare(&self) -> StackInput {
        let ids = &self.ids;
        let mut parameters = BTreeMap::new();
        parameters.insert(ids.hosted_zone.clone(), Parameter {
            ty: HOSTED_ZONE_PARAMETER_TYPE.to_string(),
            default: Some(self.hosted_zone.id.clone()),
            description: Some(format!("Existing hosted zone of {}", self.config.root_domain)),
        });

        let mut resources = vec![
            Resource::new(&ids.bucket, self.bucket()).retain(),
            Resource::new(&ids.certificate, self.certificate()),
            Resource::new(&ids.origin_access_control, self.origin_access_control()),
            Resource::new(&ids.distribution, self.distribution()),
            Resource::new(&ids.bucket_policy, self.bucket_policy()),
        ];
        for (name, record) in self.records() {
            resources.push(Resource::new(name, record));
        }

        StackInput {
            stack_name: self.config.stack_name().to_string(),
            description: Some(format!("Static website for {}", self.config.root_domain)),
            parameters,
            resources,
            outputs: self.outputs(),
            overrides: vec![attach_origin_access_control(&ids.distribution, &ids.origin_access_control)],
            actions: vec![self.deployment().action_node()],
        }
    }

    pub fn synthesize(&self) -> Result<SitePlan, SiteError> {
        let synthesized = synthesize(&self.declare())?;
        info!(
            stack = %synthesized.stack_name,
            resources = synthesized.template.resources.len(),
            "synthesized site"
        );
        let mut parameters = BTreeMap::new();
        parameters.insert(self.ids.hosted_zone.clone(), self.hosted_zone.id.clone());
        Ok(SitePlan { synthesized, deployment: self.deployment(), parameters })
    }
}
