#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::{json, Value};
    use sitestack_lib::{diff_templates, get_att, get_ref, sub, NodeKind};

    use crate::*;

    fn zone() -> HostedZone {
        HostedZone { id: "Z0123456789ABC".into(), name: "example.com.".into() }
    }

    fn site() -> StaticWebsite {
        StaticWebsite::new(SiteConfig::new("IacStack", "example.com"), zone()).unwrap()
    }

    fn plan() -> SitePlan {
        site().synthesize().unwrap()
    }

    fn types(template: &Template) -> Vec<(&str, &str)> {
        template.resources.iter().map(|(k, v)| (k.as_str(), v.ty.as_str())).collect()
    }

    fn string_set(v: &Value) -> BTreeSet<String> {
        v.as_array().unwrap().iter().map(|s| s.as_str().unwrap().to_string()).collect()
    }

    fn domains() -> BTreeSet<String> {
        ["example.com".to_string(), "www.example.com".to_string()].into_iter().collect()
    }

    #[test]
    fn example_com_end_to_end() {
        let plan = plan();
        let template = &plan.synthesized.template;
        assert_eq!(plan.stack_name(), "IacStack");
        assert_eq!(types(template), vec![
            ("BucketIacStack", "AWS::S3::Bucket"),
            ("BucketPolicyIacStack", "AWS::S3::BucketPolicy"),
            ("CertificateIacStack", "AWS::CertificateManager::Certificate"),
            ("DistributionIacStack", "AWS::CloudFront::Distribution"),
            ("OriginAccessControlIacStack", "AWS::CloudFront::OriginAccessControl"),
            ("RootRecordIacStack", "AWS::Route53::RecordSet"),
            ("WwwRecordIacStack", "AWS::Route53::RecordSet"),
        ]);
        assert_eq!(template.parameters["HostedZoneId"].default.as_deref(), Some("Z0123456789ABC"));
        assert_eq!(plan.parameters["HostedZoneId"], "Z0123456789ABC");
        assert_eq!(
            template.outputs.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["BucketName", "CertificateArn", "DistributionDomainName", "DistributionId"]
        );
        assert_eq!(plan.deployment.source, std::path::PathBuf::from("../frontend/dist"));
        assert_eq!(plan.deployment.invalidation_paths, vec!["/*"]);
    }

    #[test]
    fn bucket_is_private_and_retained() {
        let plan = plan();
        let bucket = &plan.synthesized.template.resources["BucketIacStack"];
        assert_eq!(bucket.properties["BucketName"], "static-site-iacstack");
        assert_eq!(bucket.properties["WebsiteConfiguration"]["IndexDocument"], "index.html");
        let block = &bucket.properties["PublicAccessBlockConfiguration"];
        for flag in ["BlockPublicAcls", "BlockPublicPolicy", "IgnorePublicAcls", "RestrictPublicBuckets"] {
            assert_eq!(block[flag], true, "{flag}");
        }
        let rendered = serde_json::to_value(bucket).unwrap();
        assert_eq!(rendered["DeletionPolicy"], "Retain");
        assert_eq!(rendered["UpdateReplacePolicy"], "Retain");
    }

    #[test]
    fn certificate_covers_root_and_www() {
        let plan = plan();
        let cert = &plan.synthesized.template.resources["CertificateIacStack"].properties;
        let mut names = string_set(&cert["SubjectAlternativeNames"]);
        names.insert(cert["DomainName"].as_str().unwrap().to_string());
        assert_eq!(names, domains());
        assert_eq!(cert["ValidationMethod"], "DNS");
        assert_eq!(cert["Tags"], json!([{ "Key": "Name", "Value": "Certificate-IacStack" }]));
        for option in cert["DomainValidationOptions"].as_array().unwrap() {
            assert_eq!(option["HostedZoneId"], get_ref("HostedZoneId"));
        }
    }

    #[test]
    fn distribution_serves_both_names_over_https() {
        let plan = plan();
        let config = &plan.synthesized.template.resources["DistributionIacStack"].properties["DistributionConfig"];
        assert_eq!(string_set(&config["Aliases"]), domains());
        assert_eq!(config["DefaultRootObject"], "index.html");
        assert_eq!(config["ViewerCertificate"]["AcmCertificateArn"], get_ref("CertificateIacStack"));
        assert_eq!(config["DefaultCacheBehavior"]["ViewerProtocolPolicy"], "redirect-to-https");
        assert_eq!(config["Origins"][0]["DomainName"], get_att("BucketIacStack", "RegionalDomainName"));
        assert_eq!(config["Origins"][0]["OriginAccessControlId"], get_att("OriginAccessControlIacStack", "Id"));
    }

    #[test]
    fn exactly_one_spa_error_response() {
        let plan = plan();
        let config = &plan.synthesized.template.resources["DistributionIacStack"].properties["DistributionConfig"];
        assert_eq!(config["CustomErrorResponses"], json!([{
            "ErrorCode": 403,
            "ResponseCode": 200,
            "ResponsePagePath": "/index.html",
            "ErrorCachingMinTTL": 60,
        }]));
    }

    #[test]
    fn origin_access_control_is_sigv4_always() {
        let plan = plan();
        let oac = &plan.synthesized.template.resources["OriginAccessControlIacStack"].properties["OriginAccessControlConfig"];
        assert_eq!(oac["Name"], "StaticWebOriginAccessControlIacStack");
        assert_eq!(oac["OriginAccessControlOriginType"], "s3");
        assert_eq!(oac["SigningBehavior"], "always");
        assert_eq!(oac["SigningProtocol"], "sigv4");
    }

    #[test]
    fn policy_is_scoped_to_this_distribution() {
        let plan = plan();
        let policy = &plan.synthesized.template.resources["BucketPolicyIacStack"].properties;
        assert_eq!(policy["Bucket"], get_ref("BucketIacStack"));
        let statements = policy["PolicyDocument"]["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 1);
        let statement = &statements[0];
        assert_eq!(statement["Principal"], json!({ "Service": "cloudfront.amazonaws.com" }));
        assert_eq!(statement["Action"], "s3:GetObject");
        assert_eq!(statement["Resource"], sub("${BucketIacStack.Arn}/*"));
        let source_arn = &statement["Condition"]["StringEquals"]["AWS:SourceArn"];
        assert_eq!(source_arn, &sub("arn:aws:cloudfront::${AWS::AccountId}:distribution/${DistributionIacStack}"));
        assert!(!source_arn.to_string().contains('*'));
    }

    #[test]
    fn two_alias_records_to_the_same_distribution() {
        let plan = plan();
        let template = &plan.synthesized.template;
        let records: Vec<_> = template.resources_of_type("AWS::Route53::RecordSet").collect();
        assert_eq!(records.len(), 2);
        let names: BTreeSet<String> = records.iter()
            .map(|(_, r)| r.properties["Name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["example.com.".to_string(), "www.example.com.".to_string()].into_iter().collect());
        for (_, record) in records {
            assert_eq!(record.properties["Type"], "A");
            assert_eq!(record.properties["HostedZoneId"], get_ref("HostedZoneId"));
            assert_eq!(record.properties["AliasTarget"]["DNSName"], get_att("DistributionIacStack", "DomainName"));
            assert_eq!(record.properties["AliasTarget"]["HostedZoneId"], "Z2FDTNDATAQYW2");
        }
    }

    #[test]
    fn apply_order_follows_references() {
        let plan = plan();
        let order = &plan.synthesized.order;
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert_eq!(order.len(), 9);
        assert!(pos("HostedZoneId") < pos("CertificateIacStack"));
        assert!(pos("BucketIacStack") < pos("DistributionIacStack"));
        assert!(pos("CertificateIacStack") < pos("DistributionIacStack"));
        assert!(pos("OriginAccessControlIacStack") < pos("DistributionIacStack"));
        assert!(pos("DistributionIacStack") < pos("BucketPolicyIacStack"));
        assert!(pos("DistributionIacStack") < pos("RootRecordIacStack"));
        assert!(pos("DistributionIacStack") < pos("WwwRecordIacStack"));
        assert!(pos("BucketIacStack") < pos("BucketDeploymentIacStack"));
        assert!(pos("DistributionIacStack") < pos("BucketDeploymentIacStack"));
        assert_eq!(plan.synthesized.graph.kind("BucketDeploymentIacStack"), Some(NodeKind::Action));
        assert_eq!(plan.synthesized.graph.kind("HostedZoneId"), Some(NodeKind::Parameter));
    }

    #[test]
    fn synthesis_is_idempotent() {
        let one = plan();
        let two = plan();
        assert_eq!(one.template_body().unwrap(), two.template_body().unwrap());
        assert_eq!(one.synthesized.order, two.synthesized.order);
        assert!(diff_templates(&one.synthesized.template, &two.synthesized.template).is_empty());
    }

    #[test]
    fn template_round_trips_through_json() {
        let plan = plan();
        let body = plan.template_body().unwrap();
        let parsed = Template::from_json(&body).unwrap();
        assert_eq!(parsed, plan.synthesized.template);
    }

    #[test]
    fn changing_the_domain_is_a_diff() {
        let old = plan();
        let new = StaticWebsite::new(SiteConfig::new("IacStack", "example.org"), zone()).unwrap()
            .synthesize().unwrap();
        let diff = diff_templates(&old.synthesized.template, &new.synthesized.template);
        let changed: Vec<&str> = diff.resources.iter().map(|c| c.logical_id.as_str()).collect();
        assert!(changed.contains(&"CertificateIacStack"));
        assert!(changed.contains(&"DistributionIacStack"));
        assert!(changed.contains(&"RootRecordIacStack"));
        assert!(!changed.contains(&"BucketIacStack"));
    }

    #[test]
    fn custom_cache_policy_is_used() {
        let mut config = SiteConfig::new("IacStack", "example.com");
        config.cache_policy_id = Some("my-policy".into());
        let plan = StaticWebsite::new(config, zone()).unwrap().synthesize().unwrap();
        let config = &plan.synthesized.template.resources["DistributionIacStack"].properties["DistributionConfig"];
        assert_eq!(config["DefaultCacheBehavior"]["CachePolicyId"], "my-policy");
    }

    #[test]
    fn invalid_bucket_names_fail_synthesis() {
        // stack names allow characters that bucket names do not
        let long_id = format!("a{}", "b".repeat(60));
        let site = StaticWebsite::new(SiteConfig::new(long_id, "example.com"), zone()).unwrap();
        let err = site.synthesize().unwrap_err();
        assert!(err.to_string().contains("Validation failed on resource 'Bucketa"), "{err}");
    }

    #[test]
    fn empty_zone_id_is_rejected() {
        let zone = HostedZone { id: String::new(), name: "example.com.".into() };
        assert!(StaticWebsite::new(SiteConfig::new("IacStack", "example.com"), zone).is_err());
    }
}
