use serde_json::{json, Value};
use sitestack_lib::CfnResource;

pub mod lookup;

pub use lookup::{HostedZone, LookupError, Route53ZoneLookup, ZoneLookup};

/// route53 names are fully qualified, ie: they end in a dot.
pub fn normalize_zone_name(name: &str) -> String {
    let mut out = name.trim().to_ascii_lowercase();
    if !out.ends_with('.') {
        out.push('.');
    }
    out
}

/// the API returns ids as `/hostedzone/Z123`, cloudformation wants `Z123`.
pub fn normalize_zone_id(id: &str) -> String {
    id.trim().trim_start_matches("/hostedzone/").to_string()
}

/// an A record aliased to another AWS resource, eg: a cloudfront distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasRecord {
    /// fully qualified record name. A trailing dot is added if missing.
    pub name: String,
    /// zone the record is written into. Usually a Ref to a parameter.
    pub hosted_zone_id: Value,
    /// eg: the DomainName attribute of a distribution.
    pub target_dns_name: Value,
    /// the fixed zone of the aliased service.
    pub target_hosted_zone_id: String,
}

impl CfnResource for AliasRecord {
    fn type_string(&self) -> &'static str {
        "AWS::Route53::RecordSet"
    }

    fn properties(&self) -> Value {
        json!({
            "Name": normalize_zone_name(&self.name),
            "Type": "A",
            "HostedZoneId": self.hosted_zone_id,
            "AliasTarget": {
                "DNSName": self.target_dns_name,
                "HostedZoneId": self.target_hosted_zone_id,
                "EvaluateTargetHealth": false,
            },
        })
    }

    fn validate(&self) -> Result<(), String> {
        let name = self.name.trim_end_matches('.');
        if name.is_empty() || !name.contains('.') {
            return Err(format!("Route53 record must have a fully qualified name, eg: mysubdomain.mywebsite.com. {:?} is invalid", self.name));
        }
        if self.target_hosted_zone_id.is_empty() {
            return Err("Alias target must have a hosted zone id".into());
        }
        Ok(())
    }
}
