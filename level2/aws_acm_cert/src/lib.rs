use serde_json::{json, Value};
use sitestack_lib::CfnResource;

/// an ACM certificate validated through DNS records that ACM writes into
/// a Route53 hosted zone. This only works if the following is true:
/// - the domain is hosted in Route53
/// - the hosted zone resides in the same account as the stack
///
/// Certificates used by cloudfront must be created in us-east-1.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsValidatedCertificate {
    /// the domain you're requesting a certificate for. Must be fully qualified. Can have 1 optional wildcard.
    /// Examples of valid values:
    /// - www.mysite.com
    /// - multiple.sub.domains.mysite.com
    /// - mysite.com
    /// - *.mysite.com
    /// Examples of invalid values:
    /// - *.something.*.mysite.com
    /// - cannotendwithdot.com.
    pub domain_name: String,
    pub subject_alternative_names: Vec<String>,
    /// usually a Ref to a hosted zone id parameter.
    pub hosted_zone_id: Value,
    /// written as the `Name` tag.
    pub name: Option<String>,
}

impl DnsValidatedCertificate {
    pub fn all_domains(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.domain_name).chain(self.subject_alternative_names.iter())
    }
}

impl CfnResource for DnsValidatedCertificate {
    fn type_string(&self) -> &'static str {
        "AWS::CertificateManager::Certificate"
    }

    fn properties(&self) -> Value {
        let validation_options: Vec<Value> = self.all_domains()
            .map(|domain| json!({
                "DomainName": domain,
                "HostedZoneId": self.hosted_zone_id,
            }))
            .collect();
        let mut props = json!({
            "DomainName": self.domain_name,
            "ValidationMethod": "DNS",
            "DomainValidationOptions": validation_options,
        });
        if !self.subject_alternative_names.is_empty() {
            props["SubjectAlternativeNames"] = json!(self.subject_alternative_names);
        }
        if let Some(name) = &self.name {
            props["Tags"] = json!([{ "Key": "Name", "Value": name }]);
        }
        props
    }

    fn validate(&self) -> Result<(), String> {
        for domain in self.all_domains() {
            verify_domain_name(domain)?;
        }
        let mut seen = std::collections::BTreeSet::new();
        for domain in self.all_domains() {
            if !seen.insert(domain.to_ascii_lowercase()) {
                return Err(format!("Domain {} is listed more than once", domain));
            }
        }
        Ok(())
    }
}

pub fn verify_domain_name(domain_name: &str) -> Result<(), String> {
    if domain_name.is_empty() {
        return Err("Must provide a domain name".into());
    }
    if domain_name.len() > 253 {
        return Err(format!("{} is invalid. Domain names cannot be longer than 253 characters", domain_name));
    }
    if domain_name.ends_with('.') {
        return Err(format!("{} is invalid. Domain names must not end with a dot", domain_name));
    }
    if domain_name.contains('*') {
        let matches = domain_name.matches('*');
        if matches.count() > 1 {
            return Err(format!("Must only provide 1 wildcard. {} is invalid.", domain_name));
        }
        if !domain_name.starts_with("*.") {
            return Err(format!("If using a wildcard, it must be the first component of your domain, eg: \"*.something.com\". {} is invalid.", domain_name));
        }
    }
    let labels: Vec<&str> = domain_name.trim_start_matches("*.").split('.').collect();
    if labels.len() < 2 {
        return Err(format!("{} is invalid. Must be a fully qualified domain name", domain_name));
    }
    for label in labels {
        let valid = !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(format!("{} is invalid. {:?} is not a valid domain label", domain_name, label));
        }
    }
    Ok(())
}
