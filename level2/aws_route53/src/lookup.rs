use async_trait::async_trait;
use aws_sdk_route53::error::DisplayErrorContext;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{normalize_zone_id, normalize_zone_name};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("No public hosted zone named {0} was found in this account")]
    NotFound(String),
    #[error("Found {count} public hosted zones named {name}, cannot pick one")]
    Ambiguous { name: String, count: usize },
    #[error("Failed to list hosted zones\n{0}")]
    Api(String),
}

/// an existing zone. `id` never carries the `/hostedzone/` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait ZoneLookup: Send + Sync {
    /// finds the public hosted zone whose name is exactly `domain_name`.
    async fn find_hosted_zone(&self, domain_name: &str) -> Result<HostedZone, LookupError>;
}

pub struct Route53ZoneLookup {
    client: aws_sdk_route53::Client,
}

impl Route53ZoneLookup {
    pub fn new(client: aws_sdk_route53::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ZoneLookup for Route53ZoneLookup {
    async fn find_hosted_zone(&self, domain_name: &str) -> Result<HostedZone, LookupError> {
        let wanted = normalize_zone_name(domain_name);
        // results are sorted by name starting at dns_name, so every
        // exact match is on the first page.
        let output = self.client.list_hosted_zones_by_name()
            .dns_name(&wanted)
            .send()
            .await
            .map_err(|e| LookupError::Api(DisplayErrorContext(&e).to_string()))?;

        let matches: Vec<HostedZone> = output.hosted_zones().iter()
            .filter(|z| normalize_zone_name(z.name()) == wanted)
            .filter(|z| !z.config().map(|c| c.private_zone()).unwrap_or(false))
            .map(|z| HostedZone { id: normalize_zone_id(z.id()), name: wanted.clone() })
            .collect();
        debug!(domain_name, found = matches.len(), "hosted zone lookup");
        pick_single(wanted, matches)
    }
}

fn pick_single(name: String, mut zones: Vec<HostedZone>) -> Result<HostedZone, LookupError> {
    match zones.len() {
        0 => Err(LookupError::NotFound(name)),
        1 => Ok(zones.remove(0)),
        count => Err(LookupError::Ambiguous { name, count }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(id: &str) -> HostedZone {
        HostedZone { id: id.into(), name: "example.com.".into() }
    }

    #[test]
    fn exactly_one_zone_must_match() {
        assert!(matches!(pick_single("example.com.".into(), vec![]), Err(LookupError::NotFound(_))));
        assert_eq!(pick_single("example.com.".into(), vec![zone("Z1")]).unwrap(), zone("Z1"));
        assert!(matches!(
            pick_single("example.com.".into(), vec![zone("Z1"), zone("Z2")]),
            Err(LookupError::Ambiguous { count: 2, .. })
        ));
    }

    struct Fixed(HostedZone);

    #[async_trait]
    impl ZoneLookup for Fixed {
        async fn find_hosted_zone(&self, _domain_name: &str) -> Result<HostedZone, LookupError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn lookups_are_usable_as_trait_objects() {
        let lookup: Box<dyn ZoneLookup> = Box::new(Fixed(zone("Z9")));
        assert_eq!(lookup.find_hosted_zone("example.com").await.unwrap().id, "Z9");
    }
}
