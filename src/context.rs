use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use aws_route53::{normalize_zone_id, normalize_zone_name, HostedZone, ZoneLookup};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{SiteConfig, SiteError};

pub const CONTEXT_FILE_NAME: &str = "site.context.json";

/// values looked up from the account during synthesis. Saved next to the
/// config so synthesizing again gives the same template without network access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupContext {
    /// keyed by fully qualified zone name.
    #[serde(default)]
    pub hosted_zones: BTreeMap<String, HostedZone>,
}

impl LookupContext {
    /// a missing file is an empty context.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SiteError> {
        let path = path.as_ref();
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(SiteError::Io { path: path.to_path_buf(), source }),
        };
        serde_json::from_str(&data).map_err(|source| SiteError::Context { path: path.to_path_buf(), source })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SiteError> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self)
            .map_err(|source| SiteError::Context { path: path.to_path_buf(), source })?;
        std::fs::write(path, data + "\n")
            .map_err(|source| SiteError::Io { path: path.to_path_buf(), source })
    }

    /// cached zone if there is one, otherwise asks `lookup` and remembers the answer.
    pub async fn hosted_zone(&mut self, domain_name: &str, lookup: &dyn ZoneLookup) -> Result<HostedZone, SiteError> {
        let key = normalize_zone_name(domain_name);
        if let Some(zone) = self.hosted_zones.get(&key) {
            debug!(zone = %key, id = %zone.id, "using cached hosted zone");
            return Ok(zone.clone());
        }
        let zone = lookup.find_hosted_zone(domain_name).await?;
        info!(zone = %key, id = %zone.id, "found hosted zone");
        self.hosted_zones.insert(key, zone.clone());
        Ok(zone)
    }
}

pub fn context_path_for(config_path: &Path) -> PathBuf {
    config_path.parent()
        .map(|dir| dir.join(CONTEXT_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONTEXT_FILE_NAME))
}

/// the zone the site's records and certificate validation go into.
/// An id pinned in the config wins over the context and the lookup.
pub async fn resolve_hosted_zone(
    config: &SiteConfig,
    context: &mut LookupContext,
    lookup: &dyn ZoneLookup,
) -> Result<HostedZone, SiteError> {
    if let Some(id) = &config.hosted_zone_id {
        return Ok(HostedZone {
            id: normalize_zone_id(id),
            name: normalize_zone_name(&config.root_domain),
        });
    }
    context.hosted_zone(&config.root_domain, lookup).await
}
