#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use aws_route53::LookupError;

    use crate::*;

    /// answers every lookup with the same zone and counts the calls.
    struct CountingLookup {
        zone: Option<HostedZone>,
        calls: AtomicUsize,
    }

    impl CountingLookup {
        fn new(zone: Option<HostedZone>) -> Self {
            Self { zone, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl ZoneLookup for CountingLookup {
        async fn find_hosted_zone(&self, domain_name: &str) -> Result<HostedZone, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.zone.clone().ok_or_else(|| LookupError::NotFound(domain_name.to_string()))
        }
    }

    fn zone() -> HostedZone {
        HostedZone { id: "Z0123456789ABC".into(), name: "example.com.".into() }
    }

    #[tokio::test]
    async fn lookups_are_cached_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONTEXT_FILE_NAME);
        let lookup = CountingLookup::new(Some(zone()));
        let config = SiteConfig::new("IacStack", "example.com");

        let mut context = LookupContext::load(&path).unwrap();
        assert!(context.hosted_zones.is_empty());
        assert_eq!(resolve_hosted_zone(&config, &mut context, &lookup).await.unwrap(), zone());
        assert_eq!(resolve_hosted_zone(&config, &mut context, &lookup).await.unwrap(), zone());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        context.save(&path).unwrap();

        let mut reloaded = LookupContext::load(&path).unwrap();
        assert_eq!(reloaded, context);
        assert_eq!(resolve_hosted_zone(&config, &mut reloaded, &lookup).await.unwrap(), zone());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pinned_zone_id_skips_lookup() {
        let lookup = CountingLookup::new(None);
        let mut config = SiteConfig::new("IacStack", "example.com");
        config.hosted_zone_id = Some("/hostedzone/ZPINNED".into());
        let mut context = LookupContext::default();
        let zone = resolve_hosted_zone(&config, &mut context, &lookup).await.unwrap();
        assert_eq!(zone, HostedZone { id: "ZPINNED".into(), name: "example.com.".into() });
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert!(context.hosted_zones.is_empty());
    }

    #[tokio::test]
    async fn missing_zone_is_an_error() {
        let lookup = CountingLookup::new(None);
        let config = SiteConfig::new("IacStack", "example.com");
        let mut context = LookupContext::default();
        let err = resolve_hosted_zone(&config, &mut context, &lookup).await.unwrap_err();
        assert!(matches!(err, SiteError::Lookup(LookupError::NotFound(_))));
    }

    #[test]
    fn corrupt_context_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONTEXT_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(LookupContext::load(&path), Err(SiteError::Context { .. })));
    }

    #[tokio::test]
    async fn lookup_feeds_the_declaration() {
        let lookup = CountingLookup::new(Some(zone()));
        let config = SiteConfig::new("IacStack", "example.com");
        let mut context = LookupContext::default();
        let zone = resolve_hosted_zone(&config, &mut context, &lookup).await.unwrap();
        let plan = StaticWebsite::new(config, zone).unwrap().synthesize().unwrap();
        assert_eq!(
            plan.synthesized.template.parameters["HostedZoneId"].default.as_deref(),
            Some("Z0123456789ABC")
        );
    }
}
