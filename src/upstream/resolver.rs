//! Cached tag, package and `latest` lookups

use crate::cache::TtlCache;
use crate::config::{Config, LatestPolicy};
use crate::error::{PackyardError, PackyardResult};
use crate::upstream::UpstreamHost;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const TAGS_DOMAIN: &str = "github/tags";
const PACKAGES_DOMAIN: &str = "github/packages";
const HEAD_DOMAIN: &str = "github/head";

/// Tag/version resolver with a TTL cache in front of the upstream host
#[derive(Clone)]
pub struct VersionResolver {
    host: Arc<dyn UpstreamHost>,
    cache: TtlCache,
    policy: LatestPolicy,
    tags_ttl: Duration,
    packages_ttl: Duration,
}

impl VersionResolver {
    pub fn new(
        host: Arc<dyn UpstreamHost>,
        cache: TtlCache,
        policy: LatestPolicy,
        tags_ttl: Duration,
        packages_ttl: Duration,
    ) -> Self {
        Self {
            host,
            cache,
            policy,
            tags_ttl,
            packages_ttl,
        }
    }

    /// Create a resolver using the TTLs and policy from config
    pub fn from_config(host: Arc<dyn UpstreamHost>, cache: TtlCache, config: &Config) -> Self {
        Self::new(
            host,
            cache,
            config.resolve.latest,
            Duration::from_secs(config.cache.tags_ttl_secs),
            Duration::from_secs(config.cache.packages_ttl_secs),
        )
    }

    /// Configured `latest` policy
    pub fn policy(&self) -> LatestPolicy {
        self.policy
    }

    /// All version tags (short TTL: tags appear between requests)
    pub async fn list_tags(&self) -> PackyardResult<Vec<String>> {
        self.cache
            .get_or_fetch(TAGS_DOMAIN, "", self.tags_ttl, || self.host.list_tags())
            .await
    }

    /// Packages present at `version` (long TTL: a revision's tree is fixed)
    pub async fn list_packages(&self, version: &str) -> PackyardResult<Vec<String>> {
        self.cache
            .get_or_fetch(PACKAGES_DOMAIN, version, self.packages_ttl, || {
                self.host.list_package_dirs(version)
            })
            .await
    }

    /// Translate `latest` into a concrete version under the configured policy
    pub async fn resolve_latest(&self) -> PackyardResult<String> {
        let version = match self.policy {
            LatestPolicy::NewestSemverTag => {
                let tags = self.list_tags().await?;
                newest_semver_tag(&tags).ok_or(PackyardError::NoLatestVersion)?
            }
            LatestPolicy::HeadRevision => {
                self.cache
                    .get_or_fetch(HEAD_DOMAIN, "", self.tags_ttl, || self.host.head_revision())
                    .await?
            }
        };

        info!("Resolved latest ({}) to {}", self.policy, version);
        Ok(version)
    }
}

/// Pick the highest tag by semantic version ordering.
///
/// Tags that do not parse as semver (after dropping one leading `v`) are
/// ignored. The tag is returned as listed upstream so it stays a valid ref.
pub fn newest_semver_tag(tags: &[String]) -> Option<String> {
    tags.iter()
        .filter_map(|tag| {
            let raw = tag.strip_prefix('v').unwrap_or(tag);
            match semver::Version::parse(raw) {
                Ok(version) => Some((version, tag)),
                Err(_) => {
                    debug!("Ignoring non-semver tag {}", tag);
                    None
                }
            }
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, tag)| tag.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::FakeUpstream;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn resolver(upstream: Arc<FakeUpstream>, policy: LatestPolicy) -> VersionResolver {
        let cache = TtlCache::new(Arc::new(MemoryStore::new()));
        VersionResolver::new(
            upstream,
            cache,
            policy,
            Duration::from_secs(120),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn newest_semver_ignores_unparsable_tags() {
        let list = tags(&["v1.2.0", "v1.10.0", "nightly", "v1.9.9", "release-2"]);
        assert_eq!(newest_semver_tag(&list).as_deref(), Some("v1.10.0"));
    }

    #[test]
    fn newest_semver_orders_prereleases_below_release() {
        let list = tags(&["2.0.0-rc.1", "1.4.0", "2.0.0"]);
        assert_eq!(newest_semver_tag(&list).as_deref(), Some("2.0.0"));
    }

    #[test]
    fn newest_semver_none_without_semver_tags() {
        assert_eq!(newest_semver_tag(&tags(&["latest", "main"])), None);
        assert_eq!(newest_semver_tag(&[]), None);
    }

    #[tokio::test]
    async fn latest_is_stable_within_ttl() {
        let upstream = Arc::new(FakeUpstream::new(&["v1.0.0", "v1.2.0"], &["demo"]));
        let resolver = resolver(upstream.clone(), LatestPolicy::NewestSemverTag);

        let first = resolver.resolve_latest().await.unwrap();
        upstream.set_tags(&["v1.0.0", "v1.2.0", "v2.0.0"]);
        let second = resolver.resolve_latest().await.unwrap();

        assert_eq!(first, "v1.2.0");
        assert_eq!(second, first);
        assert_eq!(upstream.tag_calls(), 1);
    }

    #[tokio::test]
    async fn head_revision_policy_uses_latest_commit() {
        let upstream = Arc::new(FakeUpstream::new(&["v1.0.0"], &["demo"]));
        let resolver = resolver(upstream.clone(), LatestPolicy::HeadRevision);

        let version = resolver.resolve_latest().await.unwrap();
        assert_eq!(version, upstream.head());
        assert_eq!(upstream.tag_calls(), 0);
    }

    #[tokio::test]
    async fn no_semver_tags_is_an_error() {
        let upstream = Arc::new(FakeUpstream::new(&["main"], &["demo"]));
        let resolver = resolver(upstream, LatestPolicy::NewestSemverTag);

        assert!(matches!(
            resolver.resolve_latest().await,
            Err(PackyardError::NoLatestVersion)
        ));
    }

    #[tokio::test]
    async fn package_lists_are_cached_per_version() {
        let upstream = Arc::new(FakeUpstream::new(&["v1.0.0", "v2.0.0"], &["demo", "core"]));
        let resolver = resolver(upstream.clone(), LatestPolicy::NewestSemverTag);

        let first = resolver.list_packages("v1.0.0").await.unwrap();
        let again = resolver.list_packages("v1.0.0").await.unwrap();
        resolver.list_packages("v2.0.0").await.unwrap();

        assert_eq!(first, vec!["demo", "core"]);
        assert_eq!(again, first);
        assert_eq!(upstream.package_calls(), 2);
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let upstream = Arc::new(FakeUpstream::new(&["v1.0.0"], &["demo"]));
        upstream.fail_with_status(502);
        let resolver = resolver(upstream, LatestPolicy::NewestSemverTag);

        assert!(matches!(
            resolver.list_tags().await,
            Err(PackyardError::UpstreamStatus { status: 502, .. })
        ));
    }
}
