//! # Subdomain Resolution
//!
//! Turns a root domain into the list of live hostnames every later phase
//! works from:
//!
//! 1. Ask every [`PassiveSource`] concurrently, each under its own retry loop.
//! 2. If none of them produced anything, brute-force the built-in wordlist.
//! 3. [`normalize`] the candidates.
//! 4. Keep the ones that resolve, in first-seen order.
//!
//! Every survivor is also published as a `SubdomainFound` event.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use recce_common::config::{DnsConfig, SourceConfig};
use recce_common::event::Event;
use recce_common::network::target::Domain;
use recce_common::{Error, success};
use reqwest::Client;
use tracing::{debug, info};

use crate::engine::Bus;

mod dns;
mod sources;
pub mod wordlist;

pub use dns::{HostResolver, SystemResolver};
pub use sources::{CrtSh, HackerTarget, PassiveSource, SourceError, fetch_with_retry};

pub struct SubdomainResolver {
    bus: Bus,
    sources: Vec<Box<dyn PassiveSource>>,
    dns: Arc<dyn HostResolver>,
    config: DnsConfig,
    sources_config: SourceConfig,
}

impl SubdomainResolver {
    /// A resolver without passive sources. Add them with [`Self::with_source`].
    pub fn new(bus: Bus, dns: Arc<dyn HostResolver>, config: DnsConfig, sources_config: SourceConfig) -> Self {
        Self {
            bus,
            sources: Vec::new(),
            dns,
            config,
            sources_config,
        }
    }

    /// HackerTarget and crt.sh, sharing `client`.
    pub fn with_default_sources(mut self, client: Client) -> Self {
        let hackertarget = HackerTarget::new(client.clone(), self.sources_config.hackertarget_url.clone());
        let crtsh = CrtSh::new(client, self.sources_config.crtsh_url.clone());
        self.sources.push(Box::new(hackertarget));
        self.sources.push(Box::new(crtsh));
        self
    }

    pub fn with_source(mut self, source: Box<dyn PassiveSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub async fn resolve(&self, root: &Domain) -> Result<Vec<String>, Error> {
        self.bus.log(format!("Phase 1: subdomain discovery for {root}"));

        let passive = self.query_passive(root).await;
        let (candidates, origin) = if passive.is_empty() {
            self.bus.log("Passive sources found nothing, switching to brute force");
            (self.brute_force(root).await, "brute-force")
        } else {
            self.bus.log(format!("Passive sources returned {} entries", passive.len()));
            (passive, "passive")
        };

        let clean = normalize(candidates, root);
        info!(domain = %root, candidates = clean.len(), "validating subdomains");

        let alive = self.keep_resolving(clean, self.config.validate_concurrency).await;
        for host in &alive {
            success!(host = %host, origin, "alive");
            self.bus.publish(Event::subdomain(host, origin)).await?;
        }

        self.bus.log(format!("{} live subdomains", alive.len()));
        Ok(alive)
    }

    async fn query_passive(&self, root: &Domain) -> Vec<String> {
        let retry = &self.sources_config.retry;
        let queries = self
            .sources
            .iter()
            .map(|source| fetch_with_retry(source.as_ref(), root, retry));

        // join_all keeps source order whatever order the answers arrive in.
        futures::future::join_all(queries).await.into_iter().flatten().collect()
    }

    async fn brute_force(&self, root: &Domain) -> Vec<String> {
        let found = self
            .keep_resolving(wordlist::candidates(root.as_str()), self.config.brute_concurrency)
            .await;
        for host in &found {
            debug!(host = %host, "brute force hit");
        }
        found
    }

    /// Resolves `hosts` at most `limit` at a time; output keeps input order.
    async fn keep_resolving(&self, hosts: Vec<String>, limit: usize) -> Vec<String> {
        let dns = Arc::clone(&self.dns);
        stream::iter(hosts)
            .map(|host| {
                let dns = Arc::clone(&dns);
                async move {
                    let alive = dns.resolves(&host).await;
                    if !alive {
                        debug!(host = %host, "does not resolve");
                    }
                    alive.then_some(host)
                }
            })
            .buffered(limit.max(1))
            .filter_map(|host| async move { host })
            .collect()
            .await
    }
}

/// Cleans raw source output against `root`.
///
/// Lowercases and trims, drops wildcard entries and anything outside `root`,
/// then removes duplicates keeping the first occurrence. Applying it to its
/// own output changes nothing.
pub fn normalize<I, S>(raw: I, root: &Domain) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let root = root.as_str();
    let suffix = format!(".{root}");
    let mut seen = HashSet::new();
    let mut clean = Vec::new();

    for entry in raw {
        let host = entry.as_ref().trim().trim_end_matches('.').to_ascii_lowercase();
        if host.is_empty() || host.contains('*') {
            continue;
        }
        if host != root && !host.ends_with(&suffix) {
            debug!(host = %host, "discarding host outside the target domain");
            continue;
        }
        if seen.insert(host.clone()) {
            clean.push(host);
        }
    }

    clean
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use proptest::prelude::*;
    use recce_common::config::RetryPolicy;
    use recce_common::event::EventKind;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::engine::{DecisionEngine, Observer};

    fn root() -> Domain {
        Domain::from_str("example.com").unwrap()
    }

    /// Resolves exactly the hosts it was built with and counts lookups.
    struct FixtureDns {
        alive: HashSet<String>,
        lookups: AtomicUsize,
    }

    impl FixtureDns {
        fn new(alive: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                alive: alive.iter().map(|h| h.to_string()).collect(),
                lookups: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl HostResolver for FixtureDns {
        async fn resolves(&self, host: &str) -> bool {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.alive.contains(host)
        }
    }

    struct StaticSource(Vec<&'static str>);

    #[async_trait]
    impl PassiveSource for StaticSource {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn fetch(&self, _domain: &Domain) -> Result<Vec<String>, SourceError> {
            Ok(self.0.iter().map(|h| h.to_string()).collect())
        }
    }

    #[derive(Default)]
    struct SubdomainRecorder(Mutex<Vec<(String, String)>>);

    impl Observer for SubdomainRecorder {
        fn on_event(&self, event: &Event) {
            if event.kind == EventKind::SubdomainFound {
                self.0.lock().unwrap().push((event.target.clone(), event.payload.clone()));
            }
        }
    }

    fn sources_config() -> SourceConfig {
        SourceConfig {
            retry: RetryPolicy::immediate(3),
            ..SourceConfig::default()
        }
    }

    #[test]
    fn normalize_cleans_and_preserves_order() {
        let raw = [
            "WWW.example.com",
            "*.example.com",
            "api.example.com.",
            "www.example.com",
            "evilexample.com",
            "other.org",
            " example.com ",
        ];
        assert_eq!(
            normalize(raw, &root()),
            vec!["www.example.com", "api.example.com", "example.com"]
        );
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in prop::collection::vec("[a-cA-C*. ]{0,6}(\\.example\\.com)?", 0..24)) {
            let once = normalize(&raw, &root());
            let twice = normalize(&once, &root());
            prop_assert_eq!(once, twice);
        }
    }

    #[tokio::test]
    async fn passive_hits_are_validated_and_published() {
        let recorder = Arc::new(SubdomainRecorder::default());
        let handle = DecisionEngine::with_observer(16, recorder.clone()).start();
        let dns = FixtureDns::new(&["www.example.com", "dev.example.com"]);

        let resolver = SubdomainResolver::new(handle.bus(), dns.clone(), DnsConfig::default(), sources_config())
            .with_source(Box::new(StaticSource(vec!["www.example.com", "stale.example.com"])))
            .with_source(Box::new(StaticSource(vec!["dev.example.com", "www.example.com"])));

        let alive = resolver.resolve(&root()).await.unwrap();
        handle.reactions().await_zero().await;
        handle.shutdown().await.unwrap();

        assert_eq!(alive, vec!["www.example.com", "dev.example.com"]);
        for host in &alive {
            assert!(dns.resolves(host).await);
        }
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                ("www.example.com".to_string(), "passive".to_string()),
                ("dev.example.com".to_string(), "passive".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn empty_passive_results_fall_back_to_brute_force() {
        let handle = DecisionEngine::new(16).start();
        let dns = FixtureDns::new(&["mail.example.com", "api.example.com"]);

        let resolver = SubdomainResolver::new(handle.bus(), dns.clone(), DnsConfig::default(), sources_config())
            .with_source(Box::new(StaticSource(vec![])));

        let alive = resolver.resolve(&root()).await.unwrap();
        handle.shutdown().await.unwrap();

        assert_eq!(alive, vec!["mail.example.com", "api.example.com"]);
        // Every wordlist entry once, then the two hits again during validation.
        assert_eq!(
            dns.lookups.load(Ordering::SeqCst),
            wordlist::COMMON_LABELS.len() + 2
        );
    }

    #[tokio::test]
    async fn throttled_crtsh_recovers_without_brute_force() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"[{"name_value":"www.example.com"}]"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let handle = DecisionEngine::new(16).start();
        let dns = FixtureDns::new(&["www.example.com", "mail.example.com"]);
        let resolver = SubdomainResolver::new(handle.bus(), dns.clone(), DnsConfig::default(), sources_config())
            .with_source(Box::new(CrtSh::new(Client::new(), server.uri())));

        let alive = resolver.resolve(&root()).await.unwrap();
        handle.shutdown().await.unwrap();

        assert_eq!(alive, vec!["www.example.com"]);
        // Only the validation lookup: the wordlist was never tried.
        assert_eq!(dns.lookups.load(Ordering::SeqCst), 1);
    }
}
