//! # Orchestrator
//!
//! Owns one reconnaissance run from subdomain discovery to engine shutdown.
//!
//! Shutdown is a small state machine:
//!
//! ```text
//! Scanning ──scans = 0──▶ Reacting ──reactions = 0──▶ Draining ──loop done──▶ Closed
//! ```
//!
//! The bus is only closed on entering `Draining`. By then every scan task has
//! exited and the reactions barrier, which counts queued events as well as
//! running actions, has been observed at zero, so no built-in producer can
//! publish again.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use recce_common::Error;
use recce_common::config::Config;
use recce_common::network::target::{Domain, ScanTarget, TargetSelection};
use reqwest::Client;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::barrier::Barrier;
use crate::engine::{Bus, DecisionEngine, DispatchReport, EngineHandle, Fanout, Observer, Rule, TracingObserver};
use crate::http::HttpAnalyzer;
use crate::hunter::FileHunter;
use crate::resolver::{HostResolver, PassiveSource, SubdomainResolver, SystemResolver};
use crate::rules;
use crate::scanner::{ConcurrencyLimiter, PortScanner, Prober, ProgressSink, TcpProber};

mod report;

use report::Collector;
pub use report::{Finding, ReconReport, ServiceReport, TargetReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scanning,
    Reacting,
    Draining,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Scanning => "scanning",
            Phase::Reacting => "reacting",
            Phase::Draining => "draining",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}

type RuleFactory = Box<dyn FnOnce(Bus) -> Rule + Send>;

pub struct Orchestrator {
    config: Config,
    observer: Arc<dyn Observer>,
    prober: Arc<dyn Prober>,
    dns: Arc<dyn HostResolver>,
    sources: Option<Vec<Box<dyn PassiveSource>>>,
    extra_rules: Vec<RuleFactory>,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let prober = Arc::new(TcpProber::new(config.scan.probe_timeout));
        let dns = Arc::new(SystemResolver::new(config.dns.timeout));
        Self {
            config,
            observer: Arc::new(TracingObserver),
            prober,
            dns,
            sources: None,
            extra_rules: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_dns(mut self, dns: Arc<dyn HostResolver>) -> Self {
        self.dns = dns;
        self
    }

    /// Replaces the default passive sources. May be called repeatedly.
    pub fn with_source(mut self, source: Box<dyn PassiveSource>) -> Self {
        self.sources.get_or_insert_with(Vec::new).push(source);
        self
    }

    /// Registers an additional rule next to the built-in ones. The factory
    /// receives the bus so the rule's action can publish.
    pub fn with_rule<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(Bus) -> Rule + Send + 'static,
    {
        self.extra_rules.push(Box::new(factory));
        self
    }

    /// Full pipeline: discover live subdomains of `domain`, then scan them.
    pub async fn run(self, domain: &Domain) -> Result<ReconReport, Error> {
        let mut session = self.start()?;

        let (subdomains, targets) = match session.discover(domain).await {
            Ok(planned) => planned,
            Err(e) => {
                session.abort(&e).await;
                return Err(e);
            }
        };

        let mut report = session.execute(targets).await?;
        report.domain = Some(domain.to_string());
        report.subdomains = subdomains;
        Ok(report)
    }

    /// Skips discovery and scans `targets` directly.
    pub async fn scan(self, targets: Vec<ScanTarget>) -> Result<ReconReport, Error> {
        self.start()?.execute(targets).await
    }

    fn start(self) -> Result<Session, Error> {
        let collector = Arc::new(Collector::default());
        let observer: Arc<dyn Observer> = Arc::new(
            Fanout::new()
                .with(collector.clone())
                .with(Arc::clone(&self.observer)),
        );

        let mut engine = DecisionEngine::with_observer(self.config.bus_capacity, Arc::clone(&observer));
        let analyzer = Arc::new(HttpAnalyzer::new(engine.bus(), &self.config.http)?);
        let hunter = Arc::new(FileHunter::new(engine.bus(), &self.config.http)?);
        engine.register(rules::web_discovery(analyzer, self.config.web_ports.clone()));
        engine.register(rules::context_hunter(hunter));
        for factory in self.extra_rules {
            engine.register(factory(engine.bus()));
        }

        let handle = engine.start();
        Ok(Session {
            limiter: ConcurrencyLimiter::new(self.config.global_concurrency),
            scans: Barrier::new("scans"),
            phase: Phase::Scanning,
            config: self.config,
            observer,
            collector,
            prober: self.prober,
            dns: self.dns,
            sources: self.sources,
            handle,
        })
    }
}

/// A started engine plus everything needed to drive it to `Closed`.
struct Session {
    config: Config,
    observer: Arc<dyn Observer>,
    collector: Arc<Collector>,
    prober: Arc<dyn Prober>,
    dns: Arc<dyn HostResolver>,
    sources: Option<Vec<Box<dyn PassiveSource>>>,
    limiter: ConcurrencyLimiter,
    scans: Barrier,
    phase: Phase,
    handle: EngineHandle,
}

impl Session {
    async fn discover(&mut self, domain: &Domain) -> Result<(Vec<String>, Vec<ScanTarget>), Error> {
        let subdomains = self.resolver()?.resolve(domain).await?;
        let targets = self.plan(&subdomains)?;
        Ok((subdomains, targets))
    }

    fn resolver(&mut self) -> Result<SubdomainResolver, Error> {
        let mut resolver = SubdomainResolver::new(
            self.handle.bus(),
            Arc::clone(&self.dns),
            self.config.dns.clone(),
            self.config.sources.clone(),
        );
        if self.config.no_passive {
            return Ok(resolver);
        }

        match self.sources.take() {
            Some(sources) => {
                for source in sources {
                    resolver = resolver.with_source(source);
                }
            }
            None => {
                let client = Client::builder()
                    .timeout(self.config.sources.request_timeout)
                    .user_agent(self.config.http.user_agent.as_str())
                    .build()
                    .map_err(|e| Error::HttpClient(e.to_string()))?;
                resolver = resolver.with_default_sources(client);
            }
        }
        Ok(resolver)
    }

    /// Chooses the port universe for every live host.
    fn plan(&self, hosts: &[String]) -> Result<Vec<ScanTarget>, Error> {
        if let Some(ports) = &self.config.ports {
            return Ok(hosts
                .iter()
                .map(|host| ScanTarget::with_ports(host, ports.clone()))
                .collect());
        }
        let selection = if self.config.deep {
            TargetSelection::DeepAll
        } else {
            self.config.selection.clone()
        };
        selection.apply(hosts)
    }

    async fn execute(mut self, targets: Vec<ScanTarget>) -> Result<ReconReport, Error> {
        let bus = self.handle.bus();
        let total: u64 = targets.iter().map(|t| t.ports.len() as u64).sum();
        bus.log(format!("Phase 2: scanning {} targets ({total} probes)", targets.len()));
        self.observer.on_progress(0, total);

        let scanner = Arc::new(PortScanner::new(
            bus.clone(),
            Arc::clone(&self.prober),
            self.limiter.clone(),
            self.config.scan.clone(),
        ));
        let progress = self.progress_sink(total);

        let mut tasks = JoinSet::new();
        for target in targets {
            let guard = self.scans.enter();
            let scanner = Arc::clone(&scanner);
            let progress = Arc::clone(&progress);
            tasks.spawn(async move {
                let _guard = guard;
                let open = scanner.scan(&target, progress).await;
                (target, open)
            });
        }

        let scanned = self.advance(tasks).await;
        let collector = Arc::clone(&self.collector);
        let dispatch = self.close().await?;
        let targets = scanned?;
        let (services, findings) = collector.take();

        Ok(ReconReport {
            domain: None,
            subdomains: Vec::new(),
            targets,
            services,
            findings,
            dispatch,
        })
    }

    /// Scanning → Reacting → Draining. Returns the per-target scan results,
    /// or the first scan error once every wave has settled.
    async fn advance(
        &mut self,
        mut tasks: JoinSet<(ScanTarget, Result<Vec<u16>, Error>)>,
    ) -> Result<Vec<TargetReport>, Error> {
        self.scans.await_zero().await;

        let mut results = Vec::new();
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((target, Ok(open_ports))) => results.push(TargetReport {
                    deep: target.is_deep(),
                    host: target.host,
                    open_ports,
                }),
                Ok((target, Err(e))) => {
                    error!(target = %target.host, error = %e, "scan aborted");
                    failure.get_or_insert(e);
                }
                Err(e) => error!(error = %e, "scan task panicked"),
            }
        }
        results.sort_by(|a, b| a.host.cmp(&b.host));
        self.transition(Phase::Reacting);
        self.settle_reactions().await;
        self.transition(Phase::Draining);

        match failure {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }

    /// Reactions may cascade; a wave is only over when the count stays at zero.
    async fn settle_reactions(&self) {
        let reactions = self.handle.reactions();
        loop {
            reactions.await_zero().await;
            tokio::task::yield_now().await;
            if reactions.pending() == 0 {
                break;
            }
        }
    }

    /// Shuts the engine down after discovery failed, before any scan ran.
    async fn abort(mut self, cause: &Error) {
        error!(error = %cause, "discovery failed");
        self.settle_reactions().await;
        self.transition(Phase::Draining);
        if let Err(e) = self.close().await {
            error!(error = %e, "engine shutdown failed");
        }
    }

    /// Draining → Closed.
    async fn close(mut self) -> Result<DispatchReport, Error> {
        let dispatch = self.handle.shutdown().await?;
        self.phase = Phase::Closed;
        info!(phase = %self.phase, events = dispatch.events, "run complete");
        if dispatch.rejected_after_close > 0 {
            error!(rejected = dispatch.rejected_after_close, "events were published after the bus closed");
        }
        Ok(dispatch)
    }

    fn transition(&mut self, next: Phase) {
        info!(from = %self.phase, to = %next, "phase transition");
        self.handle.bus().log(format!("Phase: {next}"));
        self.phase = next;
    }

    /// Turns per-scan batches into run-wide `(completed, total)` updates.
    fn progress_sink(&self, total: u64) -> ProgressSink {
        let completed = Arc::new(AtomicU64::new(0));
        let observer = Arc::clone(&self.observer);
        Arc::new(move |batch: usize| {
            let done = completed.fetch_add(batch as u64, Ordering::SeqCst) + batch as u64;
            observer.on_progress(done, total);
        })
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
