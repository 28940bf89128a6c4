use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use recce_common::config::Config;
use recce_common::event::EventKind;
use recce_common::network::target::ScanTarget;
use recce_core::orchestrator::Orchestrator;
use recce_core::rules::{CONTEXT_HUNTER, WEB_DISCOVERY};
use recce_core::scanner::Prober;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Opens a fixed set of ports on any host, without touching the network.
struct FixtureProber(HashSet<u16>);

#[async_trait]
impl Prober for FixtureProber {
    async fn resolve(&self, _host: &str) -> Option<IpAddr> {
        Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    async fn probe(&self, addr: SocketAddr) -> bool {
        self.0.contains(&addr.port())
    }
}

/// Like [`FixtureProber`], but holds each probe briefly and records the
/// highest number of probes in flight at once.
struct PeakProber {
    open: HashSet<u16>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl PeakProber {
    fn new(open: &[u16]) -> Self {
        Self {
            open: open.iter().copied().collect(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Prober for PeakProber {
    async fn resolve(&self, _host: &str) -> Option<IpAddr> {
        Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    async fn probe(&self, addr: SocketAddr) -> bool {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.open.contains(&addr.port())
    }
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wordpress_site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Server", "Apache/2.4.58")
                .set_body_string(
                    "<html><head><title>Shop</title></head>\
                     <body><img src=\"/wp-content/uploads/logo.png\"></body></html>",
                ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.env"))
        .respond_with(ResponseTemplate::new(200).set_body_string("APP_KEY=base64:secret"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn quick_scan_triggers_web_discovery_once() {
    let report = Orchestrator::new(Config::default())
        .with_prober(Arc::new(FixtureProber([22, 80].into())))
        .scan(vec![ScanTarget::new("fixture.invalid", false)])
        .await
        .unwrap();

    assert_eq!(report.targets.len(), 1);
    assert_eq!(report.targets[0].open_ports, vec![22, 80]);
    assert_eq!(report.dispatch.by_kind[&EventKind::PortOpen], 2);
    assert_eq!(report.dispatch.triggered(WEB_DISCOVERY), 1);
    assert_eq!(report.dispatch.rejected_after_close, 0);
}

#[tokio::test]
async fn open_web_port_cascades_into_a_finding() {
    let server = wordpress_site().await;
    let web_port = server.address().port();
    let config = Config {
        web_ports: vec![web_port],
        ..Config::default()
    };

    let report = Orchestrator::new(config)
        .scan(vec![ScanTarget::with_ports(
            "127.0.0.1",
            vec![web_port, closed_port()],
        )])
        .await
        .unwrap();

    assert_eq!(report.targets[0].open_ports, vec![web_port]);

    assert_eq!(report.services.len(), 1);
    let service = &report.services[0];
    assert_eq!(service.port, web_port);
    assert!(service.server.contains("Apache"));
    assert_eq!(service.tech, "Apache, WordPress");

    let details: Vec<&str> = report.findings.iter().map(|f| f.detail.as_str()).collect();
    assert_eq!(details, vec!["Sensitive File: .env"]);

    assert_eq!(report.dispatch.triggered(WEB_DISCOVERY), 1);
    assert_eq!(report.dispatch.triggered(CONTEXT_HUNTER), 1);
    assert_eq!(report.dispatch.by_kind[&EventKind::VulnerabilityFound], 1);
    assert_eq!(report.dispatch.rejected_after_close, 0);

    // One fingerprint plus the ten-path Apache/WordPress checklist.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 11);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_targets_share_one_limiter() {
    let config = Config {
        global_concurrency: 3,
        web_ports: vec![],
        ..Config::default()
    };
    let targets = (1..=5)
        .map(|i| ScanTarget::with_ports(format!("host{i}.invalid"), (1..=40).collect()))
        .collect();
    let prober = Arc::new(PeakProber::new(&[7]));

    let report = Orchestrator::new(config)
        .with_prober(prober.clone())
        .scan(targets)
        .await
        .unwrap();

    assert_eq!(report.targets.len(), 5);
    assert!(report.targets.iter().all(|t| t.open_ports == vec![7]));
    assert_eq!(report.dispatch.events, 5);

    // Each target alone may run 40 probes; together they stay under the global cap.
    let peak = prober.peak.load(Ordering::SeqCst);
    assert!(peak >= 1);
    assert!(peak <= 3, "peak {peak} exceeded the global limit");
}
