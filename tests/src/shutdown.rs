use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use recce_common::config::Config;
use recce_common::event::{Event, EventKind};
use recce_common::network::target::ScanTarget;
use recce_common::Error;
use recce_core::engine::{Bus, Rule};
use recce_core::orchestrator::Orchestrator;
use recce_core::scanner::Prober;
use tokio::sync::oneshot;

struct OnePortOpen(u16);

#[async_trait]
impl Prober for OnePortOpen {
    async fn resolve(&self, _host: &str) -> Option<IpAddr> {
        Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    async fn probe(&self, addr: SocketAddr) -> bool {
        addr.port() == self.0
    }
}

fn config() -> Config {
    Config {
        web_ports: vec![],
        ..Config::default()
    }
}

/// A rule whose action hands its work to a task the barriers cannot see.
/// That task only publishes once the orchestrator has closed the bus.
#[tokio::test]
async fn publish_escaping_the_reaction_wave_is_surfaced() {
    let (tx, rx) = oneshot::channel::<Result<(), Error>>();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let captured: Arc<Mutex<Option<Bus>>> = Arc::new(Mutex::new(None));

    let report = Orchestrator::new(config())
        .with_prober(Arc::new(OnePortOpen(5432)))
        .with_rule({
            let captured = captured.clone();
            move |bus: Bus| {
                *captured.lock().unwrap() = Some(bus.clone());
                Rule::new(
                    "escapee",
                    |e: &Event| e.kind == EventKind::PortOpen,
                    move |e: Event| {
                        let bus = bus.clone();
                        let tx = tx.clone();
                        async move {
                            tokio::spawn(async move {
                                while !bus.is_closed() {
                                    tokio::time::sleep(Duration::from_millis(5)).await;
                                }
                                let result = bus
                                    .publish(Event::vulnerability(e.target, "too late"))
                                    .await;
                                if let Some(tx) = tx.lock().unwrap().take() {
                                    let _ = tx.send(result);
                                }
                            });
                        }
                    },
                )
            }
        })
        .scan(vec![ScanTarget::with_ports("db.invalid", vec![5432])])
        .await
        .unwrap();

    assert_eq!(report.dispatch.triggered("escapee"), 1);

    let late = tokio::time::timeout(Duration::from_secs(2), rx)
        .await
        .expect("escaped task should publish")
        .unwrap();
    assert!(matches!(
        late,
        Err(Error::PublishAfterClose {
            kind: EventKind::VulnerabilityFound,
            ..
        })
    ));

    let bus = captured.lock().unwrap().clone().unwrap();
    assert_eq!(bus.rejected(), 1);
    assert!(report.findings.is_empty());
}

/// The same work done inside the action is waited for and delivered.
#[tokio::test]
async fn publish_inside_the_action_is_delivered() {
    let report = Orchestrator::new(config())
        .with_prober(Arc::new(OnePortOpen(5432)))
        .with_rule(|bus: Bus| {
            Rule::new(
                "slow-reporter",
                |e: &Event| e.kind == EventKind::PortOpen,
                move |e: Event| {
                    let bus = bus.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        bus.publish(Event::vulnerability(e.target, "postgres exposed"))
                            .await
                            .unwrap();
                    }
                },
            )
        })
        .scan(vec![ScanTarget::with_ports("db.invalid", vec![5432])])
        .await
        .unwrap();

    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].detail, "postgres exposed");
    assert_eq!(report.dispatch.rejected_after_close, 0);
}
