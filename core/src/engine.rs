//! # Decision Engine
//!
//! The hub every other component publishes to. A single dispatch loop pulls
//! events off a bounded channel in FIFO order, shows each one to the observer,
//! then evaluates every rule against it. Matching actions are spawned as
//! independent tasks; they never run inline, because an action may publish back
//! into the channel the loop is draining.
//!
//! Rules registered with [`DecisionEngine::register`] form the snapshot the loop
//! starts with. Later additions go through [`Bus::register`] and are serialized
//! with the events themselves.
//!
//! The loop ends when the bus is closed *and* the buffer is drained.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use recce_common::Error;
use recce_common::event::{Event, EventKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::barrier::Barrier;

mod bus;
mod observer;
mod rule;

use bus::Envelope;
pub use bus::Bus;
pub use observer::{Fanout, Observer, TracingObserver};
pub use rule::{Action, Condition, Rule};

/// Counters collected by the dispatch loop over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub events: usize,
    pub by_kind: BTreeMap<EventKind, usize>,
    /// Number of actions spawned per rule name.
    pub triggered: BTreeMap<String, usize>,
    /// Rule conditions that panicked and were skipped.
    pub faulted: usize,
    /// Publishes refused because they arrived after close.
    pub rejected_after_close: usize,
}

impl DispatchReport {
    pub fn triggered(&self, rule: &str) -> usize {
        self.triggered.get(rule).copied().unwrap_or(0)
    }
}

pub struct DecisionEngine {
    rules: Vec<Rule>,
    bus: Bus,
    reactions: Barrier,
    rx: mpsc::Receiver<Envelope>,
}

impl DecisionEngine {
    pub fn new(capacity: usize) -> Self {
        Self::with_observer(capacity, Arc::new(TracingObserver))
    }

    pub fn with_observer(capacity: usize, observer: Arc<dyn Observer>) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let reactions = Barrier::new("reactions");
        Self {
            rules: Vec::new(),
            bus: Bus::new(tx, reactions.clone(), observer),
            reactions,
            rx,
        }
    }

    pub fn register(&mut self, rule: Rule) {
        debug!(rule = %rule.name, "rule registered");
        self.rules.push(rule);
    }

    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Counts queued events plus running actions. Zero means the engine is idle.
    pub fn reactions(&self) -> Barrier {
        self.reactions.clone()
    }

    pub fn log(&self, message: impl AsRef<str>) {
        self.bus.log(message);
    }

    /// Spawns the dispatch loop.
    pub fn start(self) -> EngineHandle {
        info!(rules = self.rules.len(), "decision engine started, listening for events");
        let task = tokio::spawn(dispatch(
            self.rx,
            self.rules,
            self.bus.observer(),
            self.reactions.clone(),
        ));
        EngineHandle {
            bus: self.bus,
            reactions: self.reactions,
            task,
        }
    }
}

/// A running engine.
pub struct EngineHandle {
    bus: Bus,
    reactions: Barrier,
    task: JoinHandle<DispatchReport>,
}

impl EngineHandle {
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    pub fn reactions(&self) -> Barrier {
        self.reactions.clone()
    }

    /// Closes the bus and waits for the loop to drain what is still buffered.
    ///
    /// Callers must first prove that no producer will publish again; anything
    /// published after this point is rejected and counted.
    pub async fn shutdown(self) -> Result<DispatchReport, Error> {
        self.bus.close();
        let mut report = self.task.await.map_err(|_| Error::DispatchStopped)?;
        report.rejected_after_close = self.bus.rejected();
        info!(events = report.events, "decision engine stopped");
        Ok(report)
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<Envelope>,
    mut rules: Vec<Rule>,
    observer: Arc<dyn Observer>,
    reactions: Barrier,
) -> DispatchReport {
    let mut report = DispatchReport::default();

    while let Some(envelope) = rx.recv().await {
        match envelope {
            Envelope::Register(rule) => {
                debug!(rule = %rule.name, "rule registered at runtime");
                rules.push(rule);
            }
            Envelope::Event { event, ticket } => {
                report.events += 1;
                *report.by_kind.entry(event.kind).or_default() += 1;
                observer.on_event(&event);
                debug!(kind = %event.kind, target = %event.target, payload = %event.payload, "received event");

                for rule in &rules {
                    if !evaluate(rule, &event, &mut report) {
                        continue;
                    }
                    debug!(rule = %rule.name, "rule triggered");
                    *report.triggered.entry(rule.name.clone()).or_default() += 1;

                    let guard = reactions.enter();
                    let action = rule.action();
                    let event = event.clone();
                    tokio::spawn(async move {
                        let _guard = guard;
                        action(event).await;
                    });
                }

                // Every matching action holds its own guard by now.
                drop(ticket);
            }
        }
    }

    report
}

fn evaluate(rule: &Rule, event: &Event, report: &mut DispatchReport) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| rule.matches(event))) {
        Ok(matched) => matched,
        Err(_) => {
            error!(rule = %rule.name, kind = %event.kind, "rule condition panicked, skipping");
            report.faulted += 1;
            false
        }
    }
}
