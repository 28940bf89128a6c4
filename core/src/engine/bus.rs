use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use recce_common::Error;
use recce_common::event::Event;
use tokio::sync::mpsc;
use tracing::error;

use super::observer::Observer;
use super::rule::Rule;
use crate::barrier::{Barrier, WaveGuard};

/// What travels over the engine channel.
pub(crate) enum Envelope {
    /// An event plus the reaction ticket that keeps the wave open until the
    /// dispatch loop has handed it to every matching rule.
    Event { event: Event, ticket: WaveGuard },
    /// A rule added while the loop is running. Applies to events queued after it.
    Register(Rule),
}

/// Cloneable publishing handle onto the decision engine.
///
/// Every scanner and rule action publishes through a `Bus`. Closing it is the
/// orchestrator's job; publishing afterwards is an error, never a silent drop.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

struct BusInner {
    sender: Mutex<Option<mpsc::Sender<Envelope>>>,
    reactions: Barrier,
    rejected: AtomicUsize,
    observer: Arc<dyn Observer>,
}

impl Bus {
    pub(crate) fn new(
        sender: mpsc::Sender<Envelope>,
        reactions: Barrier,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            inner: Arc::new(BusInner {
                sender: Mutex::new(Some(sender)),
                reactions,
                rejected: AtomicUsize::new(0),
                observer,
            }),
        }
    }

    /// Queues `event`, waiting for buffer space when the bus is saturated.
    pub async fn publish(&self, event: Event) -> Result<(), Error> {
        let (sender, ticket) = self.reserve(&event)?;
        sender
            .send(Envelope::Event { event, ticket })
            .await
            .map_err(|_| Error::DispatchStopped)
    }

    /// Queues `event` from a background task and returns at once.
    ///
    /// The reaction ticket is taken before returning, so the event is already
    /// accounted for even though the send has not happened yet.
    pub fn publish_detached(&self, event: Event) -> Result<(), Error> {
        let (sender, ticket) = self.reserve(&event)?;
        tokio::spawn(async move {
            if sender.send(Envelope::Event { event, ticket }).await.is_err() {
                error!("dispatch loop stopped before a detached event was delivered");
            }
        });
        Ok(())
    }

    /// Adds a rule to a running engine through the same FIFO channel as events.
    pub async fn register(&self, rule: Rule) -> Result<(), Error> {
        let Some(sender) = self.sender() else {
            error!(rule = %rule.name, "rule registered after the bus was closed");
            return Err(Error::RegisterAfterClose(rule.name));
        };
        sender
            .send(Envelope::Register(rule))
            .await
            .map_err(|_| Error::DispatchStopped)
    }

    /// Sends a message to the observer without going through the rule set.
    pub fn log(&self, message: impl AsRef<str>) {
        self.inner.observer.on_log(message.as_ref());
    }

    pub fn observer(&self) -> Arc<dyn Observer> {
        Arc::clone(&self.inner.observer)
    }

    pub fn is_closed(&self) -> bool {
        self.sender().is_none()
    }

    /// Publishes refused because the bus was already closed.
    pub fn rejected(&self) -> usize {
        self.inner.rejected.load(Ordering::SeqCst)
    }

    /// Drops the master sender. Sends already in progress still complete; the
    /// channel closes once the last of them finishes.
    pub(crate) fn close(&self) {
        self.lock().take();
    }

    fn reserve(&self, event: &Event) -> Result<(mpsc::Sender<Envelope>, WaveGuard), Error> {
        match self.sender() {
            Some(sender) => Ok((sender, self.inner.reactions.enter())),
            None => {
                self.inner.rejected.fetch_add(1, Ordering::SeqCst);
                error!(
                    kind = %event.kind,
                    target = %event.target,
                    payload = %event.payload,
                    "event published after the bus was closed"
                );
                Err(Error::PublishAfterClose {
                    kind: event.kind,
                    target: event.target.clone(),
                })
            }
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<Envelope>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<mpsc::Sender<Envelope>>> {
        self.inner.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
