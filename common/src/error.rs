use thiserror::Error;

use crate::event::EventKind;

#[derive(Error, Debug)]
pub enum Error {
    /// A producer tried to publish after the orchestrator closed the bus.
    ///
    /// This always means a producer escaped its completion barrier.
    #[error("event {kind} for {target} published after the bus was closed")]
    PublishAfterClose { kind: EventKind, target: String },
    #[error("rule '{0}' registered after the bus was closed")]
    RegisterAfterClose(String),
    #[error("dispatch loop is no longer running")]
    DispatchStopped,
    #[error("concurrency limiter has been closed")]
    LimiterClosed,
    #[error("invalid domain: {0}")]
    InvalidDomain(String),
    #[error("invalid target selection: {0}")]
    InvalidSelection(String),
    #[error("invalid port: {0}")]
    InvalidPort(String),
    #[error("malformed http service payload: {0}")]
    InvalidPayload(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}
