//! Shared vocabulary of the `recce` workspace.
//!
//! Everything in here is plain data: the [`event::Event`] that flows through the
//! decision engine, the scan targets and port universes, the configuration tree
//! and the error type. No I/O happens in this crate.

pub mod config;
pub mod error;
pub mod event;
pub mod network;

pub use error::Error;

#[doc(hidden)]
pub use tracing as __tracing;

/// Logs a positive outcome (a live host, an open port, a finding).
///
/// Expands to an `info` event under the `recce::success` target so a terminal
/// formatter can render it differently from ordinary progress messages.
#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => {
        $crate::__tracing::info!(target: "recce::success", $($arg)+)
    };
}
