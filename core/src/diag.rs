//! Diagnostics port.
//!
//! # Design
//! The transport never writes to a process-wide logger directly. Components
//! that emit diagnostics take a [`Diagnostics`] collaborator at construction,
//! so tests can assert on the exact events without capturing global output.
//! Production wiring uses [`TracingDiagnostics`].

/// Sink for diagnostic events emitted during credential handling.
pub trait Diagnostics: Send + Sync {
    fn debug(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards diagnostics to the `tracing` ecosystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}
