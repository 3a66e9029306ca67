//! Error types for the transport.
//!
//! # Design
//! Three separate types instead of one catch-all enum, because callers react
//! to them differently: `ConfigError` is raised before any I/O and means the
//! program is miswired; `AuthError` means the flush never reached the server
//! and the outbound payload is still buffered; `TransportError` covers
//! everything that can happen once the request is on the wire. Nothing here
//! is retried internally — the caller decides whether to re-run the RPC.

use thiserror::Error;

/// A required construction parameter was empty. Raised by [`crate::Endpoint::new`]
/// before any network or subprocess activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint parameter `{name}` must not be empty")]
    EmptyParameter { name: &'static str },
}

/// Failures in the Kerberos credential lifecycle or the SPNEGO exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credential cache could not be queried at all (tool missing,
    /// permission denied). An empty cache is *not* this error — that is a
    /// routine "no tickets" answer.
    #[error("credential cache query failed: {0}")]
    CacheQuery(String),

    /// Ticket acquisition reported diagnostics. Carries the acquisition
    /// tool's error output verbatim.
    #[error("ticket acquisition failed: {0}")]
    Acquisition(String),

    /// The negotiation mechanism could not produce or accept a token, or the
    /// server rejected the negotiated credentials.
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// The server never proved its own identity in the final negotiation leg.
    #[error("mutual authentication failed: {0}")]
    MutualAuthentication(String),
}

/// Errors surfaced by [`crate::Transport::flush`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// Authentication failed before the request was sent. The outbound
    /// buffer is untouched; a later flush will resend it.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The server answered with a non-2xx status after authentication.
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    /// Connection-level failure from the HTTP client (refused connection,
    /// TLS failure, truncated response). The captured payload is gone.
    #[error("network error: {0}")]
    Network(String),
}
