//! Kerberos-authenticated HTTP transport for binary RPC clients.
//!
//! # Overview
//! RPC stubs write opaque payload bytes into the transport, `flush` sends
//! them as a single HTTP POST to an endpoint fronted by SPNEGO-style
//! Kerberos authentication, and subsequent reads drain the captured response.
//! Before every flush the transport checks the host credential cache for a
//! ticket naming the configured principal and acquires one from a keytab when
//! missing. Session cookies issued by the server are replayed on every later
//! request.
//!
//! # Design
//! - `HttpTransport` holds all per-connection state: outbound buffer,
//!   response buffer, cookie set. One instance per concurrent RPC.
//! - The network, the credential cache, token cryptography, and diagnostics
//!   are collaborators behind traits (`HttpClient`, `CredentialCache`,
//!   `Authenticator`, `Diagnostics`), so tests run entirely in memory.
//! - `NegotiateClient` is the production HTTP collaborator: `ureq` plus the
//!   non-preemptive Negotiate handshake with mutual authentication.
//! - No retries anywhere: authentication and network failures propagate to
//!   the caller, who owns the retry decision.

pub mod credentials;
pub mod diag;
pub mod error;
pub mod http;
pub mod negotiate;
pub mod transport;

pub use credentials::{CredentialCache, CredentialManager, KinitCache};
pub use diag::{Diagnostics, TracingDiagnostics};
pub use error::{AuthError, ConfigError, TransportError};
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use negotiate::{AuthPolicy, Authenticator, Negotiate, NegotiateClient};
pub use transport::{Endpoint, HttpTransport, Transport, RPC_CONTENT_TYPE};
