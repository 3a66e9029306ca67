//! Byte-oriented RPC transport over Kerberos-authenticated HTTP.
//!
//! # Design
//! `HttpTransport` adapts the write/flush/read contract RPC stubs expect onto
//! independent HTTP POSTs. Writes accumulate in an outbound buffer with no
//! network effect; `flush` ensures a valid ticket, sends the whole buffer as
//! one request, and captures the full response for subsequent reads. Cookies
//! issued by the server ride along on every later request so load balancers
//! can pin the session.
//!
//! The transport is synchronous and single-threaded: one blocking round-trip
//! per flush, no internal concurrency, no shared-state locking. Callers that
//! need concurrent RPCs use one transport instance per in-flight call.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::credentials::CredentialManager;
use crate::error::{ConfigError, TransportError};
use crate::http::{HttpClient, HttpRequest};
use crate::negotiate::{AuthPolicy, Authenticator, NegotiateClient};

/// Content type of the opaque RPC payload.
pub const RPC_CONTENT_TYPE: &str = "application/x-thrift";

/// Immutable identity of the RPC endpoint: where to POST and how to
/// authenticate. Every field is required and validated before any I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    uri: String,
    service_host: String,
    principal: String,
    keytab: PathBuf,
}

impl Endpoint {
    pub fn new(
        uri: impl Into<String>,
        service_host: impl Into<String>,
        principal: impl Into<String>,
        keytab: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let endpoint = Self {
            uri: uri.into(),
            service_host: service_host.into(),
            principal: principal.into(),
            keytab: keytab.into(),
        };
        if endpoint.uri.is_empty() {
            return Err(ConfigError::EmptyParameter { name: "uri" });
        }
        if endpoint.service_host.is_empty() {
            return Err(ConfigError::EmptyParameter { name: "service_host" });
        }
        if endpoint.principal.is_empty() {
            return Err(ConfigError::EmptyParameter { name: "principal" });
        }
        if endpoint.keytab.as_os_str().is_empty() {
            return Err(ConfigError::EmptyParameter { name: "keytab" });
        }
        Ok(endpoint)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn service_host(&self) -> &str {
        &self.service_host
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn keytab(&self) -> &Path {
        &self.keytab
    }
}

/// Accumulates outbound bytes between flushes. Drained whole, exactly once
/// per flush — never partially.
#[derive(Debug, Default)]
struct OutboundBuffer(Vec<u8>);

impl OutboundBuffer {
    fn append(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

/// The most recent response body, consumed front to back.
#[derive(Debug, Default)]
struct InboundBuffer {
    data: Vec<u8>,
    pos: usize,
}

impl InboundBuffer {
    fn refill(&mut self, data: Vec<u8>) {
        self.data = data;
        self.pos = 0;
    }

    fn read(&mut self, size: usize) -> Vec<u8> {
        let end = self.pos.saturating_add(size).min(self.data.len());
        let chunk = self.data[self.pos..end].to_vec();
        self.pos = end;
        chunk
    }
}

/// Cookies issued by the server. Sticky: replaced only by a response that
/// carries at least one cookie, never cleared by one that carries none.
#[derive(Debug, Default)]
struct SessionCookies(Vec<(String, String)>);

impl SessionCookies {
    fn update_from(&mut self, cookies: Vec<(String, String)>) {
        if !cookies.is_empty() {
            self.0 = cookies;
        }
    }

    fn to_pairs(&self) -> Vec<(String, String)> {
        self.0.clone()
    }
}

/// The byte-oriented contract RPC stubs program against.
pub trait Transport {
    fn open(&mut self) -> Result<(), TransportError>;
    fn close(&mut self) -> Result<(), TransportError>;
    fn is_open(&self) -> bool;

    /// Append payload bytes. No network effect, no validation — the payload
    /// is opaque. Never fails.
    fn write(&mut self, bytes: &[u8]);

    /// Transmit everything written since the last flush as one request and
    /// capture the full response for `read`.
    fn flush(&mut self) -> Result<(), TransportError>;

    /// Return up to `size` bytes from the front of the current response,
    /// removing them. Returns fewer (down to none) once the response is
    /// exhausted; never blocks, never fetches more.
    fn read(&mut self, size: usize) -> Vec<u8>;

    /// Read exactly `size` bytes by accumulating short reads, stopping early
    /// only when the stream is exhausted.
    fn read_all(&mut self, size: usize) -> Vec<u8> {
        let mut collected = Vec::with_capacity(size);
        while collected.len() < size {
            let chunk = self.read(size - collected.len());
            if chunk.is_empty() {
                break;
            }
            collected.extend_from_slice(&chunk);
        }
        collected
    }
}

/// Transport carrying opaque RPC payloads over Kerberos-authenticated HTTP,
/// with session cookies preserved across calls.
pub struct HttpTransport {
    endpoint: Endpoint,
    credentials: CredentialManager,
    client: Box<dyn HttpClient>,
    outbound: OutboundBuffer,
    inbound: InboundBuffer,
    cookies: SessionCookies,
}

impl HttpTransport {
    /// Production wiring: Negotiate-authenticated HTTP client plus the
    /// platform `klist`/`kinit` credential tooling. The `authenticator` is
    /// the platform's GSSAPI/SSPI binding.
    pub fn new(endpoint: Endpoint, authenticator: Box<dyn Authenticator>) -> Self {
        let policy = AuthPolicy::required(endpoint.principal(), endpoint.service_host());
        let client = NegotiateClient::new(policy, authenticator);
        Self::with_collaborators(endpoint, Box::new(client), CredentialManager::platform())
    }

    /// Fully injected wiring for tests and embedders.
    pub fn with_collaborators(
        endpoint: Endpoint,
        client: Box<dyn HttpClient>,
        credentials: CredentialManager,
    ) -> Self {
        Self {
            endpoint,
            credentials,
            client,
            outbound: OutboundBuffer::default(),
            inbound: InboundBuffer::default(),
            cookies: SessionCookies::default(),
        }
    }
}

impl Transport for HttpTransport {
    /// Lifecycle no-op: no socket is held between calls, so the transport is
    /// always logically open.
    fn open(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }

    fn write(&mut self, bytes: &[u8]) {
        self.outbound.append(bytes);
    }

    /// One authenticated round-trip. An authentication failure propagates
    /// before the outbound buffer is touched, so the payload survives and a
    /// later flush resends it. Once the request is on the wire the payload
    /// is consumed — a network failure loses it, and callers must re-buffer
    /// before retrying. Any unread remainder of the previous response is
    /// silently replaced by the new one.
    fn flush(&mut self) -> Result<(), TransportError> {
        self.credentials
            .ensure_valid(self.endpoint.principal(), self.endpoint.keytab())?;

        let payload = self.outbound.take();
        let request = HttpRequest {
            url: self.endpoint.uri().to_string(),
            headers: vec![
                ("Host".to_string(), self.endpoint.service_host().to_string()),
                ("Content-Type".to_string(), RPC_CONTENT_TYPE.to_string()),
                ("Content-Length".to_string(), payload.len().to_string()),
            ],
            cookies: self.cookies.to_pairs(),
            body: payload,
        };

        let response = self.client.post(&request)?;
        self.inbound.refill(response.body);
        self.cookies.update_from(response.cookies);
        Ok(())
    }

    fn read(&mut self, size: usize) -> Vec<u8> {
        self.inbound.read(size)
    }
}
