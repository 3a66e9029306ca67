//! SPNEGO-authenticated HTTP client.
//!
//! # Design
//! [`NegotiateClient`] is the production [`HttpClient`]: it executes each
//! exchange over `ureq` and drives the HTTP Negotiate handshake. Token
//! cryptography stays outside this crate — the [`Authenticator`] collaborator
//! produces one [`Negotiate`] context per exchange (a GSSAPI/SSPI binding in
//! production, a scripted fake in tests), and this module only moves the
//! tokens: base64 in an `Authorization: Negotiate` header going out, base64
//! from `WWW-Authenticate` coming back.
//!
//! The default policy is non-preemptive with mutual authentication required:
//! the first request carries no credentials, a `401` challenge triggers the
//! handshake, and the final response must prove the server's identity with
//! its own token or the exchange fails.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};

use crate::error::{AuthError, TransportError};
use crate::http::{cookie_header, parse_set_cookie, HttpClient, HttpRequest, HttpResponse};

const NEGOTIATE_SCHEME: &str = "Negotiate";

/// How request authentication is negotiated.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    /// Client principal presented to the KDC, e.g. `client@REALM`.
    pub principal: String,
    /// Hostname used to derive the HTTP service principal, independent of
    /// the URI actually connected to.
    pub service_host: String,
    /// Require the server to prove its identity in the final leg.
    pub mutual: bool,
    /// Send the first token unprompted instead of waiting for a challenge.
    pub preemptive: bool,
}

impl AuthPolicy {
    /// The policy the transport always uses: mutual authentication required,
    /// non-preemptive.
    pub fn required(principal: impl Into<String>, service_host: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            service_host: service_host.into(),
            mutual: true,
            preemptive: false,
        }
    }
}

/// One negotiation context, scoped to a single HTTP exchange.
pub trait Negotiate {
    /// Produce the client token answering `challenge`. The first leg of a
    /// handshake passes an empty challenge.
    fn step(&mut self, challenge: &[u8]) -> Result<Vec<u8>, AuthError>;

    /// Verify the server's final token (mutual authentication).
    fn verify_server(&mut self, token: &[u8]) -> Result<(), AuthError>;
}

/// Creates [`Negotiate`] contexts bound to the principal/service pair in the
/// policy. Implemented by a platform GSSAPI/SSPI binding in production.
pub trait Authenticator {
    fn context(&self, policy: &AuthPolicy) -> Result<Box<dyn Negotiate>, AuthError>;
}

/// Production [`HttpClient`]: `ureq` plus the Negotiate handshake.
pub struct NegotiateClient {
    agent: ureq::Agent,
    policy: AuthPolicy,
    authenticator: Box<dyn Authenticator>,
}

impl NegotiateClient {
    pub fn new(policy: AuthPolicy, authenticator: Box<dyn Authenticator>) -> Self {
        Self::with_timeout(policy, authenticator, None)
    }

    /// `timeout` bounds each whole HTTP exchange at the agent level; the
    /// transport itself imposes none.
    pub fn with_timeout(
        policy: AuthPolicy,
        authenticator: Box<dyn Authenticator>,
        timeout: Option<Duration>,
    ) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            agent,
            policy,
            authenticator,
        }
    }

    fn execute(
        &self,
        request: &HttpRequest,
        authorization: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            // ureq derives Content-Length from the body it is handed.
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        let cookies = cookie_header(&request.cookies);
        if !cookies.is_empty() {
            builder = builder.header("Cookie", cookies.as_str());
        }
        if let Some(authorization) = authorization {
            builder = builder.header("Authorization", authorization);
        }

        let mut response = builder
            .send(&request.body[..])
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let cookies = headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, value)| parse_set_cookie(value))
            .collect();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            cookies,
            body,
        })
    }
}

impl HttpClient for NegotiateClient {
    fn post(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut context = None;
        let mut authorization = None;

        if self.policy.preemptive {
            let mut ctx = self.authenticator.context(&self.policy)?;
            let token = ctx.step(&[])?;
            authorization = Some(encode_authorization(&token));
            context = Some(ctx);
        }

        let first = self.execute(request, authorization.as_deref())?;
        let response = if first.status == 401 && context.is_none() {
            let challenge = negotiate_challenge(&first.headers).ok_or_else(|| {
                AuthError::Negotiation(
                    "server denied the request without offering a Negotiate challenge".to_string(),
                )
            })?;
            let mut ctx = self.authenticator.context(&self.policy)?;
            let token = ctx.step(&challenge)?;
            let answered = self.execute(request, Some(&encode_authorization(&token)))?;
            context = Some(ctx);
            answered
        } else {
            first
        };

        if response.status == 401 {
            return Err(AuthError::Negotiation(
                "server rejected the negotiated credentials".to_string(),
            )
            .into());
        }

        // The handshake only ran if a context exists; a cookie-backed 200
        // involves no tokens and therefore nothing to verify.
        if self.policy.mutual {
            if let Some(ctx) = context.as_mut() {
                let token = negotiate_challenge(&response.headers)
                    .filter(|token| !token.is_empty())
                    .ok_or_else(|| {
                        AuthError::MutualAuthentication(
                            "response carries no server token".to_string(),
                        )
                    })?;
                ctx.verify_server(&token)?;
            }
        }

        if !(200..300).contains(&response.status) {
            return Err(TransportError::Http {
                status: response.status,
                reason: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        Ok(response)
    }
}

fn encode_authorization(token: &[u8]) -> String {
    format!("{NEGOTIATE_SCHEME} {}", BASE64_STANDARD.encode(token))
}

/// Pull the Negotiate token out of a `WWW-Authenticate` header, if any.
/// A bare `Negotiate` challenge (the usual first leg) yields an empty token.
fn negotiate_challenge(headers: &[(String, String)]) -> Option<Vec<u8>> {
    headers.iter().find_map(|(name, value)| {
        if !name.eq_ignore_ascii_case("www-authenticate") {
            return None;
        }
        match value.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case(NEGOTIATE_SCHEME) => {
                BASE64_STANDARD.decode(token.trim()).ok()
            }
            None if value.trim().eq_ignore_ascii_case(NEGOTIATE_SCHEME) => Some(Vec::new()),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(value: &str) -> Vec<(String, String)> {
        vec![("WWW-Authenticate".to_string(), value.to_string())]
    }

    #[test]
    fn bare_challenge_yields_empty_token() {
        assert_eq!(negotiate_challenge(&header("Negotiate")), Some(Vec::new()));
    }

    #[test]
    fn challenge_token_is_base64_decoded() {
        let encoded = BASE64_STANDARD.encode(b"server-token");
        let headers = header(&format!("Negotiate {encoded}"));
        assert_eq!(negotiate_challenge(&headers), Some(b"server-token".to_vec()));
    }

    #[test]
    fn scheme_match_is_case_insensitive() {
        assert_eq!(negotiate_challenge(&header("negotiate")), Some(Vec::new()));
    }

    #[test]
    fn other_schemes_are_ignored() {
        assert_eq!(negotiate_challenge(&header("Basic realm=\"x\"")), None);
        assert_eq!(negotiate_challenge(&[]), None);
    }

    #[test]
    fn authorization_header_is_base64() {
        assert_eq!(
            encode_authorization(b"client-token"),
            format!("Negotiate {}", BASE64_STANDARD.encode(b"client-token"))
        );
    }

    #[test]
    fn required_policy_fixes_flags() {
        let policy = AuthPolicy::required("client@EXAMPLE.TEST", "svc.example.test");
        assert!(policy.mutual);
        assert!(!policy.preemptive);
    }
}
