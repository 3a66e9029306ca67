//! HTTP collaborator contract.
//!
//! # Design
//! These types describe one HTTP exchange as plain data. The transport builds
//! an `HttpRequest` and interprets an `HttpResponse`; the [`HttpClient`]
//! collaborator owns everything in between — connection handling, the
//! authentication handshake, TLS. Unit tests substitute a recording fake and
//! never touch the network.
//!
//! Cookies ride in their own field rather than inside `headers` so the
//! transport can treat them as an opaque key/value set; rendering them into a
//! `Cookie` header (and pulling them back out of `Set-Cookie`) is the
//! client's job.

use crate::error::TransportError;

/// An HTTP POST described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// An HTTP response described as plain data. `cookies` holds the key/value
/// pairs extracted from any `Set-Cookie` headers; the raw headers are kept
/// alongside for collaborators that need them.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Executes one authenticated POST exchange.
pub trait HttpClient {
    fn post(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Render cookie pairs into a `Cookie` header value.
pub fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extract the leading `name=value` pair from a `Set-Cookie` header value,
/// dropping attributes such as `Path` or `HttpOnly`.
pub fn parse_set_cookie(value: &str) -> Option<(String, String)> {
    let pair = value.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_joins_pairs() {
        let cookies = vec![
            ("a".to_string(), "1".to_string()),
            ("session".to_string(), "abc".to_string()),
        ];
        assert_eq!(cookie_header(&cookies), "a=1; session=abc");
    }

    #[test]
    fn cookie_header_empty_set() {
        assert_eq!(cookie_header(&[]), "");
    }

    #[test]
    fn parse_set_cookie_strips_attributes() {
        let parsed = parse_set_cookie("session=abc123; Path=/; HttpOnly");
        assert_eq!(parsed, Some(("session".to_string(), "abc123".to_string())));
    }

    #[test]
    fn parse_set_cookie_plain_pair() {
        assert_eq!(
            parse_set_cookie("a=1"),
            Some(("a".to_string(), "1".to_string()))
        );
    }

    #[test]
    fn parse_set_cookie_rejects_nameless() {
        assert_eq!(parse_set_cookie("=1"), None);
        assert_eq!(parse_set_cookie("no-equals-here"), None);
    }
}
