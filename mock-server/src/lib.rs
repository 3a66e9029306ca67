//! Stand-in for an RPC endpoint fronted by SPNEGO-style authentication.
//!
//! `POST /rpc` echoes the request body, but only after the standard
//! challenge dance: a request without credentials gets `401` with a bare
//! `WWW-Authenticate: Negotiate`, a request answering with the expected
//! client token gets `200` carrying the server's own token (mutual
//! authentication material) and a fresh session cookie, and a request
//! presenting a previously issued session cookie is served without any
//! token exchange. Tokens are fixed test vectors, not real Kerberos.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Raw token the server accepts from clients.
pub const CLIENT_TOKEN: &[u8] = b"krb-client-proof";
/// Raw token the server returns for mutual authentication.
pub const SERVER_TOKEN: &[u8] = b"krb-server-proof";

#[derive(Default)]
pub struct ServerState {
    sessions: Vec<String>,
    rpc_calls: usize,
    challenges: usize,
}

/// Counters exposed on `GET /state` so tests can assert on server-side
/// behavior they cannot observe from the client.
#[derive(Debug, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub rpc_calls: usize,
    pub challenges: usize,
    pub sessions: usize,
}

pub type SharedState = Arc<RwLock<ServerState>>;

pub fn app() -> Router {
    let state: SharedState = Arc::default();
    Router::new()
        .route("/rpc", post(rpc))
        .route("/rpc-no-mutual", post(rpc_no_mutual))
        .route("/state", get(state_snapshot))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn rpc(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, HeaderMap, Bytes) {
    let mut state = state.write().await;

    if let Some(session) = session_cookie(&headers) {
        if state.sessions.contains(&session) {
            state.rpc_calls += 1;
            return (StatusCode::OK, HeaderMap::new(), body);
        }
    }

    match negotiate_token(&headers) {
        Some(token) if token == CLIENT_TOKEN => {
            state.rpc_calls += 1;
            let session = Uuid::new_v4().to_string();
            let mut response_headers = HeaderMap::new();
            response_headers.insert(
                header::WWW_AUTHENTICATE,
                header_value(&format!(
                    "Negotiate {}",
                    BASE64_STANDARD.encode(SERVER_TOKEN)
                )),
            );
            response_headers.insert(
                header::SET_COOKIE,
                header_value(&format!("session={session}; HttpOnly")),
            );
            state.sessions.push(session);
            (StatusCode::OK, response_headers, body)
        }
        _ => (StatusCode::UNAUTHORIZED, challenge_headers(&mut state), Bytes::new()),
    }
}

/// Variant that never returns the mutual-authentication token. Exists so
/// clients can prove they reject such servers.
async fn rpc_no_mutual(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, HeaderMap, Bytes) {
    let mut state = state.write().await;
    match negotiate_token(&headers) {
        Some(token) if token == CLIENT_TOKEN => {
            state.rpc_calls += 1;
            (StatusCode::OK, HeaderMap::new(), body)
        }
        _ => (StatusCode::UNAUTHORIZED, challenge_headers(&mut state), Bytes::new()),
    }
}

async fn state_snapshot(State(state): State<SharedState>) -> Json<StateSnapshot> {
    let state = state.read().await;
    Json(StateSnapshot {
        rpc_calls: state.rpc_calls,
        challenges: state.challenges,
        sessions: state.sessions.len(),
    })
}

fn challenge_headers(state: &mut ServerState) -> HeaderMap {
    state.challenges += 1;
    let mut headers = HeaderMap::new();
    headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Negotiate"));
    headers
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).expect("ascii header value")
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookie = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "session").then(|| value.to_string())
    })
}

fn negotiate_token(headers: &HeaderMap) -> Option<Vec<u8>> {
    let authorization = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = authorization.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Negotiate") {
        return None;
    }
    BASE64_STANDARD.decode(token.trim()).ok()
}
