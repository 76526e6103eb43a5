use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

use crate::AppState;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Decides which identity a request's rating is stored under.
pub trait ClientKeyResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String>;
}

/// First entry of `X-Forwarded-For`, falling back to the socket peer.
///
/// The header is caller-controlled, so anyone can vote under any address
/// unless a trusted proxy rewrites it.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardedFor;

impl ClientKeyResolver for ForwardedFor {
    fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match forwarded {
            Some(first) => Some(first.to_string()),
            None => PeerAddr.resolve(headers, peer),
        }
    }
}

/// Socket peer address only; headers are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct PeerAddr;

impl ClientKeyResolver for PeerAddr {
    fn resolve(&self, _headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
        peer.map(|addr| addr.ip().to_string())
    }
}

pub fn resolver(trust_forwarded_for: bool) -> Arc<dyn ClientKeyResolver> {
    if trust_forwarded_for { Arc::new(ForwardedFor) } else { Arc::new(PeerAddr) }
}

/// The caller identity, if the configured resolver could determine one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientKey(pub Option<String>);

impl FromRequestParts<Arc<AppState>> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| *addr);
        Ok(ClientKey(state.client_keys.resolve(&parts.headers, peer)))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.7:51234".parse().unwrap())
    }

    fn forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn first_forwarded_entry_wins() {
        let key = ForwardedFor.resolve(&forwarded("203.0.113.9, 10.0.0.1"), peer());
        assert_eq!(key.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn empty_forwarded_header_falls_back_to_peer() {
        let key = ForwardedFor.resolve(&forwarded(""), peer());
        assert_eq!(key.as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn peer_resolver_ignores_header() {
        let key = PeerAddr.resolve(&forwarded("203.0.113.9"), peer());
        assert_eq!(key.as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn nothing_to_go_on() {
        assert_eq!(ForwardedFor.resolve(&HeaderMap::new(), None), None);
        assert_eq!(PeerAddr.resolve(&forwarded("203.0.113.9"), None), None);
    }
}
