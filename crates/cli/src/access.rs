//! Who may reach the data server and which origins it talks to.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use simlog_tabular::ResourceLocation;
use std::fmt;
use std::net::SocketAddr;

pub const AUTH_TOKEN_ENV: &str = "SIMLOG_AUTH_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("auth token must be non-empty")]
    BlankToken,

    #[error(
        "Refusing to bind to non-loopback address without --public: {0}. \
         To expose the data server, pass --public and set {AUTH_TOKEN_ENV} (or --auth-token)."
    )]
    NonLoopback(String),

    #[error("--public requires an auth token: set --auth-token or export {AUTH_TOKEN_ENV}")]
    PublicWithoutToken,

    #[error("Failed to resolve bind address {bind}: {source}")]
    Resolve {
        bind: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Bind address resolved to no socket addresses: {0}")]
    NoAddresses(String),

    #[error("Not an http(s) origin: {0}")]
    InvalidOrigin(String),
}

/// Shared secret clients send as `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(raw: &str) -> Result<Self, AccessError> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(AccessError::BlankToken);
        }
        Ok(Self(token.to_string()))
    }

    /// `--auth-token` wins over the environment.
    pub fn from_arg_or_env(arg: Option<&str>) -> Result<Option<Self>, AccessError> {
        match arg.map(str::to_string).or_else(|| std::env::var(AUTH_TOKEN_ENV).ok()) {
            Some(raw) => Self::new(&raw).map(Some),
            None => Ok(None),
        }
    }

    pub fn admits(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().strip_prefix("Bearer "))
            .is_some_and(|presented| same_secret(presented.trim(), &self.0))
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

/// Length leaks; content does not.
fn same_secret(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

/// Addresses `serve-http` will listen on, checked against `--public`.
#[derive(Debug)]
pub struct Exposure {
    pub addrs: Vec<SocketAddr>,
    pub token: Option<BearerToken>,
}

impl Exposure {
    /// Non-loopback binds need `--public`, and `--public` needs a token.
    pub async fn resolve(
        bind: &str,
        public: bool,
        token: Option<BearerToken>,
    ) -> Result<Self, AccessError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(bind)
            .await
            .map_err(|source| AccessError::Resolve {
                bind: bind.to_string(),
                source,
            })?
            .collect();
        if addrs.is_empty() {
            return Err(AccessError::NoAddresses(bind.to_string()));
        }
        if !public && addrs.iter().any(|addr| !addr.ip().is_loopback()) {
            return Err(AccessError::NonLoopback(bind.to_string()));
        }
        if public && token.is_none() {
            return Err(AccessError::PublicWithoutToken);
        }
        Ok(Self { addrs, token })
    }
}

/// An allow-list of `scheme://host[:port]` origins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Origins {
    #[default]
    Any,
    Only(Vec<String>),
}

impl Origins {
    pub fn none() -> Self {
        Self::Only(Vec::new())
    }

    /// Parses user-supplied origins; an empty list falls back to `default`.
    pub fn from_args(raw: &[String], default: Origins) -> Result<Self, AccessError> {
        if raw.is_empty() {
            return Ok(default);
        }
        raw.iter()
            .map(|origin| {
                ResourceLocation::parse(origin)
                    .ok()
                    .and_then(|location| location.origin())
                    .ok_or_else(|| AccessError::InvalidOrigin(origin.clone()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Only)
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(list) => list.iter().any(|allowed| allowed == origin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(authorization: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(authorization));
        headers
    }

    #[test]
    fn bearer_token_admits_only_matching_header() {
        let token = BearerToken::new("  secret  ").unwrap();
        assert!(token.admits(&headers("Bearer secret")));
        assert!(token.admits(&headers("Bearer  secret  ")));
        assert!(!token.admits(&headers("secret")));
        assert!(!token.admits(&headers("Bearer wrong")));
        assert!(!token.admits(&headers("Basic secret")));
        assert!(!token.admits(&HeaderMap::new()));
    }

    #[test]
    fn blank_token_is_rejected_and_debug_hides_secret() {
        assert!(matches!(BearerToken::new("   "), Err(AccessError::BlankToken)));
        let token = BearerToken::from_arg_or_env(Some("hunter2")).unwrap().unwrap();
        assert!(!format!("{token:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn exposure_guards_public_binds() {
        let local = Exposure::resolve("127.0.0.1:0", false, None).await.unwrap();
        assert!(local.addrs.iter().all(|addr| addr.ip().is_loopback()));

        let err = Exposure::resolve("0.0.0.0:0", false, None).await.unwrap_err();
        assert!(matches!(err, AccessError::NonLoopback(_)));

        let err = Exposure::resolve("0.0.0.0:0", true, None).await.unwrap_err();
        assert!(matches!(err, AccessError::PublicWithoutToken));

        let token = BearerToken::new("secret").unwrap();
        Exposure::resolve("0.0.0.0:0", true, Some(token)).await.unwrap();
    }

    #[test]
    fn origins_are_normalized_before_matching() {
        let raw = vec!["HTTP://Sim.Example:80/".to_string()];
        let origins = Origins::from_args(&raw, Origins::Any).unwrap();
        assert_eq!(origins, Origins::Only(vec!["http://sim.example".to_string()]));
        assert!(origins.allows("http://sim.example"));
        assert!(!origins.allows("http://other.example"));

        assert_eq!(Origins::from_args(&[], Origins::none()).unwrap(), Origins::none());
        assert!(!Origins::none().allows("http://sim.example"));
        assert!(Origins::Any.allows("http://anything"));

        let bad = vec!["data_dev/zone".to_string()];
        assert!(matches!(
            Origins::from_args(&bad, Origins::Any),
            Err(AccessError::InvalidOrigin(_))
        ));
    }
}
