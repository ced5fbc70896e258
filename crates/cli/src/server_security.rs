//! Who may reach the wiki API: bind-address guard and bearer-token layer.

use crate::http_api::error_response;
use anyhow::{Context as AnyhowContext, Result};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

pub(crate) const AUTH_TOKEN_ENV: &str = "REPOWIKI_AUTH_TOKEN";

/// Shared secret expected in `Authorization: Bearer <token>`.
#[derive(Clone, Debug)]
pub struct ApiToken(Arc<str>);

impl ApiToken {
    /// `--auth-token` wins over `REPOWIKI_AUTH_TOKEN`; neither set means no auth.
    pub fn resolve(flag: Option<String>, env: Option<String>) -> Result<Option<Self>> {
        match flag.or(env) {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => {
                anyhow::bail!("auth token must be non-empty")
            }
            Some(raw) => Ok(Some(Self(Arc::from(raw.trim())))),
        }
    }

    fn admits(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().strip_prefix("Bearer "))
            .is_some_and(|presented| same_secret(presented.trim(), &self.0))
    }
}

/// Rejects requests without the configured bearer token; a no-op when the
/// server runs without one.
pub(crate) async fn require_bearer(
    State(token): State<Option<ApiToken>>,
    request: Request,
    next: Next,
) -> Response {
    match token {
        Some(token) if !token.admits(request.headers()) => {
            log::debug!("Rejected {} {}: bad bearer token", request.method(), request.uri());
            error_response(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing or invalid bearer token",
            )
        }
        _ => next.run(request).await,
    }
}

/// Picks the listen address for `bind`. Anything beyond loopback needs
/// `public`, and a public server needs a token.
pub(crate) async fn guarded_listen_addr(
    bind: &str,
    public: bool,
    token: Option<&ApiToken>,
) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(bind)
        .await
        .with_context(|| format!("Failed to resolve bind address: {bind}"))?
        .collect();

    if !public && addrs.iter().any(|addr| !addr.ip().is_loopback()) {
        anyhow::bail!(
            "Refusing to bind to non-loopback address without --public: {bind}. To expose the API, pass --public and set {AUTH_TOKEN_ENV} (or --auth-token)."
        )
    }
    if public && token.is_none() {
        anyhow::bail!(
            "--public requires an auth token: set --auth-token or export {AUTH_TOKEN_ENV}"
        )
    }

    addrs
        .iter()
        .copied()
        .find(SocketAddr::is_ipv4)
        .or_else(|| addrs.first().copied())
        .with_context(|| format!("Bind address resolved to zero socket addrs: {bind}"))
}

fn same_secret(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes()
            .zip(b.bytes())
            .fold(0u8, |diff, (x, y)| diff | (x ^ y))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn flag_token_beats_environment() {
        let token = ApiToken::resolve(Some(" flag ".into()), Some("env".into()))
            .unwrap()
            .unwrap();
        assert!(token.admits(&bearer("Bearer flag")));
        assert!(!token.admits(&bearer("Bearer env")));

        let token = ApiToken::resolve(None, Some("env".into())).unwrap().unwrap();
        assert!(token.admits(&bearer("Bearer env")));

        assert!(ApiToken::resolve(None, None).unwrap().is_none());
        assert!(ApiToken::resolve(Some("  ".into()), None).is_err());
    }

    #[test]
    fn only_bearer_scheme_is_admitted() {
        let token = ApiToken::resolve(Some("secret".into()), None).unwrap().unwrap();
        assert!(!token.admits(&bearer("secret")));
        assert!(!token.admits(&bearer("Basic secret")));
        assert!(!token.admits(&bearer("Bearer secrets")));
        assert!(!token.admits(&HeaderMap::new()));
    }

    #[tokio::test]
    async fn exposure_rules() {
        let token = ApiToken::resolve(Some("secret".into()), None).unwrap();

        guarded_listen_addr("127.0.0.1:0", false, None).await.unwrap();
        let err = guarded_listen_addr("0.0.0.0:0", false, token.as_ref())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Refusing to bind"));
        let err = guarded_listen_addr("0.0.0.0:0", true, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--public requires an auth token"));
        guarded_listen_addr("0.0.0.0:0", true, token.as_ref())
            .await
            .unwrap();
    }
}
