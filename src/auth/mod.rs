pub mod supabase;

use std::collections::{HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use thiserror::Error;
use tracing::warn;

use crate::database::Access;
use crate::error::ApiError;

pub use supabase::SupabaseAuth;

/// Cookie the web client stores the session access token in.
pub const SESSION_COOKIE: &str = "sb-access-token";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Auth service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Auth service unreachable: {0}")]
    Transport(String),

    #[error("Unexpected auth response: {0}")]
    Decode(String),
}

/// The authenticated identity making a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub email: Option<String>,
    token: String,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: Option<String>, token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email,
            token: token.into(),
        }
    }

    /// Persistence credential scoped to this principal.
    pub fn access(&self) -> Access {
        Access::User {
            token: self.token.clone(),
        }
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Request-scoped authentication state, attached by the session middleware.
#[derive(Clone, Debug, Default)]
pub struct Session {
    principal: Option<Principal>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// The caller, or `Unauthorized` when no identity was resolved.
    pub fn require(&self) -> Result<&Principal, ApiError> {
        self.principal.as_ref().ok_or(ApiError::Unauthorized)
    }

    /// Persistence credential for this request: the caller's, or anonymous.
    pub fn access(&self) -> Access {
        self.principal
            .as_ref()
            .map(Principal::access)
            .unwrap_or(Access::Anonymous)
    }
}

/// Identity lookups against the external auth service.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Who owns this access token. `Ok(None)` for invalid or expired tokens.
    async fn resolve(&self, token: &str) -> Result<Option<Principal>, AuthError>;

    /// Whether a principal with this id exists. Uses the elevated credential.
    async fn principal_exists(&self, id: &str) -> Result<bool, AuthError>;
}

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve the caller from transport-level session state. Fails closed: any
/// lookup failure yields no principal.
pub async fn resolve_principal(resolver: &dyn SessionResolver, headers: &HeaderMap) -> Option<Principal> {
    let token = session_token(headers)?;
    match resolver.resolve(&token).await {
        Ok(principal) => principal,
        Err(e) => {
            warn!(error = %e, "session resolution failed, treating caller as anonymous");
            None
        }
    }
}

/// Fixed token table. Used by tests and local runs without the auth service.
#[derive(Default)]
pub struct StaticSessions {
    tokens: HashMap<String, (String, Option<String>)>,
    known: HashSet<String>,
}

impl StaticSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, id: &str, email: Option<&str>) -> Self {
        self.tokens
            .insert(token.to_string(), (id.to_string(), email.map(str::to_string)));
        self.known.insert(id.to_string());
        self
    }

    /// A principal that exists but holds no session token.
    pub fn with_registered(mut self, id: &str) -> Self {
        self.known.insert(id.to_string());
        self
    }
}

#[async_trait]
impl SessionResolver for StaticSessions {
    async fn resolve(&self, token: &str) -> Result<Option<Principal>, AuthError> {
        Ok(self
            .tokens
            .get(token)
            .map(|(id, email)| Principal::new(id.clone(), email.clone(), token)))
    }

    async fn principal_exists(&self, id: &str) -> Result<bool, AuthError> {
        Ok(self.known.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    struct Unreachable;

    #[async_trait]
    impl SessionResolver for Unreachable {
        async fn resolve(&self, _token: &str) -> Result<Option<Principal>, AuthError> {
            Err(AuthError::Transport("connection refused".into()))
        }

        async fn principal_exists(&self, _id: &str) -> Result<bool, AuthError> {
            Err(AuthError::Transport("connection refused".into()))
        }
    }

    #[test]
    fn bearer_token_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_token_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sb-access-token=xyz; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_malformed_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(session_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn session_require_fails_closed() {
        let err = Session::anonymous().require().unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(Session::anonymous().access(), Access::Anonymous);

        let principal = Principal::new("u1", None, "tok");
        let session = Session::authenticated(principal.clone());
        assert_eq!(session.require().unwrap(), &principal);
        assert_eq!(session.access(), Access::User { token: "tok".into() });
    }

    #[tokio::test]
    async fn resolver_failure_resolves_to_none() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(resolve_principal(&Unreachable, &headers).await.is_none());
    }

    #[tokio::test]
    async fn static_sessions_resolve_known_tokens() {
        let sessions = StaticSessions::new()
            .with_user("tok-1", "user-1", Some("one@example.com"))
            .with_registered("user-2");

        let principal = sessions.resolve("tok-1").await.unwrap().unwrap();
        assert_eq!(principal.id, "user-1");
        assert!(sessions.resolve("nope").await.unwrap().is_none());
        assert!(sessions.principal_exists("user-2").await.unwrap());
        assert!(!sessions.principal_exists("user-3").await.unwrap());
    }
}
