use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::session::{Session, SessionStore};

/// NavigationContext
///
/// Per-navigation evaluation context: the requested path and the session
/// resolved for it. Built once per request and handed explicitly to the
/// navigation layer, which never reads the session store itself.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationContext {
    pub path: String,
    pub session: Option<Session>,
}

/// Collapses empty segments so `//admin-dashboard/` and `/admin-dashboard` are
/// the same path for route matching and chrome selection alike.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

impl NavigationContext {
    /// Builds the context with `path` normalized.
    pub fn new(path: impl AsRef<str>, session: Option<Session>) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            session,
        }
    }
}

impl<S> FromRequestParts<S> for NavigationContext
where
    S: Send + Sync,
    SessionStore: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionStore::from_ref(state);
        Ok(Self::new(parts.uri.path(), sessions.read()))
    }
}
