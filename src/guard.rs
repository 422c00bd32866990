use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::session::{Role, Session};

/// Where unauthenticated navigation is sent.
pub const LOGIN_PATH: &str = "/login";
/// Where authenticated-but-unauthorized navigation is sent.
pub const DEFAULT_PATH: &str = "/";

/// Decision
///
/// Outcome of guarding a protected target. The guard only decides; the
/// navigation layer (or the API middleware) acts on the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    RedirectToDefault,
}

impl Decision {
    /// The path a navigation should be redirected to, if any.
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            Decision::Allow => None,
            Decision::RedirectToLogin => Some(LOGIN_PATH),
            Decision::RedirectToDefault => Some(DEFAULT_PATH),
        }
    }

    /// The status an API request is rejected with, if any. Keeps "not signed in"
    /// (401) apart from "signed in with the wrong role" (403).
    pub fn rejection_status(&self) -> Option<StatusCode> {
        match self {
            Decision::Allow => None,
            Decision::RedirectToLogin => Some(StatusCode::UNAUTHORIZED),
            Decision::RedirectToDefault => Some(StatusCode::FORBIDDEN),
        }
    }
}

/// role_satisfies
///
/// Role matching policy: exact equality. There is no hierarchy, so an admin does
/// not satisfy a `user`-only target and a user never satisfies an `admin` one.
pub fn role_satisfies(required: Role, actual: Role) -> bool {
    required == actual
}

/// evaluate
///
/// Decides whether a target guarded by `required` may be shown to `session`.
/// `required == None` means "any signed-in actor".
pub fn evaluate(required: Option<Role>, session: Option<&Session>) -> Decision {
    let Some(session) = session else {
        return Decision::RedirectToLogin;
    };

    match required {
        Some(role) if !role_satisfies(role, session.role) => Decision::RedirectToDefault,
        _ => Decision::Allow,
    }
}
