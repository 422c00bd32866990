use std::convert::Infallible;

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    guard::{self, LOGIN_PATH},
    library,
    models::{Credentials, ErrorBody, LoginResponse, LogoutResponse, RegisterRequest, UserProfile, UserRecord},
    navigation::ADMIN_ROOT,
    resource::{ResourceApi, ResourceError},
    session::{Role, Session, SessionStore},
    storage::StorageError,
    validation::{self, ValidationErrors},
};

// --- Session Extractors ---

/// CurrentSession
///
/// The session resolved for this request, if any. Never rejects: public
/// handlers use it to personalise, not to gate.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    SessionStore: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentSession(SessionStore::from_ref(state).read()))
    }
}

/// AuthSession
///
/// A session that must be present. Rejects with 401 otherwise, so handlers
/// taking it can rely on an authenticated actor.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    SessionStore: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        SessionStore::from_ref(state)
            .read()
            .map(AuthSession)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

// --- Route-Group Guards ---

async fn guard_request(required: Option<Role>, sessions: &SessionStore, request: Request, next: Next) -> Response {
    let session = sessions.read();
    let decision = guard::evaluate(required, session.as_ref());
    match decision.rejection_status() {
        Some(status) => {
            tracing::debug!(uri = %request.uri(), ?decision, "api request rejected by guard");
            status.into_response()
        }
        None => next.run(request).await,
    }
}

/// require_session
///
/// Middleware for the authenticated router: any signed-in actor passes.
pub async fn require_session(State(sessions): State<SessionStore>, request: Request, next: Next) -> Response {
    guard_request(None, &sessions, request, next).await
}

/// require_admin
///
/// Middleware for the admin router: only the `admin` role passes. A signed-in
/// user gets 403, an anonymous caller 401.
pub async fn require_admin(State(sessions): State<SessionStore>, request: Request, next: Next) -> Response {
    guard_request(Some(Role::Admin), &sessions, request, next).await
}

// --- Login / Signup / Logout Flows ---

/// AuthError
///
/// Failures of the login, signup and logout flows.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("form validation failed")]
    Invalid(ValidationErrors),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Invalid(errors) => (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response(),
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, Json(ErrorBody::new(self.to_string()))).into_response()
            }
            AuthError::EmailTaken => (StatusCode::CONFLICT, Json(ErrorBody::new(self.to_string()))).into_response(),
            AuthError::Resource(e) => {
                tracing::error!("resource API failure during authentication: {}", e);
                (e.status_code(), Json(ErrorBody::new(e.to_string()))).into_response()
            }
            AuthError::Storage(e) => {
                tracing::error!("session store failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new("Could not persist the session")),
                )
                    .into_response()
            }
        }
    }
}

/// Where an actor lands right after signing in.
pub fn landing_path(role: Role) -> &'static str {
    match role {
        Role::Admin => ADMIN_ROOT,
        Role::User => guard::DEFAULT_PATH,
    }
}

/// login
///
/// Looks the user up by email, checks the password, and persists the resulting
/// session. An unknown email and a wrong password are indistinguishable to the
/// caller.
pub async fn login(
    api: &dyn ResourceApi,
    sessions: &SessionStore,
    credentials: &Credentials,
) -> Result<LoginResponse, AuthError> {
    validation::validate_credentials(credentials).map_err(AuthError::Invalid)?;

    let user = library::find_user_by_email(api, credentials.email.trim())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if user.password != credentials.password {
        tracing::info!(user_id = %user.id, "login rejected: password mismatch");
        return Err(AuthError::InvalidCredentials);
    }

    let session = user.to_session().ok_or(AuthError::InvalidCredentials)?;
    sessions.write(&session)?;
    tracing::info!(user_id = %session.id, role = session.role.as_str(), "session established");

    Ok(LoginResponse {
        redirect_to: landing_path(session.role).to_string(),
        session,
    })
}

/// register
///
/// Creates a `user` account after validating the signup form and checking that
/// the email is not taken yet. Does not sign the new user in.
pub async fn register(api: &dyn ResourceApi, form: &RegisterRequest) -> Result<UserProfile, AuthError> {
    let form = form.trimmed();
    validation::validate_registration(&form).map_err(AuthError::Invalid)?;

    if library::find_user_by_email(api, &form.email).await?.is_some() {
        return Err(AuthError::EmailTaken);
    }

    let record = UserRecord {
        id: Uuid::new_v4().simple().to_string(),
        full_name: form.full_name,
        email: form.email,
        mobile_no: form.mobile_no,
        address: form.address,
        gender: form.gender,
        password: form.password,
        role: Role::User,
    };
    let created = library::create_user(api, &record).await?;
    tracing::info!(user_id = %created.id, "account registered");
    Ok(created.into())
}

/// logout
///
/// Clears the session. Signing out twice is fine.
pub fn logout(sessions: &SessionStore) -> Result<LogoutResponse, AuthError> {
    sessions.clear()?;
    Ok(LogoutResponse {
        redirect_to: LOGIN_PATH.to_string(),
    })
}
