use crate::{
    AppState,
    auth::{self, AuthError, AuthSession, CurrentSession},
    context::NavigationContext,
    library::{self, BookFilter, RECENT_ACTIVITY_LIMIT, RECENT_BOOKS_LIMIT},
    models::{
        Activity, Book, BookInput, Credentials, DashboardStats, ErrorBody, IssueHistoryEntry,
        IssueRequest, IssuedBook, LoginResponse, LogoutResponse, ProfileUpdate, RegisterRequest,
        Review, ReviewRequest, UserProfile,
    },
    navigation::{self, Navigation},
    resource::ResourceError,
    session::{Role, Session},
    validation::{self, ValidationErrors},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

// --- Error Mapping ---

/// ApiError
///
/// Failure of a data-surface handler. Resource failures are logged here, once,
/// and answered with a short JSON notice; nothing is retried.
#[derive(Debug)]
pub enum ApiError {
    Invalid(ValidationErrors),
    Resource(ResourceError),
    Forbidden(&'static str),
}

impl From<ResourceError> for ApiError {
    fn from(e: ResourceError) -> Self {
        ApiError::Resource(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Invalid(errors) => (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response(),
            ApiError::Forbidden(reason) => (StatusCode::FORBIDDEN, Json(ErrorBody::new(reason))).into_response(),
            ApiError::Resource(e) => {
                let status = e.status_code();
                if status.is_server_error() {
                    tracing::error!("resource API call failed: {}", e);
                } else {
                    tracing::debug!("resource API call refused: {}", e);
                }
                (status, Json(ErrorBody::new(e.to_string()))).into_response()
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// --- Filter Structs ---

/// BookQuery
///
/// Query parameters of the public catalog listing (GET /api/books).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct BookQuery {
    /// Case-insensitive match against title, author and description.
    pub search: Option<String>,
    /// Exact category; `All` disables the filter.
    pub category: Option<String>,
}

impl From<BookQuery> for BookFilter {
    fn from(q: BookQuery) -> Self {
        BookFilter {
            search: q.search,
            category: q.category,
        }
    }
}

// --- Navigation ---

/// Prefix reserved for the data surface; unknown paths below it are plain 404s.
pub const API_PREFIX: &str = "/api";

fn is_api_path(path: &str) -> bool {
    path == API_PREFIX || path.starts_with("/api/")
}

/// navigate_page
///
/// [Fallback] Every GET not claimed by the data surface is a navigation
/// event: match the path, guard it, and either redirect (303) or describe the
/// view to mount.
pub async fn navigate_page(method: Method, ctx: NavigationContext) -> Response {
    if is_api_path(&ctx.path) {
        return (StatusCode::NOT_FOUND, Json(ErrorBody::new("No such endpoint"))).into_response();
    }
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    match navigation::navigate(&ctx) {
        Navigation::Redirect { to, .. } => Redirect::to(to).into_response(),
        Navigation::Render(descriptor) => Json(descriptor).into_response(),
    }
}

// --- Public Handlers ---

/// health
///
/// [Public Route] Liveness probe.
#[utoipa::path(get, path = "/api/health", responses((status = 200, description = "Alive")))]
pub async fn health() -> &'static str {
    "ok"
}

/// login
///
/// [Public Route] Signs in with email and password and persists the session.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
        (status = 422, description = "Form validation failed")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, AuthError> {
    let outcome = auth::login(state.resources.as_ref(), &state.sessions, &credentials).await?;
    Ok(Json(outcome))
}

/// signup
///
/// [Public Route] Registers a new `user` account.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserProfile),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 422, description = "Form validation failed")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(form): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AuthError> {
    let profile = auth::register(state.resources.as_ref(), &form).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// logout
///
/// [Public Route] Clears the session. Idempotent.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Signed out", body = LogoutResponse))
)]
pub async fn logout(State(state): State<AppState>) -> Result<Json<LogoutResponse>, AuthError> {
    Ok(Json(auth::logout(&state.sessions)?))
}

/// get_session
///
/// [Public Route] The current session, or `null` when signed out.
#[utoipa::path(
    get,
    path = "/api/session",
    responses((status = 200, description = "Current session", body = Option<Session>))
)]
pub async fn get_session(CurrentSession(session): CurrentSession) -> Json<Option<Session>> {
    Json(session)
}

/// list_books
///
/// [Public Route] The catalog, optionally filtered by search text and category.
#[utoipa::path(
    get,
    path = "/api/books",
    params(BookQuery),
    responses((status = 200, description = "Books", body = [Book]))
)]
pub async fn list_books(State(state): State<AppState>, Query(query): Query<BookQuery>) -> ApiResult<Vec<Book>> {
    let books = library::list_books(state.resources.as_ref(), &query.into()).await?;
    Ok(Json(books))
}

/// get_recent_books
///
/// [Public Route] The newest additions to the catalog.
#[utoipa::path(
    get,
    path = "/api/books/recent",
    responses((status = 200, description = "Newest books", body = [Book]))
)]
pub async fn get_recent_books(State(state): State<AppState>) -> ApiResult<Vec<Book>> {
    let books = library::recent_books(state.resources.as_ref(), RECENT_BOOKS_LIMIT).await?;
    Ok(Json(books))
}

/// get_book
///
/// [Public Route] One book by id.
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Found", body = Book),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Book> {
    Ok(Json(library::get_book(state.resources.as_ref(), &id).await?))
}

/// get_book_reviews
///
/// [Public Route] Reviews posted for a book.
#[utoipa::path(
    get,
    path = "/api/books/{id}/reviews",
    params(("id" = String, Path, description = "Book ID")),
    responses((status = 200, description = "Reviews", body = [Review]))
)]
pub async fn get_book_reviews(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Review>> {
    Ok(Json(library::reviews_for_book(state.resources.as_ref(), &id).await?))
}

// --- Authenticated Handlers ---

/// add_review
///
/// [Authenticated Route] Posts a review as the signed-in actor.
#[utoipa::path(
    post,
    path = "/api/books/{id}/reviews",
    params(("id" = String, Path, description = "Book ID")),
    request_body = ReviewRequest,
    responses(
        (status = 201, description = "Review added", body = Review),
        (status = 401, description = "Not signed in"),
        (status = 422, description = "Form validation failed")
    )
)]
pub async fn add_review(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    Json(form): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    validation::validate_review(&form).map_err(ApiError::Invalid)?;
    let review = library::add_review(state.resources.as_ref(), &book_id, &form, &session).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// get_my_profile
///
/// [Authenticated Route] The signed-in actor's full profile.
#[utoipa::path(
    get,
    path = "/api/me/profile",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_my_profile(AuthSession(session): AuthSession, State(state): State<AppState>) -> ApiResult<UserProfile> {
    let record = library::get_user(state.resources.as_ref(), &session.id).await?;
    Ok(Json(record.into()))
}

/// update_my_profile
///
/// [Authenticated Route] Edits the signed-in actor's profile. A changed name is
/// written back into the stored session so the chrome shows it immediately.
#[utoipa::path(
    put,
    path = "/api/me/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 422, description = "Form validation failed")
    )
)]
pub async fn update_my_profile(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<UserProfile> {
    let update = update.trimmed();
    validation::validate_profile_update(&update).map_err(ApiError::Invalid)?;
    let record = library::update_profile(state.resources.as_ref(), &session.id, &update).await?;

    if record.full_name != session.full_name {
        let refreshed = Session {
            full_name: record.full_name.clone(),
            ..session
        };
        if let Err(e) = state.sessions.write(&refreshed) {
            tracing::warn!("profile saved but session refresh failed: {}", e);
        }
    }
    Ok(Json(record.into()))
}

/// get_my_issued_books
///
/// [Authenticated Route] Issue records of the signed-in actor.
#[utoipa::path(
    get,
    path = "/api/me/issued-books",
    responses((status = 200, description = "My issue records", body = [IssuedBook]))
)]
pub async fn get_my_issued_books(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> ApiResult<Vec<IssuedBook>> {
    Ok(Json(library::issued_to(state.resources.as_ref(), &session.id).await?))
}

// --- Admin Handlers ---
// The admin router is wrapped in `auth::require_admin`; handlers still take the
// session where they need the actor's identity.

/// get_dashboard_stats
///
/// [Admin Route] Dashboard figures.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Stats", body = DashboardStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_dashboard_stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    Ok(Json(library::dashboard_stats(state.resources.as_ref()).await?))
}

/// get_customers
///
/// [Admin Route] All non-admin accounts.
#[utoipa::path(
    get,
    path = "/api/admin/customers",
    responses((status = 200, description = "Customers", body = [UserProfile]))
)]
pub async fn get_customers(State(state): State<AppState>) -> ApiResult<Vec<UserProfile>> {
    let customers = library::list_customers(state.resources.as_ref()).await?;
    Ok(Json(customers.into_iter().map(UserProfile::from).collect()))
}

/// delete_customer
///
/// [Admin Route] Removes a customer account. Admin accounts cannot be removed
/// through this endpoint.
#[utoipa::path(
    delete,
    path = "/api/admin/customers/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Target is an admin account"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_customer(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let api = state.resources.as_ref();
    let target = library::get_user(api, &id).await?;
    if target.role == Role::Admin {
        return Err(ApiError::Forbidden("Admin accounts cannot be deleted here"));
    }
    library::delete_user(api, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// create_book
///
/// [Admin Route] Adds a book to the catalog and records the activity.
#[utoipa::path(
    post,
    path = "/api/admin/books",
    request_body = BookInput,
    responses(
        (status = 201, description = "Created", body = Book),
        (status = 422, description = "Form validation failed")
    )
)]
pub async fn create_book(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Json(form): Json<BookInput>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    validation::validate_book(&form).map_err(ApiError::Invalid)?;
    let book = library::create_book(state.resources.as_ref(), &form, &session).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// update_book
///
/// [Admin Route] Edits a book.
#[utoipa::path(
    put,
    path = "/api/admin/books/{id}",
    params(("id" = String, Path, description = "Book ID")),
    request_body = BookInput,
    responses(
        (status = 200, description = "Updated", body = Book),
        (status = 404, description = "Not found"),
        (status = 422, description = "Form validation failed")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<BookInput>,
) -> ApiResult<Book> {
    validation::validate_book(&form).map_err(ApiError::Invalid)?;
    Ok(Json(library::update_book(state.resources.as_ref(), &id, &form).await?))
}

/// delete_book
///
/// [Admin Route] Removes a book from the catalog.
#[utoipa::path(
    delete,
    path = "/api/admin/books/{id}",
    params(("id" = String, Path, description = "Book ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not found"))
)]
pub async fn delete_book(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    library::delete_book(state.resources.as_ref(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// get_issue_history
///
/// [Admin Route] All issue records with borrower and title resolved.
#[utoipa::path(
    get,
    path = "/api/admin/issued-books",
    responses((status = 200, description = "Issue history", body = [IssueHistoryEntry]))
)]
pub async fn get_issue_history(State(state): State<AppState>) -> ApiResult<Vec<IssueHistoryEntry>> {
    Ok(Json(library::issue_history(state.resources.as_ref()).await?))
}

/// issue_book
///
/// [Admin Route] Lends a book to a user.
#[utoipa::path(
    post,
    path = "/api/admin/issued-books",
    request_body = IssueRequest,
    responses(
        (status = 201, description = "Issued", body = IssuedBook),
        (status = 404, description = "Unknown user or book"),
        (status = 422, description = "Form validation failed")
    )
)]
pub async fn issue_book(
    State(state): State<AppState>,
    Json(form): Json<IssueRequest>,
) -> Result<(StatusCode, Json<IssuedBook>), ApiError> {
    validation::validate_issue(&form).map_err(ApiError::Invalid)?;
    let record = library::issue_book(state.resources.as_ref(), &form).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// return_book
///
/// [Admin Route] Marks an issue record as returned today.
#[utoipa::path(
    patch,
    path = "/api/admin/issued-books/{id}/return",
    params(("id" = String, Path, description = "Issue record ID")),
    responses(
        (status = 200, description = "Returned", body = IssuedBook),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<IssuedBook> {
    Ok(Json(library::mark_returned(state.resources.as_ref(), &id).await?))
}

/// get_recent_activities
///
/// [Admin Route] Latest entries of the activity feed.
#[utoipa::path(
    get,
    path = "/api/admin/activities",
    responses((status = 200, description = "Recent activities", body = [Activity]))
)]
pub async fn get_recent_activities(State(state): State<AppState>) -> ApiResult<Vec<Activity>> {
    Ok(Json(library::recent_activities(state.resources.as_ref(), RECENT_ACTIVITY_LIMIT).await?))
}
