use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes for any signed-in actor. The whole router sits behind
/// `auth::require_session`; handlers additionally take `AuthSession` to learn
/// who is calling.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/books/{id}/reviews
        // The review is attributed to the session's id and full name.
        .route("/api/books/{id}/reviews", post(handlers::add_review))
        // GET/PUT /api/me/profile
        // Own profile. A name change is written back into the session.
        .route(
            "/api/me/profile",
            get(handlers::get_my_profile).put(handlers::update_my_profile),
        )
        // GET /api/me/issued-books
        .route("/api/me/issued-books", get(handlers::get_my_issued_books))
}
