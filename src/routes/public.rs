use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Catalog reads and the sign-in gateway. Nothing here needs a session;
/// `/api/session` simply reports `null` when there is none.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/health
        // Liveness probe for monitoring.
        .route("/api/health", get(handlers::health))
        // --- Sign-in Gateway ---
        // POST /api/auth/login
        // Checks credentials against the `users` collection and persists the session.
        .route("/api/auth/login", post(handlers::login))
        // POST /api/auth/signup
        // Registers a new account with the `user` role.
        .route("/api/auth/signup", post(handlers::signup))
        // POST /api/auth/logout
        // Clears the stored session.
        .route("/api/auth/logout", post(handlers::logout))
        // GET /api/session
        .route("/api/session", get(handlers::get_session))
        // --- Catalog ---
        // GET /api/books?search=...&category=...
        .route("/api/books", get(handlers::list_books))
        // GET /api/books/recent
        // Newest additions, ordered by `createdAt`.
        .route("/api/books/recent", get(handlers::get_recent_books))
        .route("/api/books/{id}", get(handlers::get_book))
        // GET /api/books/{id}/reviews
        // Posting a review lives in the authenticated router on the same path.
        .route("/api/books/{id}/reviews", get(handlers::get_book_reviews))
}
