use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

/// Admin Router Module
///
/// Catalog management, lending and oversight. The whole router sits behind
/// `auth::require_admin`: anonymous callers get 401, signed-in users 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/stats
        // Totals for the dashboard cards.
        .route("/api/admin/stats", get(handlers::get_dashboard_stats))
        // --- Customers ---
        .route("/api/admin/customers", get(handlers::get_customers))
        // DELETE /api/admin/customers/{id}
        // Refuses admin accounts.
        .route(
            "/api/admin/customers/{id}",
            axum::routing::delete(handlers::delete_customer),
        )
        // --- Books ---
        .route("/api/admin/books", post(handlers::create_book))
        .route(
            "/api/admin/books/{id}",
            put(handlers::update_book).delete(handlers::delete_book),
        )
        // --- Lending ---
        // GET lists the joined history, POST issues a book.
        .route(
            "/api/admin/issued-books",
            get(handlers::get_issue_history).post(handlers::issue_book),
        )
        // PATCH /api/admin/issued-books/{id}/return
        // Sets status `returned` and stamps today's date.
        .route(
            "/api/admin/issued-books/{id}/return",
            patch(handlers::return_book),
        )
        // GET /api/admin/activities
        .route("/api/admin/activities", get(handlers::get_recent_activities))
}
