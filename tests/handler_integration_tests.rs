use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use library_portal::{
    AppState,
    auth::{AuthSession, CurrentSession},
    config::AppConfig,
    handlers::{self, BookQuery},
    models::{BookInput, Credentials, IssueRequest, ProfileUpdate, RegisterRequest, ReviewRequest},
    resource::{Collection, MockResourceApi},
    session::{Role, SESSION_KEY, Session, SessionStore},
    storage::{KeyValueState, KeyValueStore, MemoryKeyValueStore},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::test;

// --- TEST UTILITIES ---

fn user_record(id: &str, name: &str, email: &str, role: &str) -> Value {
    json!({
        "id": id,
        "fullName": name,
        "email": email,
        "mobileNo": "0123456789",
        "address": "12 Reading Lane, Booktown",
        "gender": "female",
        "password": "Secret123",
        "role": role,
    })
}

fn seeded_api() -> MockResourceApi {
    MockResourceApi::new()
        .with_records(
            Collection::Users,
            vec![
                user_record("u1", "Alice Reader", "alice@library.test", "user"),
                user_record("a1", "Ada Admin", "ada@library.test", "admin"),
            ],
        )
        .with_records(
            Collection::Books,
            vec![json!({
                "id": "b1",
                "title": "Dune",
                "author": "Frank Herbert",
                "category": "Fiction",
                "imageUrl": "",
                "description": "Desert planet",
                "publishedYear": 1965,
                "createdAt": "2025-01-01T00:00:00Z",
            })],
        )
        .with_records(
            Collection::IssuedBooks,
            vec![json!({
                "id": "i1",
                "userId": "u1",
                "bookId": "b1",
                "issueDate": "2025-03-01",
                "dueDate": "2025-03-15",
                "status": "issued",
            })],
        )
}

// Creates an AppState using mock components
fn create_test_state(api: MockResourceApi) -> AppState {
    AppState {
        resources: Arc::new(api),
        sessions: SessionStore::new(Arc::new(MemoryKeyValueStore::new()) as KeyValueState),
        config: AppConfig::default(),
    }
}

fn alice() -> Session {
    Session {
        id: "u1".into(),
        full_name: "Alice Reader".into(),
        email: "alice@library.test".into(),
        role: Role::User,
    }
}

fn ada() -> Session {
    Session {
        id: "a1".into(),
        full_name: "Ada Admin".into(),
        email: "ada@library.test".into(),
        role: Role::Admin,
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("json body")
}

// --- AUTH HANDLERS ---

#[test]
async fn test_login_persists_session_and_routes_admin() {
    let state = create_test_state(seeded_api());
    let credentials = Credentials {
        email: "ada@library.test".into(),
        password: "Secret123".into(),
    };

    let Json(outcome) = handlers::login(State(state.clone()), Json(credentials))
        .await
        .expect("login succeeds");

    assert_eq!(outcome.redirect_to, "/admin-dashboard");
    assert_eq!(outcome.session, ada());
    assert_eq!(state.sessions.read(), Some(ada()));
}

#[test]
async fn test_login_user_lands_on_home() {
    let state = create_test_state(seeded_api());
    let credentials = Credentials {
        email: "alice@library.test".into(),
        password: "Secret123".into(),
    };
    let Json(outcome) = handlers::login(State(state), Json(credentials)).await.unwrap();
    assert_eq!(outcome.redirect_to, "/");
}

#[test]
async fn test_login_wrong_password_is_unauthorized() {
    let state = create_test_state(seeded_api());
    let credentials = Credentials {
        email: "alice@library.test".into(),
        password: "Wrong1234".into(),
    };

    let err = handlers::login(State(state.clone()), Json(credentials))
        .await
        .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    assert_eq!(state.sessions.read(), None);
}

#[test]
async fn test_login_invalid_form_is_unprocessable() {
    let state = create_test_state(seeded_api());
    let credentials = Credentials {
        email: "not-an-email".into(),
        password: "short".into(),
    };

    let response = handlers::login(State(state), Json(credentials))
        .await
        .unwrap_err()
        .into_response();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let errors = body_json(response).await;
    assert!(errors.get("email").is_some());
    assert!(errors.get("password").is_some());
}

#[test]
async fn test_signup_creates_user_role_account() {
    let api = seeded_api();
    let state = create_test_state(api);
    let form = RegisterRequest {
        full_name: "Nina New".into(),
        email: "nina@library.test".into(),
        mobile_no: "0987654321".into(),
        address: "1 Long Street, Somewhere".into(),
        gender: "female".into(),
        password: "Secret123".into(),
        confirm_password: "Secret123".into(),
    };

    let (status, Json(profile)) = handlers::signup(State(state.clone()), Json(form))
        .await
        .expect("signup succeeds");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile.role, Role::User);
    assert_eq!(profile.email, "nina@library.test");
    // Signing up does not sign in.
    assert_eq!(state.sessions.read(), None);
}

#[test]
async fn test_signup_checks_and_stores_trimmed_fields() {
    let state = create_test_state(seeded_api());
    let padded_name = RegisterRequest {
        full_name: "  a   ".into(),
        email: "pad@library.test".into(),
        mobile_no: "0987654321".into(),
        address: "   short    ".into(),
        gender: "male".into(),
        password: "Secret123".into(),
        confirm_password: "Secret123".into(),
    };
    let err = handlers::signup(State(state.clone()), Json(padded_name)).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

    let form = RegisterRequest {
        full_name: "  Nina New  ".into(),
        email: " nina@library.test ".into(),
        mobile_no: " 0987654321 ".into(),
        address: "  1 Long Street, Somewhere ".into(),
        gender: " female".into(),
        password: "Secret123".into(),
        confirm_password: "Secret123".into(),
    };
    let (_, Json(profile)) = handlers::signup(State(state), Json(form)).await.unwrap();
    assert_eq!(profile.full_name, "Nina New");
    assert_eq!(profile.email, "nina@library.test");
    assert_eq!(profile.mobile_no, "0987654321");
    assert_eq!(profile.address, "1 Long Street, Somewhere");
    assert_eq!(profile.gender, "female");
}

#[test]
async fn test_signup_duplicate_email_conflicts() {
    let state = create_test_state(seeded_api());
    let form = RegisterRequest {
        full_name: "Alice Again".into(),
        email: "alice@library.test".into(),
        mobile_no: "0987654321".into(),
        address: "1 Long Street, Somewhere".into(),
        gender: "female".into(),
        password: "Secret123".into(),
        confirm_password: "Secret123".into(),
    };

    let err = handlers::signup(State(state), Json(form)).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
}

#[test]
async fn test_logout_clears_session() {
    let state = create_test_state(seeded_api());
    state.sessions.write(&alice()).unwrap();

    let Json(outcome) = handlers::logout(State(state.clone())).await.unwrap();
    assert_eq!(outcome.redirect_to, "/login");
    assert_eq!(state.sessions.read(), None);

    // Second logout is harmless.
    assert!(handlers::logout(State(state)).await.is_ok());
}

#[test]
async fn test_get_session_reflects_store() {
    let Json(none) = handlers::get_session(CurrentSession(None)).await;
    assert_eq!(none, None);

    let Json(some) = handlers::get_session(CurrentSession(Some(alice()))).await;
    assert_eq!(some, Some(alice()));
}

// --- CATALOG HANDLERS ---

#[test]
async fn test_list_books_applies_query() {
    let state = create_test_state(seeded_api());
    let query = BookQuery {
        search: Some("desert".into()),
        category: Some("Fiction".into()),
    };
    let Json(books) = handlers::list_books(State(state.clone()), Query(query)).await.unwrap();
    assert_eq!(books.len(), 1);

    let query = BookQuery {
        search: None,
        category: Some("Drama".into()),
    };
    let Json(books) = handlers::list_books(State(state), Query(query)).await.unwrap();
    assert!(books.is_empty());
}

#[test]
async fn test_get_book_not_found() {
    let state = create_test_state(seeded_api());
    let err = handlers::get_book(State(state), Path("missing".into())).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_resource_failure_is_bad_gateway() {
    let state = create_test_state(MockResourceApi::new_failing());
    let err = handlers::get_recent_books(State(state)).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
}

// --- AUTHENTICATED HANDLERS ---

#[test]
async fn test_add_review_uses_session_identity() {
    let state = create_test_state(seeded_api());
    let form = ReviewRequest {
        rating: 5,
        review: "A classic".into(),
    };

    let (status, Json(review)) =
        handlers::add_review(AuthSession(alice()), State(state), Path("b1".into()), Json(form))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(review.user_id, "u1");
    assert_eq!(review.user_name, "Alice Reader");
}

#[test]
async fn test_add_review_rejects_bad_rating() {
    let state = create_test_state(seeded_api());
    let form = ReviewRequest {
        rating: 9,
        review: "Off the scale".into(),
    };
    let err = handlers::add_review(AuthSession(alice()), State(state), Path("b1".into()), Json(form))
        .await
        .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
async fn test_profile_update_refreshes_session_name() {
    let state = create_test_state(seeded_api());
    state.sessions.write(&alice()).unwrap();
    let update = ProfileUpdate {
        full_name: Some("Alice Q. Reader".into()),
        ..Default::default()
    };

    let Json(profile) = handlers::update_my_profile(AuthSession(alice()), State(state.clone()), Json(update))
        .await
        .unwrap();
    assert_eq!(profile.full_name, "Alice Q. Reader");
    assert_eq!(
        state.sessions.read().map(|s| s.full_name),
        Some("Alice Q. Reader".to_string())
    );
}

#[test]
async fn test_profile_update_stores_trimmed_values() {
    let state = create_test_state(seeded_api());
    state.sessions.write(&alice()).unwrap();
    let update = ProfileUpdate {
        full_name: Some("  Alice Q. Reader  ".into()),
        address: Some(" 9 Quiet Road, Booktown ".into()),
        ..Default::default()
    };

    handlers::update_my_profile(AuthSession(alice()), State(state.clone()), Json(update))
        .await
        .unwrap();

    let Json(stored) = handlers::get_my_profile(AuthSession(alice()), State(state.clone()))
        .await
        .unwrap();
    assert_eq!(stored.full_name, "Alice Q. Reader");
    assert_eq!(stored.address, "9 Quiet Road, Booktown");
    assert_eq!(
        state.sessions.read().map(|s| s.full_name),
        Some("Alice Q. Reader".to_string())
    );

    let blank = ProfileUpdate {
        full_name: Some("  x  ".into()),
        ..Default::default()
    };
    let err = handlers::update_my_profile(AuthSession(alice()), State(state), Json(blank))
        .await
        .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
async fn test_profile_never_exposes_password() {
    let state = create_test_state(seeded_api());
    let Json(profile) = handlers::get_my_profile(AuthSession(alice()), State(state)).await.unwrap();
    let json = serde_json::to_value(&profile).unwrap();
    assert!(json.get("password").is_none());
    assert_eq!(json["mobileNo"], "0123456789");
}

#[test]
async fn test_my_issued_books() {
    let state = create_test_state(seeded_api());
    let Json(records) = handlers::get_my_issued_books(AuthSession(alice()), State(state.clone()))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);

    let Json(records) = handlers::get_my_issued_books(AuthSession(ada()), State(state)).await.unwrap();
    assert!(records.is_empty());
}

// --- ADMIN HANDLERS ---

#[test]
async fn test_delete_customer_refuses_admin_accounts() {
    let state = create_test_state(seeded_api());
    let err = handlers::delete_customer(State(state.clone()), Path("a1".into()))
        .await
        .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);

    let status = handlers::delete_customer(State(state), Path("u1".into())).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[test]
async fn test_create_book_validates_input() {
    let state = create_test_state(seeded_api());
    let form = BookInput {
        title: String::new(),
        published_year: 99,
        ..Default::default()
    };
    let response = handlers::create_book(AuthSession(ada()), State(state), Json(form))
        .await
        .unwrap_err()
        .into_response();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let errors = body_json(response).await;
    assert!(errors.get("title").is_some());
    assert!(errors.get("publishedYear").is_some());
}

#[test]
async fn test_issue_and_return_flow() {
    let state = create_test_state(seeded_api());
    let form = IssueRequest {
        user_id: "u1".into(),
        book_id: "b1".into(),
        issue_date: "2025-06-01".into(),
        due_date: "2025-06-20".into(),
    };
    let (status, Json(record)) = handlers::issue_book(State(state.clone()), Json(form)).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let Json(returned) = handlers::return_book(State(state.clone()), Path(record.id.clone()))
        .await
        .unwrap();
    assert!(returned.return_date.is_some());

    let err = handlers::return_book(State(state), Path(record.id)).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
}

#[test]
async fn test_issue_rejects_due_date_before_issue_date() {
    let state = create_test_state(seeded_api());
    let form = IssueRequest {
        user_id: "u1".into(),
        book_id: "b1".into(),
        issue_date: "2025-06-20".into(),
        due_date: "2025-06-01".into(),
    };
    let err = handlers::issue_book(State(state), Json(form)).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
async fn test_dashboard_stats_handler() {
    let state = create_test_state(seeded_api());
    let Json(stats) = handlers::get_dashboard_stats(State(state)).await.unwrap();
    assert_eq!(stats.total_books, 1);
    assert_eq!(stats.total_users, 1);
    assert_eq!(stats.books_issued, 1);
}

#[test]
async fn test_session_key_is_current_user() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let state = AppState {
        resources: Arc::new(seeded_api()),
        sessions: SessionStore::new(store.clone() as KeyValueState),
        config: AppConfig::default(),
    };
    let credentials = Credentials {
        email: "alice@library.test".into(),
        password: "Secret123".into(),
    };
    handlers::login(State(state), Json(credentials)).await.unwrap();

    assert!(store.get(SESSION_KEY).unwrap().is_some());
}
