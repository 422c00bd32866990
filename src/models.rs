use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::session::{Role, Session};

// --- Resource API Records (shape of the external collections) ---

/// UserRecord
///
/// A record of the `users` collection as the Resource API stores it. Carries
/// the password, so it is never returned to clients as-is (see `UserProfile`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub mobile_no: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub password: String,
    pub role: Role,
}

impl UserRecord {
    /// The session identity carried by this record. `None` when the record
    /// could not form a valid session (e.g. an empty id).
    pub fn to_session(&self) -> Option<Session> {
        if self.id.trim().is_empty() {
            return None;
        }
        Some(Session {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            role: self.role,
        })
    }
}

/// UserProfile
///
/// Client-facing view of a user record (profile screen, customer list).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub mobile_no: String,
    pub address: String,
    pub gender: String,
    pub role: Role,
}

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            full_name: record.full_name,
            email: record.email,
            mobile_no: record.mobile_no,
            address: record.address,
            gender: record.gender,
            role: record.role,
        }
    }
}

/// Book
///
/// A record of the `books` collection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub category: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub description: String,
    pub published_year: i32,
    /// RFC 3339 creation time; older records may lack it.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// IssueStatus
///
/// Lifecycle of an issue record. The only transition is `issued → returned`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum IssueStatus {
    Issued,
    Returned,
}

/// IssuedBook
///
/// A record of the `issuedBooks` collection. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IssuedBook {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub issue_date: String,
    pub due_date: String,
    #[serde(default)]
    pub return_date: Option<String>,
    pub status: IssueStatus,
}

/// IssueHistoryEntry
///
/// An issue record joined with the borrower's name and the book's title for the
/// admin history screen.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IssueHistoryEntry {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub book_id: String,
    pub book_title: String,
    pub issue_date: String,
    pub due_date: String,
    pub return_date: Option<String>,
    pub status: IssueStatus,
}

/// Review
///
/// A record of the `reviews` collection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Review {
    #[serde(default)]
    pub id: String,
    pub book_id: String,
    pub user_id: String,
    pub user_name: String,
    pub rating: u8,
    pub review: String,
    pub created_at: String,
}

/// Activity
///
/// A record of the `activities` feed shown on the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Activity {
    pub id: String,
    /// Display name of the actor.
    pub user: String,
    /// Title of the book concerned.
    pub book: String,
    /// RFC 3339 timestamp, so the API's lexical `_sort=time` is chronological.
    pub time: String,
    pub icon: String,
}

// --- Request Payloads (Input Schemas) ---

/// Credentials
///
/// Login form payload (POST /api/auth/login).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// RegisterRequest
///
/// Signup form payload (POST /api/auth/signup). The role is not accepted from
/// the client: every self-registered account is a `user`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub mobile_no: String,
    pub address: String,
    pub gender: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterRequest {
    /// Copy with surrounding whitespace removed from every text field except the
    /// passwords, which are taken as typed.
    pub fn trimmed(&self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            mobile_no: self.mobile_no.trim().to_string(),
            address: self.address.trim().to_string(),
            gender: self.gender.trim().to_string(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        }
    }
}

/// ProfileUpdate
///
/// Partial update of the signed-in user's own profile (PUT /api/me/profile).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl ProfileUpdate {
    pub fn trimmed(&self) -> Self {
        let trim = |field: &Option<String>| field.as_deref().map(|v| v.trim().to_string());
        Self {
            full_name: trim(&self.full_name),
            mobile_no: trim(&self.mobile_no),
            address: trim(&self.address),
            gender: trim(&self.gender),
        }
    }
}

/// BookInput
///
/// Add/edit book form payload (admin).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub category: String,
    #[serde(default)]
    pub image_url: String,
    pub description: String,
    pub published_year: i32,
}

/// IssueRequest
///
/// Issue-book form payload (admin).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IssueRequest {
    pub user_id: String,
    pub book_id: String,
    pub issue_date: String,
    pub due_date: String,
}

/// ReviewRequest
///
/// Review form payload. Author identity comes from the session, not the body.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ReviewRequest {
    pub rating: u8,
    pub review: String,
}

// --- Responses ---

/// LoginResponse
///
/// The established session and where the client should navigate next.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    pub session: Session,
    pub redirect_to: String,
}

/// LogoutResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LogoutResponse {
    pub redirect_to: String,
}

/// DashboardStats
///
/// Figures for the admin dashboard (GET /api/admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardStats {
    pub total_books: usize,
    /// Non-admin accounts only.
    pub total_users: usize,
    /// Issue records currently in `issued` status.
    pub books_issued: usize,
    /// Distinct users holding at least one issued book.
    pub users_with_issued_books: usize,
}

/// ErrorBody
///
/// Uniform JSON error payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
