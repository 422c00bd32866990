//! Typed library operations (users, books, issues, reviews, activities) on top
//! of the generic `ResourceApi`.

use std::collections::{HashMap, HashSet};

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    models::{
        Activity, Book, BookInput, DashboardStats, IssueHistoryEntry, IssueRequest, IssueStatus,
        IssuedBook, ProfileUpdate, Review, ReviewRequest, UserRecord,
    },
    resource::{Collection, ResourceApi, ResourceError, ResourceResult},
    session::{Role, Session},
};

pub const RECENT_ACTIVITY_LIMIT: usize = 5;
pub const RECENT_BOOKS_LIMIT: usize = 4;
const UNKNOWN_USER: &str = "Unknown User";
const UNKNOWN_BOOK: &str = "Unknown Book";

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn decode<T: DeserializeOwned>(record: Value) -> ResourceResult<T> {
    Ok(serde_json::from_value(record)?)
}

/// Decodes a listing, skipping records that do not have the expected shape
/// instead of failing the whole screen.
fn decode_all<T: DeserializeOwned>(collection: Collection, records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(collection = collection.as_str(), "skipping malformed record: {}", e);
                None
            }
        })
        .collect()
}

// --- Users ---

/// Returns the user registered under `email`, if any.
pub async fn find_user_by_email(api: &dyn ResourceApi, email: &str) -> ResourceResult<Option<UserRecord>> {
    let matches = api.list(Collection::Users, &[("email", email)]).await?;
    Ok(decode_all(Collection::Users, matches).into_iter().next())
}

pub async fn get_user(api: &dyn ResourceApi, id: &str) -> ResourceResult<UserRecord> {
    decode(api.get(Collection::Users, id).await?)
}

pub async fn create_user(api: &dyn ResourceApi, user: &UserRecord) -> ResourceResult<UserRecord> {
    decode(api.create(Collection::Users, serde_json::to_value(user)?).await?)
}

/// update_profile
///
/// Applies the provided profile fields to the stored user record. Email, role
/// and password are not editable here.
pub async fn update_profile(
    api: &dyn ResourceApi,
    id: &str,
    update: &ProfileUpdate,
) -> ResourceResult<UserRecord> {
    let changes = serde_json::to_value(update)?;
    decode(api.patch(Collection::Users, id, changes).await?)
}

/// All non-admin accounts.
pub async fn list_customers(api: &dyn ResourceApi) -> ResourceResult<Vec<UserRecord>> {
    let users: Vec<UserRecord> = decode_all(Collection::Users, api.list(Collection::Users, &[]).await?);
    Ok(users.into_iter().filter(|u| u.role != Role::Admin).collect())
}

pub async fn delete_user(api: &dyn ResourceApi, id: &str) -> ResourceResult<()> {
    api.delete(Collection::Users, id).await
}

// --- Books ---

/// BookFilter
///
/// Catalog filter. `search` matches title, author or description
/// case-insensitively; `category` must match exactly (`All` means no filter).
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        let category_ok = match self.category.as_deref() {
            None | Some("") | Some("All") => true,
            Some(category) => book.category == category,
        };
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [&book.title, &book.author, &book.description]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        };
        category_ok && search_ok
    }
}

pub async fn list_books(api: &dyn ResourceApi, filter: &BookFilter) -> ResourceResult<Vec<Book>> {
    let books: Vec<Book> = decode_all(Collection::Books, api.list(Collection::Books, &[]).await?);
    Ok(books.into_iter().filter(|b| filter.matches(b)).collect())
}

/// The newest books by creation time.
pub async fn recent_books(api: &dyn ResourceApi, limit: usize) -> ResourceResult<Vec<Book>> {
    let limit = limit.to_string();
    let records = api
        .list(
            Collection::Books,
            &[("_sort", "createdAt"), ("_order", "desc"), ("_limit", limit.as_str())],
        )
        .await?;
    Ok(decode_all(Collection::Books, records))
}

pub async fn get_book(api: &dyn ResourceApi, id: &str) -> ResourceResult<Book> {
    decode(api.get(Collection::Books, id).await?)
}

/// create_book
///
/// Stores a new book and records an activity entry for the dashboard feed.
/// A failure to record the activity is logged but does not undo the book.
pub async fn create_book(api: &dyn ResourceApi, input: &BookInput, actor: &Session) -> ResourceResult<Book> {
    let book = Book {
        id: new_id(),
        title: input.title.trim().to_string(),
        author: input.author.trim().to_string(),
        category: input.category.trim().to_string(),
        image_url: input.image_url.trim().to_string(),
        description: input.description.trim().to_string(),
        published_year: input.published_year,
        created_at: Some(now_rfc3339()),
    };
    let created: Book = decode(api.create(Collection::Books, serde_json::to_value(&book)?).await?)?;

    if let Err(e) = record_activity(api, &actor.full_name, &created.title, "FiBook").await {
        tracing::error!("failed to record activity for book {}: {}", created.id, e);
    }
    Ok(created)
}

/// Replaces the editable fields of a book, keeping its id and creation time.
pub async fn update_book(api: &dyn ResourceApi, id: &str, input: &BookInput) -> ResourceResult<Book> {
    let existing = get_book(api, id).await?;
    let book = Book {
        id: existing.id,
        title: input.title.trim().to_string(),
        author: input.author.trim().to_string(),
        category: input.category.trim().to_string(),
        image_url: input.image_url.trim().to_string(),
        description: input.description.trim().to_string(),
        published_year: input.published_year,
        created_at: existing.created_at,
    };
    decode(api.update(Collection::Books, id, serde_json::to_value(&book)?).await?)
}

pub async fn delete_book(api: &dyn ResourceApi, id: &str) -> ResourceResult<()> {
    api.delete(Collection::Books, id).await
}

// --- Issues ---

/// issue_book
///
/// Opens a new issue record in `issued` status with no return date.
pub async fn issue_book(api: &dyn ResourceApi, request: &IssueRequest) -> ResourceResult<IssuedBook> {
    // Both sides of the loan must exist; NotFound propagates as-is.
    get_user(api, &request.user_id).await?;
    get_book(api, &request.book_id).await?;

    let record = IssuedBook {
        id: new_id(),
        user_id: request.user_id.clone(),
        book_id: request.book_id.clone(),
        issue_date: request.issue_date.clone(),
        due_date: request.due_date.clone(),
        return_date: None,
        status: IssueStatus::Issued,
    };
    decode(api.create(Collection::IssuedBooks, serde_json::to_value(&record)?).await?)
}

pub async fn issued_to(api: &dyn ResourceApi, user_id: &str) -> ResourceResult<Vec<IssuedBook>> {
    let records = api.list(Collection::IssuedBooks, &[("userId", user_id)]).await?;
    Ok(decode_all(Collection::IssuedBooks, records))
}

/// issue_history
///
/// Every issue record, joined with borrower name and book title. Dangling
/// references render as `Unknown User` / `Unknown Book`.
pub async fn issue_history(api: &dyn ResourceApi) -> ResourceResult<Vec<IssueHistoryEntry>> {
    let (issues, users, books) = tokio::try_join!(
        api.list(Collection::IssuedBooks, &[]),
        api.list(Collection::Users, &[]),
        api.list(Collection::Books, &[]),
    )?;

    let names: HashMap<String, String> = decode_all::<UserRecord>(Collection::Users, users)
        .into_iter()
        .map(|u| (u.id, u.full_name))
        .collect();
    let titles: HashMap<String, String> = decode_all::<Book>(Collection::Books, books)
        .into_iter()
        .map(|b| (b.id, b.title))
        .collect();

    Ok(decode_all::<IssuedBook>(Collection::IssuedBooks, issues)
        .into_iter()
        .map(|issue| IssueHistoryEntry {
            user_name: names.get(&issue.user_id).cloned().unwrap_or_else(|| UNKNOWN_USER.to_string()),
            book_title: titles.get(&issue.book_id).cloned().unwrap_or_else(|| UNKNOWN_BOOK.to_string()),
            id: issue.id,
            user_id: issue.user_id,
            book_id: issue.book_id,
            issue_date: issue.issue_date,
            due_date: issue.due_date,
            return_date: issue.return_date,
            status: issue.status,
        })
        .collect())
}

/// mark_returned
///
/// Moves an issue record from `issued` to `returned`, stamping today's date.
/// Returning a record twice is a conflict.
pub async fn mark_returned(api: &dyn ResourceApi, id: &str) -> ResourceResult<IssuedBook> {
    let current: IssuedBook = decode(api.get(Collection::IssuedBooks, id).await?)?;
    if current.status == IssueStatus::Returned {
        return Err(ResourceError::conflict(format!("issue {id} already returned")));
    }
    let changes = json!({
        "status": IssueStatus::Returned,
        "returnDate": Utc::now().date_naive().format("%Y-%m-%d").to_string(),
    });
    decode(api.patch(Collection::IssuedBooks, id, changes).await?)
}

// --- Reviews ---

pub async fn reviews_for_book(api: &dyn ResourceApi, book_id: &str) -> ResourceResult<Vec<Review>> {
    let records = api.list(Collection::Reviews, &[("bookId", book_id)]).await?;
    Ok(decode_all(Collection::Reviews, records))
}

/// Posts a review authored by the signed-in actor.
pub async fn add_review(
    api: &dyn ResourceApi,
    book_id: &str,
    request: &ReviewRequest,
    author: &Session,
) -> ResourceResult<Review> {
    get_book(api, book_id).await?;
    let review = Review {
        id: new_id(),
        book_id: book_id.to_string(),
        user_id: author.id.clone(),
        user_name: author.full_name.clone(),
        rating: request.rating,
        review: request.review.trim().to_string(),
        created_at: now_rfc3339(),
    };
    decode(api.create(Collection::Reviews, serde_json::to_value(&review)?).await?)
}

// --- Activities ---

pub async fn recent_activities(api: &dyn ResourceApi, limit: usize) -> ResourceResult<Vec<Activity>> {
    let records = api
        .list(Collection::Activities, &[("_sort", "time"), ("_order", "desc")])
        .await?;
    let mut activities: Vec<Activity> = decode_all(Collection::Activities, records);
    activities.truncate(limit);
    Ok(activities)
}

pub async fn record_activity(api: &dyn ResourceApi, user: &str, book: &str, icon: &str) -> ResourceResult<Activity> {
    let activity = Activity {
        id: new_id(),
        user: user.to_string(),
        book: book.to_string(),
        time: now_rfc3339(),
        icon: icon.to_string(),
    };
    decode(api.create(Collection::Activities, serde_json::to_value(&activity)?).await?)
}

// --- Dashboard ---

pub async fn dashboard_stats(api: &dyn ResourceApi) -> ResourceResult<DashboardStats> {
    let (users, books, issues) = tokio::try_join!(
        api.list(Collection::Users, &[]),
        api.list(Collection::Books, &[]),
        api.list(Collection::IssuedBooks, &[]),
    )?;

    let customers = decode_all::<UserRecord>(Collection::Users, users)
        .into_iter()
        .filter(|u| u.role != Role::Admin)
        .count();
    let open: Vec<IssuedBook> = decode_all::<IssuedBook>(Collection::IssuedBooks, issues)
        .into_iter()
        .filter(|i| i.status == IssueStatus::Issued)
        .collect();
    let borrowers: HashSet<&str> = open.iter().map(|i| i.user_id.as_str()).collect();

    Ok(DashboardStats {
        total_books: books.len(),
        total_users: customers,
        books_issued: open.len(),
        users_with_issued_books: borrowers.len(),
    })
}
