use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::{RequestBuilder, Url};
use serde_json::Value;
use thiserror::Error;

/// Collection
///
/// The named record collections exposed by the external Resource API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Books,
    IssuedBooks,
    Reviews,
    Activities,
}

impl Collection {
    /// Path segment of the collection on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Books => "books",
            Collection::IssuedBooks => "issuedBooks",
            Collection::Reviews => "reviews",
            Collection::Activities => "activities",
        }
    }
}

/// ResourceError
///
/// Failures talking to the Resource API. None of them are retried: a failed
/// call leaves the caller's screen in its previous state.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("resource API answered with status {0}")]
    Status(u16),
    #[error("resource API unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected record shape: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid resource URL: {0}")]
    InvalidUrl(String),
    #[error("resource API unavailable: {0}")]
    Unavailable(String),
}

impl ResourceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    /// Status the portal answers with when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResourceError::NotFound(_) => StatusCode::NOT_FOUND,
            ResourceError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

pub type ResourceResult<T> = Result<T, ResourceError>;

// 1. ResourceApi Contract
/// ResourceApi
///
/// Generic CRUD over the external collections. Records are plain JSON; the
/// `library` module layers typed operations on top.
///
/// `query` pairs are passed through as URL query parameters, including the
/// `_sort`, `_order` and `_limit` conventions of the upstream API.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn list(&self, collection: Collection, query: &[(&str, &str)]) -> ResourceResult<Vec<Value>>;

    async fn get(&self, collection: Collection, id: &str) -> ResourceResult<Value>;

    /// Creates a record and returns it as stored (including the assigned id).
    async fn create(&self, collection: Collection, record: Value) -> ResourceResult<Value>;

    /// Replaces a record as a whole.
    async fn update(&self, collection: Collection, id: &str, record: Value) -> ResourceResult<Value>;

    /// Merges `changes` into a record.
    async fn patch(&self, collection: Collection, id: &str, changes: Value) -> ResourceResult<Value>;

    async fn delete(&self, collection: Collection, id: &str) -> ResourceResult<()>;
}

/// ResourceState
///
/// The shared handle to the Resource API held in the application state.
pub type ResourceState = Arc<dyn ResourceApi>;

// 2. The Real Implementation (HTTP + JSON)
/// HttpResourceApi
///
/// Talks to the Resource API over HTTP with JSON bodies.
#[derive(Clone)]
pub struct HttpResourceApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpResourceApi {
    pub fn new(base_url: &str) -> ResourceResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ResourceError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ResourceError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    /// URL of a collection, or of one record when `id` is given. The id is
    /// percent-encoded as a single path segment.
    pub fn url_for(&self, collection: Collection, id: Option<&str>) -> ResourceResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ResourceError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().push(collection.as_str());
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn send(request: RequestBuilder) -> ResourceResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        match status {
            reqwest::StatusCode::NOT_FOUND => Err(ResourceError::NotFound(url)),
            reqwest::StatusCode::CONFLICT => Err(ResourceError::Conflict(url)),
            other => Err(ResourceError::Status(other.as_u16())),
        }
    }
}

#[async_trait]
impl ResourceApi for HttpResourceApi {
    async fn list(&self, collection: Collection, query: &[(&str, &str)]) -> ResourceResult<Vec<Value>> {
        let url = self.url_for(collection, None)?;
        let response = Self::send(self.client.get(url).query(query)).await?;
        Ok(response.json().await?)
    }

    async fn get(&self, collection: Collection, id: &str) -> ResourceResult<Value> {
        let url = self.url_for(collection, Some(id))?;
        let response = Self::send(self.client.get(url)).await?;
        Ok(response.json().await?)
    }

    async fn create(&self, collection: Collection, record: Value) -> ResourceResult<Value> {
        let url = self.url_for(collection, None)?;
        let response = Self::send(self.client.post(url).json(&record)).await?;
        Ok(response.json().await?)
    }

    async fn update(&self, collection: Collection, id: &str, record: Value) -> ResourceResult<Value> {
        let url = self.url_for(collection, Some(id))?;
        let response = Self::send(self.client.put(url).json(&record)).await?;
        Ok(response.json().await?)
    }

    async fn patch(&self, collection: Collection, id: &str, changes: Value) -> ResourceResult<Value> {
        let url = self.url_for(collection, Some(id))?;
        let response = Self::send(self.client.patch(url).json(&changes)).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, collection: Collection, id: &str) -> ResourceResult<()> {
        let url = self.url_for(collection, Some(id))?;
        Self::send(self.client.delete(url)).await?;
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)
/// MockResourceApi
///
/// In-memory stand-in for the Resource API. Honours equality filters and the
/// `_sort` / `_order` / `_limit` parameters, and assigns ids on create, which is
/// enough to exercise every flow of the portal without a network.
#[derive(Default)]
pub struct MockResourceApi {
    collections: Mutex<HashMap<Collection, Vec<Value>>>,
    /// When true, every call returns a simulated failure.
    pub should_fail: bool,
}

/// Renders a JSON scalar the way it would appear in a query string.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn id_of(record: &Value) -> Option<String> {
    record.get("id").and_then(scalar_text)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => scalar_text(x).cmp(&scalar_text(y)),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl MockResourceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            collections: Mutex::default(),
            should_fail: true,
        }
    }

    /// Seeds `collection` with `records`.
    pub fn with_records(self, collection: Collection, records: Vec<Value>) -> Self {
        self.collections().entry(collection).or_default().extend(records);
        self
    }

    /// Snapshot of a collection, for assertions.
    pub fn records(&self, collection: Collection) -> Vec<Value> {
        self.collections().get(&collection).cloned().unwrap_or_default()
    }

    fn collections(&self) -> MutexGuard<'_, HashMap<Collection, Vec<Value>>> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> ResourceResult<()> {
        if self.should_fail {
            return Err(ResourceError::Unavailable(
                "Mock Resource Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }

    fn missing(collection: Collection, id: &str) -> ResourceError {
        ResourceError::not_found(format!("{}/{}", collection.as_str(), id))
    }
}

#[async_trait]
impl ResourceApi for MockResourceApi {
    async fn list(&self, collection: Collection, query: &[(&str, &str)]) -> ResourceResult<Vec<Value>> {
        self.check()?;
        let mut records: Vec<Value> = self
            .records(collection)
            .into_iter()
            .filter(|record| {
                query
                    .iter()
                    .filter(|(key, _)| !key.starts_with('_'))
                    .all(|(key, expected)| {
                        record.get(*key).and_then(scalar_text).as_deref() == Some(*expected)
                    })
            })
            .collect();

        let param = |name: &str| query.iter().find(|(key, _)| *key == name).map(|(_, v)| *v);

        if let Some(field) = param("_sort") {
            records.sort_by(|a, b| compare_values(a.get(field), b.get(field)));
            if param("_order") == Some("desc") {
                records.reverse();
            }
        }
        if let Some(limit) = param("_limit").and_then(|l| l.parse::<usize>().ok()) {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn get(&self, collection: Collection, id: &str) -> ResourceResult<Value> {
        self.check()?;
        self.records(collection)
            .into_iter()
            .find(|record| id_of(record).as_deref() == Some(id))
            .ok_or_else(|| Self::missing(collection, id))
    }

    async fn create(&self, collection: Collection, mut record: Value) -> ResourceResult<Value> {
        self.check()?;
        let Value::Object(fields) = &mut record else {
            return Err(ResourceError::Status(400));
        };
        let id = match fields.get("id").and_then(scalar_text) {
            Some(id) if !id.is_empty() => id,
            _ => {
                let id = uuid::Uuid::new_v4().simple().to_string();
                fields.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        let mut collections = self.collections();
        let records = collections.entry(collection).or_default();
        if records.iter().any(|r| id_of(r).as_deref() == Some(id.as_str())) {
            return Err(ResourceError::conflict(format!("{}/{}", collection.as_str(), id)));
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, collection: Collection, id: &str, mut record: Value) -> ResourceResult<Value> {
        self.check()?;
        if let Value::Object(fields) = &mut record {
            fields.insert("id".to_string(), Value::String(id.to_string()));
        }
        let mut collections = self.collections();
        let existing = collections
            .entry(collection)
            .or_default()
            .iter_mut()
            .find(|r| id_of(r).as_deref() == Some(id))
            .ok_or_else(|| Self::missing(collection, id))?;
        *existing = record.clone();
        Ok(record)
    }

    async fn patch(&self, collection: Collection, id: &str, changes: Value) -> ResourceResult<Value> {
        self.check()?;
        let mut collections = self.collections();
        let existing = collections
            .entry(collection)
            .or_default()
            .iter_mut()
            .find(|r| id_of(r).as_deref() == Some(id))
            .ok_or_else(|| Self::missing(collection, id))?;
        if let (Value::Object(target), Value::Object(changes)) = (&mut *existing, changes) {
            target.extend(changes);
        }
        Ok(existing.clone())
    }

    async fn delete(&self, collection: Collection, id: &str) -> ResourceResult<()> {
        self.check()?;
        let mut collections = self.collections();
        let records = collections.entry(collection).or_default();
        let before = records.len();
        records.retain(|r| id_of(r).as_deref() != Some(id));
        if records.len() == before {
            return Err(Self::missing(collection, id));
        }
        Ok(())
    }
}
