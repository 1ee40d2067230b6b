//! Collaborators for canvas persistence and user credentials.
//!
//! The canvas store owns saved snapshots and the canvas list; the core only
//! reads the initial snapshot through it when a canvas view mounts. The
//! credential store holds the opaque bearer token.

mod credentials;
mod http;
mod memory;

pub use credentials::{CredentialError, CredentialStore, FileCredentials, MemoryCredentials};
pub use http::{HttpCanvasStore, status_error};
pub use memory::MemoryCanvasStore;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Canvas store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The caller may not access this canvas (HTTP 403).
    #[error("permission denied")]
    PermissionDenied,
    /// No valid credential was presented (HTTP 401).
    #[error("not authenticated")]
    Unauthenticated,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("store error: {0}")]
    Other(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Owner of a canvas as reported in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasOwner {
    pub email: String,
}

/// One entry of a canvas listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<CanvasOwner>,
    #[serde(default)]
    pub shared_with: Vec<String>,
}

impl CanvasSummary {
    /// Short label used when listing canvases: the last six characters of
    /// the id.
    pub fn short_label(&self) -> &str {
        let start = self
            .id
            .char_indices()
            .rev()
            .nth(5)
            .map_or(0, |(i, _)| i);
        &self.id[start..]
    }
}

/// Body of `GET /api/canvas/load/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadResponse {
    #[serde(default)]
    pub elements: Vec<Value>,
}

/// Body of `POST /api/canvas/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub canvas_id: String,
}

/// Body of `POST /api/canvas/share`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub canvas_id: String,
    pub email: String,
}

impl ShareRequest {
    /// Build a share request, trimming and checking the address.
    pub fn new(canvas_id: &str, email: &str) -> StoreResult<Self> {
        let email = email.trim();
        if email.is_empty() {
            return Err(StoreError::BadRequest("Please enter an email address.".to_string()));
        }
        if !is_valid_email(email) {
            return Err(StoreError::BadRequest("Please enter a valid email address.".to_string()));
        }
        Ok(Self {
            canvas_id: canvas_id.to_string(),
            email: email.to_string(),
        })
    }
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Trait for canvas storage backends.
///
/// Every call carries the caller's bearer token; authorization decisions
/// belong to the store.
pub trait CanvasStore: Send + Sync {
    /// Fetch the saved snapshot of a canvas.
    fn load(&self, canvas_id: &str, token: &str) -> BoxFuture<'_, StoreResult<Vec<Value>>>;

    /// Canvases owned by the caller.
    fn list(&self, token: &str) -> BoxFuture<'_, StoreResult<Vec<CanvasSummary>>>;

    /// Canvases shared with the caller.
    fn list_shared(&self, token: &str) -> BoxFuture<'_, StoreResult<Vec<CanvasSummary>>>;

    /// Create an empty canvas owned by the caller; returns its id.
    fn create(&self, token: &str) -> BoxFuture<'_, StoreResult<String>>;

    fn delete(&self, canvas_id: &str, token: &str) -> BoxFuture<'_, StoreResult<()>>;

    /// Grant another user access to a canvas.
    fn share(&self, request: &ShareRequest, token: &str) -> BoxFuture<'_, StoreResult<()>>;
}
