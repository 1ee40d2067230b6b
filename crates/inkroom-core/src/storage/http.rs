//! Canvas store backed by the REST API.
//!
//! The returned futures run on whatever async runtime drives them (reqwest
//! needs tokio underneath).

use super::{
    BoxFuture, CanvasStore, CanvasSummary, CreateResponse, LoadResponse, ShareRequest, StoreError,
    StoreResult,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Map a non-success HTTP status to a store error.
pub fn status_error(status: StatusCode, message: Option<String>) -> StoreError {
    let message = message.unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::UNAUTHORIZED => StoreError::Unauthenticated,
        StatusCode::FORBIDDEN => StoreError::PermissionDenied,
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        StatusCode::BAD_REQUEST => StoreError::BadRequest(message),
        _ => StoreError::Network(message),
    }
}

fn network(e: reqwest::Error) -> StoreError {
    if e.is_decode() {
        StoreError::Serialization(e.to_string())
    } else {
        StoreError::Network(e.to_string())
    }
}

/// HTTP client for `/api/canvas/*`.
#[derive(Debug, Clone)]
pub struct HttpCanvasStore {
    client: Client,
    base_url: String,
}

impl HttpCanvasStore {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/canvas/{}", self.base_url, path)
    }

    async fn send(request: RequestBuilder, token: &str) -> StoreResult<Response> {
        let response = request.bearer_auth(token).send().await.map_err(network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message);
        log::warn!("Canvas API returned {}: {:?}", status, message);
        Err(status_error(status, message))
    }

    async fn fetch<T: DeserializeOwned>(request: RequestBuilder, token: &str) -> StoreResult<T> {
        Self::send(request, token).await?.json().await.map_err(network)
    }
}

impl CanvasStore for HttpCanvasStore {
    fn load(&self, canvas_id: &str, token: &str) -> BoxFuture<'_, StoreResult<Vec<Value>>> {
        let request = self.client.get(self.url(&format!("load/{}", canvas_id)));
        let token = token.to_string();
        Box::pin(async move {
            let body: LoadResponse = Self::fetch(request, &token).await?;
            Ok(body.elements)
        })
    }

    fn list(&self, token: &str) -> BoxFuture<'_, StoreResult<Vec<CanvasSummary>>> {
        let request = self.client.get(self.url("list"));
        let token = token.to_string();
        Box::pin(async move { Self::fetch(request, &token).await })
    }

    fn list_shared(&self, token: &str) -> BoxFuture<'_, StoreResult<Vec<CanvasSummary>>> {
        let request = self.client.get(self.url("shared"));
        let token = token.to_string();
        Box::pin(async move { Self::fetch(request, &token).await })
    }

    fn create(&self, token: &str) -> BoxFuture<'_, StoreResult<String>> {
        let request = self
            .client
            .post(self.url("create"))
            .json(&serde_json::json!({}));
        let token = token.to_string();
        Box::pin(async move {
            let body: CreateResponse = Self::fetch(request, &token).await?;
            Ok(body.canvas_id)
        })
    }

    fn delete(&self, canvas_id: &str, token: &str) -> BoxFuture<'_, StoreResult<()>> {
        let request = self.client.delete(self.url(&format!("delete/{}", canvas_id)));
        let token = token.to_string();
        Box::pin(async move {
            Self::send(request, &token).await?;
            Ok(())
        })
    }

    fn share(&self, request: &ShareRequest, token: &str) -> BoxFuture<'_, StoreResult<()>> {
        let request = self.client.post(self.url("share")).json(request);
        let token = token.to_string();
        Box::pin(async move {
            Self::send(request, &token).await?;
            Ok(())
        })
    }
}
