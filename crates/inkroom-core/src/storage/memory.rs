//! In-memory canvas store.

use super::{
    BoxFuture, CanvasOwner, CanvasStore, CanvasSummary, ShareRequest, StoreError, StoreResult,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredCanvas {
    owner: String,
    shared_with: Vec<String>,
    elements: Vec<Value>,
}

impl StoredCanvas {
    fn can_view(&self, email: &str) -> bool {
        self.owner == email || self.shared_with.iter().any(|e| e == email)
    }

    fn summary(&self, id: &str) -> CanvasSummary {
        CanvasSummary {
            id: id.to_string(),
            owner: Some(CanvasOwner {
                email: self.owner.clone(),
            }),
            shared_with: self.shared_with.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// token -> email
    users: HashMap<String, String>,
    canvases: HashMap<String, StoredCanvas>,
    failure: Option<StoreError>,
}

impl Inner {
    fn check(&self, token: &str) -> StoreResult<String> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        self.users
            .get(token)
            .cloned()
            .ok_or(StoreError::Unauthenticated)
    }

    fn canvas(&self, id: &str) -> StoreResult<&StoredCanvas> {
        self.canvases
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("canvas {}", id)))
    }
}

/// In-memory canvas store for testing and offline use. Applies the same
/// access rules as the server: owners and shared users may load; only the
/// owner may delete or share.
#[derive(Debug, Default)]
pub struct MemoryCanvasStore {
    inner: RwLock<Inner>,
}

impl MemoryCanvasStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))
    }

    /// Register a user and the token that identifies them.
    pub fn register(&self, token: &str, email: &str) {
        if let Ok(mut inner) = self.write() {
            inner.users.insert(token.to_string(), email.to_string());
        }
    }

    /// Insert or overwrite a canvas.
    pub fn insert_canvas(&self, id: &str, owner: &str, elements: Vec<Value>) {
        if let Ok(mut inner) = self.write() {
            inner.canvases.insert(
                id.to_string(),
                StoredCanvas {
                    owner: owner.to_string(),
                    shared_with: Vec::new(),
                    elements,
                },
            );
        }
    }

    /// Make every following call fail with `failure`, or clear it.
    pub fn set_failure(&self, failure: Option<StoreError>) {
        if let Ok(mut inner) = self.write() {
            inner.failure = failure;
        }
    }

    fn summaries(&self, token: &str, owned: bool) -> StoreResult<Vec<CanvasSummary>> {
        let inner = self.read()?;
        let email = inner.check(token)?;
        let mut list: Vec<CanvasSummary> = inner
            .canvases
            .iter()
            .filter(|(_, c)| {
                if owned {
                    c.owner == email
                } else {
                    c.shared_with.contains(&email)
                }
            })
            .map(|(id, c)| c.summary(id))
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(list)
    }
}

impl CanvasStore for MemoryCanvasStore {
    fn load(&self, canvas_id: &str, token: &str) -> BoxFuture<'_, StoreResult<Vec<Value>>> {
        let (canvas_id, token) = (canvas_id.to_string(), token.to_string());
        Box::pin(async move {
            let inner = self.read()?;
            let email = inner.check(&token)?;
            let canvas = inner.canvas(&canvas_id)?;
            if !canvas.can_view(&email) {
                return Err(StoreError::PermissionDenied);
            }
            Ok(canvas.elements.clone())
        })
    }

    fn list(&self, token: &str) -> BoxFuture<'_, StoreResult<Vec<CanvasSummary>>> {
        let token = token.to_string();
        Box::pin(async move { self.summaries(&token, true) })
    }

    fn list_shared(&self, token: &str) -> BoxFuture<'_, StoreResult<Vec<CanvasSummary>>> {
        let token = token.to_string();
        Box::pin(async move { self.summaries(&token, false) })
    }

    fn create(&self, token: &str) -> BoxFuture<'_, StoreResult<String>> {
        let token = token.to_string();
        Box::pin(async move {
            let mut inner = self.write()?;
            let owner = inner.check(&token)?;
            let id = Uuid::new_v4().simple().to_string();
            inner.canvases.insert(
                id.clone(),
                StoredCanvas {
                    owner,
                    shared_with: Vec::new(),
                    elements: Vec::new(),
                },
            );
            Ok(id)
        })
    }

    fn delete(&self, canvas_id: &str, token: &str) -> BoxFuture<'_, StoreResult<()>> {
        let (canvas_id, token) = (canvas_id.to_string(), token.to_string());
        Box::pin(async move {
            let mut inner = self.write()?;
            let email = inner.check(&token)?;
            if inner.canvas(&canvas_id)?.owner != email {
                return Err(StoreError::PermissionDenied);
            }
            inner.canvases.remove(&canvas_id);
            Ok(())
        })
    }

    fn share(&self, request: &ShareRequest, token: &str) -> BoxFuture<'_, StoreResult<()>> {
        let (request, token) = (request.clone(), token.to_string());
        Box::pin(async move {
            let mut inner = self.write()?;
            let email = inner.check(&token)?;
            if !inner.users.values().any(|u| *u == request.email) {
                return Err(StoreError::NotFound(format!("user {}", request.email)));
            }
            if inner.canvas(&request.canvas_id)?.owner != email {
                return Err(StoreError::PermissionDenied);
            }
            if let Some(canvas) = inner.canvases.get_mut(&request.canvas_id) {
                if !canvas.shared_with.contains(&request.email) {
                    canvas.shared_with.push(request.email);
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_util::block_on;
    use serde_json::json;

    fn store() -> MemoryCanvasStore {
        let store = MemoryCanvasStore::new();
        store.register("t-owner", "owner@x.io");
        store.register("t-friend", "friend@x.io");
        store.register("t-other", "other@x.io");
        store.insert_canvas("c1", "owner@x.io", vec![json!({"type": "LINE"})]);
        store
    }

    #[test]
    fn test_load_rules() {
        let store = store();
        assert_eq!(block_on(store.load("c1", "t-owner")).unwrap().len(), 1);
        assert_eq!(
            block_on(store.load("c1", "t-other")),
            Err(StoreError::PermissionDenied)
        );
        assert_eq!(
            block_on(store.load("c1", "nobody")),
            Err(StoreError::Unauthenticated)
        );
        assert!(matches!(
            block_on(store.load("missing", "t-owner")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_share_grants_view() {
        let store = store();
        let request = ShareRequest::new("c1", "friend@x.io").unwrap();
        assert_eq!(
            block_on(store.share(&request, "t-friend")),
            Err(StoreError::PermissionDenied)
        );
        block_on(store.share(&request, "t-owner")).unwrap();
        assert_eq!(block_on(store.load("c1", "t-friend")).unwrap().len(), 1);
        let shared = block_on(store.list_shared("t-friend")).unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].owner.as_ref().unwrap().email, "owner@x.io");
    }

    #[test]
    fn test_share_unknown_user() {
        let store = store();
        let request = ShareRequest::new("c1", "ghost@x.io").unwrap();
        assert!(matches!(
            block_on(store.share(&request, "t-owner")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_create_list_delete() {
        let store = store();
        let id = block_on(store.create("t-other")).unwrap();
        let list = block_on(store.list("t-other")).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, id);
        assert!(block_on(store.load(&id, "t-other")).unwrap().is_empty());
        assert_eq!(
            block_on(store.delete(&id, "t-owner")),
            Err(StoreError::PermissionDenied)
        );
        block_on(store.delete(&id, "t-other")).unwrap();
        assert!(block_on(store.list("t-other")).unwrap().is_empty());
    }

    #[test]
    fn test_injected_failure() {
        let store = store();
        store.set_failure(Some(StoreError::Network("offline".to_string())));
        assert_eq!(
            block_on(store.load("c1", "t-owner")),
            Err(StoreError::Network("offline".to_string()))
        );
        store.set_failure(None);
        assert!(block_on(store.load("c1", "t-owner")).is_ok());
    }
}
