//! Transport layer
//!
//! The coordinator talks to the backend only through [`Transport`]. Two
//! implementations ship with the crate:
//!
//! - [`http::HttpTransport`] - REST client for the WASH API
//! - [`memory::InMemoryTransport`] - Seeded in-process store for demo mode and tests

pub mod http;
pub mod memory;

use crate::error::{CoreError, CoreResult};
use crate::resource::RecordId;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on automatic fetch retries
pub const MAX_FETCH_RETRIES: u32 = 3;

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Injected backend capability. Responses are returned raw; decoding happens
/// in the core.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path`
    async fn list(&self, path: &str) -> CoreResult<Value>;

    /// GET `path/id`
    async fn get(&self, path: &str, id: &RecordId) -> CoreResult<Value>;

    /// POST `path`
    async fn post(&self, path: &str, body: &Value) -> CoreResult<Value>;

    /// PUT `path/id`
    async fn put(&self, path: &str, id: &RecordId, body: &Value) -> CoreResult<Value>;

    /// DELETE `path/id`
    async fn delete(&self, path: &str, id: &RecordId) -> CoreResult<Value>;
}

/// A mutation request in transport terms
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Post {
        path: String,
        body: Value,
    },
    Put {
        path: String,
        id: RecordId,
        body: Value,
    },
    Delete {
        path: String,
        id: RecordId,
    },
}

impl TransportCall {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Post { .. } => "POST",
            Self::Put { .. } => "PUT",
            Self::Delete { .. } => "DELETE",
        }
    }

    async fn send(&self, transport: &dyn Transport) -> CoreResult<Value> {
        match self {
            Self::Post { path, body } => transport.post(path, body).await,
            Self::Put { path, id, body } => transport.put(path, id, body).await,
            Self::Delete { path, id } => transport.delete(path, id).await,
        }
    }
}

/// Run a transport future, mapping an elapsed deadline to `Timeout`
pub async fn with_timeout<F>(limit: Duration, fut: F) -> CoreResult<Value>
where
    F: std::future::Future<Output = CoreResult<Value>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Timeout(limit)),
    }
}

/// Send a mutation once. Mutations are never retried.
pub async fn execute(
    transport: &dyn Transport,
    call: &TransportCall,
    limit: Duration,
) -> CoreResult<Value> {
    debug!("{} mutation dispatched", call.method());
    with_timeout(limit, call.send(transport)).await
}

/// Fetch a collection, retrying transient failures up to `retries` times
/// (capped at [`MAX_FETCH_RETRIES`])
pub async fn fetch_collection(
    transport: &dyn Transport,
    path: &str,
    limit: Duration,
    retries: u32,
) -> CoreResult<Value> {
    let retries = retries.min(MAX_FETCH_RETRIES);
    let mut attempt = 0;
    loop {
        match with_timeout(limit, transport.list(path)).await {
            Err(e) if e.is_transient() && attempt < retries => {
                attempt += 1;
                warn!("GET {} failed ({}), retry {}/{}", path, e, attempt, retries);
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            result => return result,
        }
    }
}

pub async fn fetch_record(
    transport: &dyn Transport,
    path: &str,
    id: &RecordId,
    limit: Duration,
) -> CoreResult<Value> {
    with_timeout(limit, transport.get(path, id)).await
}
