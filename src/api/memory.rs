//! In-memory transport
//!
//! Keeps collections in process, keyed by resource path. Used by `--demo`
//! and by tests, with optional latency and queued failure injection.

use super::Transport;
use crate::error::{CoreError, CoreResult};
use crate::resource::{get_resource, RecordId, ResourceKind};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

pub struct InMemoryTransport {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    failures: RwLock<VecDeque<CoreError>>,
    latency: RwLock<Duration>,
    requests: RwLock<Vec<String>>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            failures: RwLock::new(VecDeque::new()),
            latency: RwLock::new(Duration::ZERO),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Transport pre-loaded with sample records for every resource kind
    pub fn demo() -> Self {
        let mut collections = HashMap::new();
        for kind in ResourceKind::ALL {
            if let Some(def) = get_resource(kind) {
                collections.insert(def.path.clone(), demo_records(kind));
            }
        }
        Self {
            collections: RwLock::new(collections),
            ..Self::new()
        }
    }

    /// Replace the collection stored at `path`
    pub async fn seed(&self, path: &str, records: Vec<Value>) {
        self.collections
            .write()
            .await
            .insert(path.to_string(), records);
    }

    pub async fn records(&self, path: &str) -> Vec<Value> {
        self.collections
            .read()
            .await
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    /// Fail the next request with `error`. Queued failures are used in order.
    pub async fn fail_next(&self, error: CoreError) {
        self.failures.write().await.push_back(error);
    }

    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    /// Requests seen so far, as "METHOD path"
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    async fn enter(&self, method: &str, path: &str) -> CoreResult<()> {
        debug!("{} {} (in-memory)", method, path);
        self.requests.write().await.push(format!("{} {}", method, path));

        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.failures.write().await.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn position(records: &[Value], id: &RecordId) -> Option<usize> {
    records
        .iter()
        .position(|r| r.get("_id").and_then(|v| v.as_str()) == Some(id.as_str()))
}

fn missing(id: &RecordId) -> CoreError {
    CoreError::Conflict(format!("record {} no longer exists", id))
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn list(&self, path: &str) -> CoreResult<Value> {
        self.enter("GET", path).await?;
        Ok(Value::Array(self.records(path).await))
    }

    async fn get(&self, path: &str, id: &RecordId) -> CoreResult<Value> {
        self.enter("GET", &format!("{}/{}", path, id)).await?;
        let records = self.records(path).await;
        match position(&records, id) {
            Some(idx) => Ok(json!({ "data": records[idx] })),
            None => Err(CoreError::Network("Resource not found.".to_string())),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> CoreResult<Value> {
        self.enter("POST", path).await?;
        let mut record = match body {
            Value::Object(map) => map.clone(),
            _ => return Err(CoreError::Network("Invalid request body.".to_string())),
        };
        record.insert("_id".to_string(), json!(Uuid::new_v4().simple().to_string()));
        let record = Value::Object(record);

        self.collections
            .write()
            .await
            .entry(path.to_string())
            .or_default()
            .push(record.clone());
        Ok(json!({ "data": record }))
    }

    async fn put(&self, path: &str, id: &RecordId, body: &Value) -> CoreResult<Value> {
        self.enter("PUT", &format!("{}/{}", path, id)).await?;
        let mut collections = self.collections.write().await;
        let records = collections.entry(path.to_string()).or_default();
        let idx = position(records, id).ok_or_else(|| missing(id))?;

        let mut merged: Map<String, Value> = match &records[idx] {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        if let Value::Object(changes) = body {
            for (key, value) in changes {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged.insert("_id".to_string(), json!(id.as_str()));
        records[idx] = Value::Object(merged);
        Ok(json!({ "data": records[idx] }))
    }

    async fn delete(&self, path: &str, id: &RecordId) -> CoreResult<Value> {
        self.enter("DELETE", &format!("{}/{}", path, id)).await?;
        let mut collections = self.collections.write().await;
        let records = collections.entry(path.to_string()).or_default();
        let idx = position(records, id).ok_or_else(|| missing(id))?;
        records.remove(idx);
        Ok(Value::Null)
    }
}

// =============================================================================
// Demo data
// =============================================================================

const WARDS: [&str; 5] = ["Kudan", "Hunkuyi", "Likoro", "Taba", "Doka"];
const VILLAGES: [&str; 4] = ["Tudun Wada", "Sabon Gari", "Unguwan Sarki", "Kauran Wali"];
const HAMLETS: [&str; 3] = ["Gabas", "Yamma", "Tsakiya"];
const SURVEYORS: [&str; 3] = ["A. Bello", "F. Musa", "I. Yusuf"];

fn pick<'a>(items: &[&'a str], i: usize) -> &'a str {
    items[i % items.len()]
}

fn site_fields(i: usize) -> Map<String, Value> {
    let captured = Utc::now() - ChronoDuration::days((i * 6) as i64);
    let mut map = Map::new();
    map.insert("_id".into(), json!(format!("demo-{:04}", i + 1)));
    map.insert("picture".into(), json!(""));
    map.insert("ward".into(), json!(pick(&WARDS, i)));
    map.insert("village".into(), json!(pick(&VILLAGES, i / 2)));
    map.insert("hamlet".into(), json!(pick(&HAMLETS, i / 3)));
    map.insert(
        "geolocation".into(),
        json!({
            "type": "Point",
            "coordinates": [7.70 + (i as f64) * 0.013, 11.25 + (i as f64) * 0.007]
        }),
    );
    map.insert("createdBy".into(), json!(pick(&SURVEYORS, i)));
    map.insert(
        "capturedAt".into(),
        json!(captured.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    map
}

fn demo_records(kind: ResourceKind) -> Vec<Value> {
    let count = match kind {
        ResourceKind::DumpSites => 23,
        ResourceKind::Gutters => 17,
        ResourceKind::SoakAways => 12,
        ResourceKind::ToiletFacilities => 14,
        ResourceKind::OpenDefecation => 9,
    };
    (0..count).map(|i| demo_record(kind, i)).collect()
}

fn demo_record(kind: ResourceKind, i: usize) -> Value {
    let mut map = site_fields(i);
    let extra = match kind {
        ResourceKind::DumpSites => json!({
            "condition": pick(&["Permanent", "Temporary", "Period"], i),
            "status": pick(&["Improved", "Unimproved", "Unimproved"], i),
            "safetyRisk": pick(&["Maintained", "High Risk", "Unmaintained", "Maintained"], i),
            "evacuationSchedule": pick(&["pending", "opened", "closed"], i),
        }),
        ResourceKind::Gutters => json!({
            "condition": pick(&["Constructed with Block", "Earth Drain", "Concrete Lined"], i),
            "status": pick(&["Maintained", "Unmaintained", "High Risk"], i),
            "dischargePoint": pick(&["yes", "no"], i / 2),
        }),
        ResourceKind::SoakAways => json!({
            "type": pick(&["Covered", "Uncovered"], i),
            "status": pick(&["Functional", "Functional", "Non-Functional"], i),
            "condition": pick(&["Good", "Fair", "Poor"], i),
        }),
        ResourceKind::ToiletFacilities => json!({
            "facilityType": pick(&["Western Style", "Pit Latrine", "VIP Latrine"], i),
            "status": pick(&["Functional", "Under Repair", "Functional", "Non-Functional"], i),
        }),
        ResourceKind::OpenDefecation => {
            for key in ["picture", "village", "hamlet"] {
                map.remove(key);
            }
            json!({
                "location": pick(&["Market square", "River bank", "Motor park", "School fence"], i),
                "demographics": pick(&["Adult Male", "Children", "Adult Female"], i),
                "severity": pick(&["High", "Medium", "Low"], i),
            })
        }
    };
    if let Value::Object(extra) = extra {
        map.extend(extra);
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::decode_collection;

    #[tokio::test]
    async fn test_demo_data_decodes_for_every_kind() {
        let transport = InMemoryTransport::demo();
        for kind in ResourceKind::ALL {
            let def = get_resource(kind).unwrap();
            let body = transport.list(&def.path).await.unwrap();
            let records = decode_collection(kind, body).unwrap();
            assert!(!records.is_empty(), "{} has no demo records", kind);
        }
    }

    #[tokio::test]
    async fn test_crud_cycle() {
        let transport = InMemoryTransport::new();
        let created = transport
            .post("/gutters", &json!({"ward": "Kudan"}))
            .await
            .unwrap();
        let id = RecordId::new(created["data"]["_id"].as_str().unwrap());

        transport
            .put("/gutters", &id, &json!({"ward": "Taba"}))
            .await
            .unwrap();
        let fetched = transport.get("/gutters", &id).await.unwrap();
        assert_eq!(fetched["data"]["ward"], "Taba");

        transport.delete("/gutters", &id).await.unwrap();
        assert!(transport.records("/gutters").await.is_empty());

        let err = transport.delete("/gutters", &id).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(
            transport.requests().await,
            vec![
                "POST /gutters".to_string(),
                format!("PUT /gutters/{}", id),
                format!("GET /gutters/{}", id),
                format!("DELETE /gutters/{}", id),
                format!("DELETE /gutters/{}", id),
            ]
        );
    }

    #[tokio::test]
    async fn test_injected_failure_used_once() {
        let transport = InMemoryTransport::new();
        transport.fail_next(CoreError::Network("down".into())).await;
        assert!(transport.list("/gutters").await.is_err());
        assert!(transport.list("/gutters").await.is_ok());
    }
}
