//! Typed records
//!
//! Each resource kind has a fixed schema. Responses are decoded into the typed
//! struct for their kind at the transport boundary; anything that does not fit
//! the schema fails with `CoreError::Decode` instead of flowing into the UI.

use super::kind::ResourceKind;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Stable server-assigned record identifier (`_id`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// GeoJSON point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    #[serde(rename = "type", default = "default_point")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

fn default_point() -> String {
    "Point".to_string()
}

impl Geolocation {
    pub fn point(coordinates: Vec<f64>) -> Self {
        Self {
            kind: default_point(),
            coordinates,
        }
    }
}

/// Location and capture metadata shared by the surveyed site kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    #[serde(default)]
    pub picture: String,
    pub ward: String,
    pub village: String,
    pub hamlet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<Geolocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DumpSiteCondition {
    Period,
    Temporary,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Improvement {
    Improved,
    Unimproved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Maintenance {
    Maintained,
    Unmaintained,
    #[serde(rename = "High Risk")]
    HighRisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvacuationSchedule {
    Opened,
    Closed,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cover {
    Covered,
    Uncovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Functionality {
    Functional,
    #[serde(rename = "Non-Functional")]
    NonFunctional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacilityStatus {
    Functional,
    #[serde(rename = "Under Repair")]
    UnderRepair,
    #[serde(rename = "Non-Functional")]
    NonFunctional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

// =============================================================================
// Schemas
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpSite {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub site: SiteInfo,
    pub condition: DumpSiteCondition,
    pub status: Improvement,
    pub safety_risk: Maintenance,
    pub evacuation_schedule: EvacuationSchedule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evacuation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_scheduled_evacuation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gutter {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub site: SiteInfo,
    pub condition: String,
    pub status: Maintenance,
    pub discharge_point: YesNo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoakAway {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub site: SiteInfo,
    #[serde(rename = "type")]
    pub cover: Cover,
    pub status: Functionality,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToiletFacility {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub site: SiteInfo,
    pub facility_type: String,
    pub status: FacilityStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDefecationObservation {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub location: String,
    #[serde(default)]
    pub ward: String,
    pub demographics: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<Geolocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

/// Typed payload of a record, tagged by kind
#[derive(Debug, Clone, PartialEq)]
pub enum RecordData {
    DumpSite(DumpSite),
    Gutter(Gutter),
    SoakAway(SoakAway),
    ToiletFacility(ToiletFacility),
    OpenDefecation(OpenDefecationObservation),
}

impl RecordData {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::DumpSite(_) => ResourceKind::DumpSites,
            Self::Gutter(_) => ResourceKind::Gutters,
            Self::SoakAway(_) => ResourceKind::SoakAways,
            Self::ToiletFacility(_) => ResourceKind::ToiletFacilities,
            Self::OpenDefecation(_) => ResourceKind::OpenDefecation,
        }
    }

    fn id(&self) -> &RecordId {
        match self {
            Self::DumpSite(r) => &r.id,
            Self::Gutter(r) => &r.id,
            Self::SoakAway(r) => &r.id,
            Self::ToiletFacility(r) => &r.id,
            Self::OpenDefecation(r) => &r.id,
        }
    }

    fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            Self::DumpSite(r) => serde_json::to_value(r),
            Self::Gutter(r) => serde_json::to_value(r),
            Self::SoakAway(r) => serde_json::to_value(r),
            Self::ToiletFacility(r) => serde_json::to_value(r),
            Self::OpenDefecation(r) => serde_json::to_value(r),
        }
    }
}

/// A decoded record
///
/// `fields` is the canonical JSON form of `data` and backs column display,
/// filtering, and metric predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    data: RecordData,
    fields: Value,
}

impl Record {
    /// Decode a single record of the given kind
    pub fn decode(kind: ResourceKind, value: Value) -> CoreResult<Self> {
        let data = match kind {
            ResourceKind::DumpSites => RecordData::DumpSite(decode_as(kind, value)?),
            ResourceKind::Gutters => RecordData::Gutter(decode_as(kind, value)?),
            ResourceKind::SoakAways => RecordData::SoakAway(decode_as(kind, value)?),
            ResourceKind::ToiletFacilities => RecordData::ToiletFacility(decode_as(kind, value)?),
            ResourceKind::OpenDefecation => RecordData::OpenDefecation(decode_as(kind, value)?),
        };
        Self::from_data(data)
    }

    pub fn from_data(data: RecordData) -> CoreResult<Self> {
        let fields = data
            .to_value()
            .map_err(|e| CoreError::Decode(format!("{}: {}", data.kind(), e)))?;
        Ok(Self { data, fields })
    }

    pub fn id(&self) -> &RecordId {
        self.data.id()
    }

    pub fn kind(&self) -> ResourceKind {
        self.data.kind()
    }

    pub fn data(&self) -> &RecordData {
        &self.data
    }

    pub fn fields(&self) -> &Value {
        &self.fields
    }

    /// Display value at a dot-notation path ("-" when absent)
    pub fn field(&self, path: &str) -> String {
        extract_json_value(&self.fields, path)
    }

    /// Raw value at a dot-notation path
    pub fn field_value(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.fields, path)
    }
}

fn decode_as<T: DeserializeOwned>(kind: ResourceKind, value: Value) -> CoreResult<T> {
    serde_json::from_value(value).map_err(|e| CoreError::Decode(format!("{}: {}", kind, e)))
}

/// Split an API response into its payload and optional server message.
///
/// The API answers either with a bare payload or with
/// `{ "data": ..., "message": "..." }`.
pub fn split_envelope(response: Value) -> (Value, Option<String>) {
    match response {
        Value::Object(mut map) if map.contains_key("data") || map.contains_key("message") => {
            let message = map
                .get("message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string());
            let data = map.remove("data").unwrap_or(Value::Null);
            (data, message)
        }
        other => (other, None),
    }
}

/// Decode a full collection response.
///
/// Fails on a non-array payload, on any record that does not fit the schema,
/// and on duplicate ids.
pub fn decode_collection(kind: ResourceKind, response: Value) -> CoreResult<Vec<Record>> {
    let (payload, _) = split_envelope(response);
    let items = match payload {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            return Err(CoreError::Decode(format!(
                "{}: expected a list, got {}",
                kind,
                json_type_name(&other)
            )))
        }
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let record = Record::decode(kind, item)?;
        if !seen.insert(record.id().clone()) {
            return Err(CoreError::Decode(format!(
                "{}: duplicate id {}",
                kind,
                record.id()
            )));
        }
        records.push(record);
    }
    Ok(records)
}

/// Decode a single-record response
pub fn decode_single(kind: ResourceKind, response: Value) -> CoreResult<Record> {
    let (payload, _) = split_envelope(response);
    Record::decode(kind, payload)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn lookup_path<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = item;
    for part in path.split('.') {
        current = match part.parse::<usize>() {
            Ok(idx) => current.get(idx)?,
            Err(_) => current.get(part)?,
        };
    }
    Some(current)
}

/// Extract a value from JSON using a dot-notation path
pub fn extract_json_value(item: &Value, path: &str) -> String {
    match lookup_path(item, path) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(arr)) => arr
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::Object(_)) => "[object]".to_string(),
        Some(Value::Null) | None => "-".to_string(),
    }
}
