//! Form drafts
//!
//! A draft is an uncommitted copy of a record's editable fields, held as
//! plain strings until submission. Validation happens locally and turns the
//! draft into the JSON body sent to the API.

use super::kind::ResourceKind;
use super::record::Record;
use super::registry::{FieldInput, ResourceDef};
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    kind: ResourceKind,
    values: Vec<(String, String)>,
    errors: BTreeMap<String, String>,
}

impl Draft {
    /// Empty draft for a new record, pre-filled with field defaults
    pub fn blank(kind: ResourceKind, def: &ResourceDef) -> Self {
        let values = def
            .fields
            .iter()
            .map(|f| (f.key.clone(), f.default.clone().unwrap_or_default()))
            .collect();
        Self {
            kind,
            values,
            errors: BTreeMap::new(),
        }
    }

    /// Draft holding a copy of an existing record's fields
    pub fn from_record(def: &ResourceDef, record: &Record) -> Self {
        let values = def
            .fields
            .iter()
            .map(|f| {
                let raw = record.field_value(&f.key);
                let text = match (&f.input, raw) {
                    (_, None) | (_, Some(Value::Null)) => String::new(),
                    (FieldInput::Coordinates, Some(v)) => v
                        .get("coordinates")
                        .and_then(|c| c.as_array())
                        .map(|coords| {
                            coords
                                .iter()
                                .map(|c| c.to_string())
                                .collect::<Vec<_>>()
                                .join(", ")
                        })
                        .unwrap_or_default(),
                    (_, Some(Value::String(s))) => s.clone(),
                    (_, Some(other)) => other.to_string(),
                };
                (f.key.clone(), text)
            })
            .collect();
        Self {
            kind: record.kind(),
            values,
            errors: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn get(&self, key: &str) -> &str {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Set a field value; clears any validation message on that field
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.values.push((key.to_string(), value)),
        }
        self.errors.remove(key);
    }

    /// Step a choice field to the next (or previous) allowed value
    pub fn cycle_choice(&mut self, def: &ResourceDef, key: &str, forward: bool) {
        let Some(FieldInput::Choice { choices }) = def.field_def(key).map(|f| &f.input) else {
            return;
        };
        if choices.is_empty() {
            return;
        }
        let next = match choices.iter().position(|c| c == self.get(key)) {
            Some(idx) if forward => (idx + 1) % choices.len(),
            Some(idx) => (idx + choices.len() - 1) % choices.len(),
            None if forward => 0,
            None => choices.len() - 1,
        };
        self.set(key, choices[next].clone());
    }

    pub fn error(&self, key: &str) -> Option<&str> {
        self.errors.get(key).map(|s| s.as_str())
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Check every field and build the request body.
    ///
    /// On failure the field-level messages are kept on the draft and the
    /// first failing field (in form order) is returned. Values are never
    /// cleared.
    pub fn validate(&mut self, def: &ResourceDef) -> CoreResult<Value> {
        let mut body = Map::new();
        let mut errors = BTreeMap::new();
        let mut first: Option<CoreError> = None;

        for field in &def.fields {
            let raw = self.get(&field.key).trim();
            if raw.is_empty() {
                if field.required {
                    let msg = format!("{} is required", field.label);
                    first.get_or_insert_with(|| CoreError::validation(&field.key, msg.clone()));
                    errors.insert(field.key.clone(), msg);
                }
                continue;
            }

            match parse_field(&field.input, &field.label, raw) {
                Ok(value) => {
                    body.insert(field.key.clone(), value);
                }
                Err(msg) => {
                    first.get_or_insert_with(|| CoreError::validation(&field.key, msg.clone()));
                    errors.insert(field.key.clone(), msg);
                }
            }
        }

        self.errors = errors;
        match first {
            Some(err) => Err(err),
            None => Ok(Value::Object(body)),
        }
    }
}

fn parse_field(input: &FieldInput, label: &str, raw: &str) -> Result<Value, String> {
    match input {
        FieldInput::Text => Ok(Value::String(raw.to_string())),
        FieldInput::Choice { choices } => {
            if choices.iter().any(|c| c == raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(format!("{} must be one of: {}", label, choices.join(", ")))
            }
        }
        FieldInput::Coordinates => parse_coordinates(raw).map(|coords| {
            json!({
                "type": "Point",
                "coordinates": coords,
            })
        }),
        FieldInput::Timestamp => DateTime::parse_from_rfc3339(raw)
            .map(|t| {
                Value::String(
                    t.with_timezone(&Utc)
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                )
            })
            .map_err(|_| format!("{} must be an RFC 3339 timestamp", label)),
    }
}

/// Parse "lng, lat" or "lng, lat, alt"
fn parse_coordinates(raw: &str) -> Result<Vec<f64>, String> {
    let coords = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| "Coordinates must be numbers".to_string())?;

    if !(2..=3).contains(&coords.len()) {
        return Err("Coordinates must be \"lng, lat\" or \"lng, lat, alt\"".to_string());
    }
    if !(-180.0..=180.0).contains(&coords[0]) {
        return Err("Longitude must be between -180 and 180".to_string());
    }
    if !(-90.0..=90.0).contains(&coords[1]) {
        return Err("Latitude must be between -90 and 90".to_string());
    }
    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::get_resource;

    fn gutter_def() -> &'static ResourceDef {
        get_resource(ResourceKind::Gutters).unwrap()
    }

    fn filled_gutter() -> Draft {
        let mut draft = Draft::blank(ResourceKind::Gutters, gutter_def());
        draft.set("ward", "Kudan");
        draft.set("village", "Hunkuyi");
        draft.set("hamlet", "Tudun Wada");
        draft
    }

    #[test]
    fn test_blank_uses_defaults() {
        let draft = Draft::blank(ResourceKind::Gutters, gutter_def());
        assert_eq!(draft.get("status"), "Maintained");
        assert_eq!(draft.get("ward"), "");
        assert_eq!(draft.get("not-a-field"), "");
    }

    #[test]
    fn test_missing_required_fields_are_reported_per_field() {
        let mut draft = Draft::blank(ResourceKind::Gutters, gutter_def());
        let err = draft.validate(gutter_def()).unwrap_err();

        assert_eq!(err, CoreError::validation("ward", "Ward is required"));
        assert_eq!(draft.error("ward"), Some("Ward is required"));
        assert_eq!(draft.error("village"), Some("Village is required"));
        assert!(draft.error("status").is_none());
    }

    #[test]
    fn test_failed_validation_keeps_values() {
        let mut draft = filled_gutter();
        draft.set("dischargePoint", "maybe");
        assert!(draft.validate(gutter_def()).is_err());
        assert_eq!(draft.get("ward"), "Kudan");
        assert_eq!(draft.get("dischargePoint"), "maybe");
        assert!(draft.error("dischargePoint").unwrap().contains("yes, no"));
    }

    #[test]
    fn test_set_clears_field_error() {
        let mut draft = Draft::blank(ResourceKind::Gutters, gutter_def());
        let _ = draft.validate(gutter_def());
        draft.set("ward", "Kudan");
        assert!(draft.error("ward").is_none());
        assert!(draft.error("village").is_some());
    }

    #[test]
    fn test_valid_draft_builds_body() {
        let mut draft = filled_gutter();
        draft.set("geolocation", "7.61, 11.25");
        draft.set("capturedAt", "2024-11-02T10:30:00+01:00");

        let body = draft.validate(gutter_def()).unwrap();
        assert_eq!(body["ward"], "Kudan");
        assert_eq!(body["status"], "Maintained");
        assert_eq!(body["geolocation"]["type"], "Point");
        assert_eq!(body["geolocation"]["coordinates"], json!([7.61, 11.25]));
        assert_eq!(body["capturedAt"], "2024-11-02T09:30:00.000Z");
        assert!(body.get("picture").is_none());
        assert!(draft.errors().is_empty());
    }

    #[test]
    fn test_coordinates_out_of_range() {
        let mut draft = filled_gutter();
        draft.set("geolocation", "7.6, 95");
        let err = draft.validate(gutter_def()).unwrap_err();
        assert_eq!(
            err,
            CoreError::validation("geolocation", "Latitude must be between -90 and 90")
        );

        draft.set("geolocation", "7.6");
        assert!(draft.validate(gutter_def()).is_err());
        draft.set("geolocation", "a, b");
        assert!(draft.validate(gutter_def()).is_err());
    }

    #[test]
    fn test_cycle_choice_wraps() {
        let mut draft = filled_gutter();
        draft.cycle_choice(gutter_def(), "status", true);
        assert_eq!(draft.get("status"), "Unmaintained");
        draft.cycle_choice(gutter_def(), "status", true);
        draft.cycle_choice(gutter_def(), "status", true);
        assert_eq!(draft.get("status"), "Maintained");
        draft.cycle_choice(gutter_def(), "status", false);
        assert_eq!(draft.get("status"), "High Risk");
        // text fields are left alone
        draft.cycle_choice(gutter_def(), "ward", true);
        assert_eq!(draft.get("ward"), "Kudan");
    }

    #[test]
    fn test_from_record_round_trips_through_validate() {
        let record = Record::decode(
            ResourceKind::Gutters,
            json!({
                "_id": "g1",
                "ward": "Kudan",
                "village": "Hunkuyi",
                "hamlet": "Tudun Wada",
                "geolocation": {"type": "Point", "coordinates": [7.5, 11.0]},
                "condition": "Constructed with Block",
                "status": "High Risk",
                "dischargePoint": "no"
            }),
        )
        .unwrap();

        let mut draft = Draft::from_record(gutter_def(), &record);
        assert_eq!(draft.get("status"), "High Risk");
        assert_eq!(draft.get("geolocation"), "7.5, 11.0");
        assert_eq!(draft.get("createdBy"), "");

        let body = draft.validate(gutter_def()).unwrap();
        assert_eq!(body["dischargePoint"], "no");
        assert_eq!(body["geolocation"]["coordinates"], json!([7.5, 11.0]));
    }
}
