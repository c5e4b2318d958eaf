//! Resource Registry - Load resource definitions from JSON
//!
//! Columns, search fields, category filters, metric cards and form fields for
//! every resource kind are declared in embedded JSON files and loaded once.

use super::kind::ResourceKind;
use crate::core::aggregate::MetricSpec;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/common.json"),
    include_str!("../resources/sites.json"),
    include_str!("../resources/facilities.json"),
];

/// Color definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ColorDef {
    pub value: String,
    pub color: [u8; 3],
}

/// Column definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDef {
    pub header: String,
    pub json_path: String,
    pub width: u16,
    #[serde(default)]
    pub color_map: Option<String>,
}

/// How a form field is edited and validated
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldInput {
    Text,
    Choice { choices: Vec<String> },
    /// "lng, lat" or "lng, lat, alt", stored as a GeoJSON point
    Coordinates,
    /// RFC 3339 timestamp
    Timestamp,
}

/// Editable field of a create/edit form
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub key: String,
    pub label: String,
    pub input: FieldInput,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<String>,
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub display_name: String,
    /// Singular noun used in notifications ("Gutter created successfully")
    pub singular: String,
    /// API collection path, e.g. `/gutters`
    pub path: String,
    pub columns: Vec<ColumnDef>,
    /// Fields searched by the text filter
    pub search_fields: Vec<String>,
    /// Field used by the exact-match category filter
    #[serde(default)]
    pub category_field: Option<String>,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    pub fields: Vec<FieldDef>,
    /// Re-fetch a record from the API when it is viewed
    #[serde(default)]
    pub fetch_detail: bool,
}

impl ResourceDef {
    pub fn field_def(&self, key: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Allowed values of the category filter field, if it is a choice field
    pub fn category_choices(&self) -> &[String] {
        let Some(field) = self.category_field.as_deref() else {
            return &[];
        };
        match self.field_def(field).map(|f| &f.input) {
            Some(FieldInput::Choice { choices }) => choices,
            _ => &[],
        }
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub color_maps: HashMap<String, Vec<ColorDef>>,
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            color_maps: HashMap::new(),
            resources: HashMap::new(),
        };

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.color_maps.extend(partial.color_maps);
            final_config.resources.extend(partial.resources);
        }

        final_config
    })
}

/// Get a resource definition by kind
pub fn get_resource(kind: ResourceKind) -> Option<&'static ResourceDef> {
    get_registry().resources.get(kind.key())
}

/// Get a color map by name
pub fn get_color_map(name: &str) -> Option<&'static Vec<ColorDef>> {
    get_registry().color_maps.get(name)
}

/// Get color for a value based on color map name
pub fn get_color_for_value(color_map_name: &str, value: &str) -> Option<[u8; 3]> {
    get_color_map(color_map_name)?
        .iter()
        .find(|c| c.value == value)
        .map(|c| c.color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::record::Record;
    use serde_json::{json, Value};

    #[test]
    fn test_every_kind_is_registered() {
        for kind in ResourceKind::ALL {
            let def = get_resource(kind);
            assert!(def.is_some(), "{} should be registered", kind);
            let def = def.unwrap();
            assert!(!def.columns.is_empty());
            assert!(!def.search_fields.is_empty());
            assert!(def.path.starts_with('/'));
        }
    }

    #[test]
    fn test_dump_sites_definition() {
        let def = get_resource(ResourceKind::DumpSites).unwrap();
        assert_eq!(def.display_name, "Dump Sites");
        assert_eq!(def.path, "/dump-sites");
        assert_eq!(def.category_field.as_deref(), Some("safetyRisk"));
        assert_eq!(
            def.category_choices(),
            &["Maintained", "Unmaintained", "High Risk"]
        );
    }

    #[test]
    fn test_color_maps_referenced_by_columns_exist() {
        for kind in ResourceKind::ALL {
            let def = get_resource(kind).unwrap();
            for col in &def.columns {
                if let Some(map) = &col.color_map {
                    assert!(get_color_map(map).is_some(), "missing color map {}", map);
                }
            }
        }
    }

    #[test]
    fn test_category_field_is_a_form_field() {
        for kind in ResourceKind::ALL {
            let def = get_resource(kind).unwrap();
            if let Some(field) = &def.category_field {
                assert!(!def.category_choices().is_empty(), "{}: {}", kind, field);
            }
        }
    }

    /// Every choice offered by a form must decode into the typed schema.
    #[test]
    fn test_form_choices_match_record_schema() {
        for kind in ResourceKind::ALL {
            let def = get_resource(kind).unwrap();
            let mut base = serde_json::Map::new();
            base.insert("_id".to_string(), json!("probe"));
            for field in &def.fields {
                let value = match &field.input {
                    FieldInput::Choice { choices } => json!(choices[0]),
                    FieldInput::Coordinates => json!({"type": "Point", "coordinates": [0.0, 0.0]}),
                    FieldInput::Timestamp => json!("2024-01-01T00:00:00Z"),
                    FieldInput::Text => json!("x"),
                };
                base.insert(field.key.clone(), value);
            }

            for field in &def.fields {
                if let FieldInput::Choice { choices } = &field.input {
                    for choice in choices {
                        let mut probe = base.clone();
                        probe.insert(field.key.clone(), Value::String(choice.clone()));
                        let decoded = Record::decode(kind, Value::Object(probe));
                        assert!(
                            decoded.is_ok(),
                            "{}.{} = {:?} does not decode: {:?}",
                            kind,
                            field.key,
                            choice,
                            decoded.err()
                        );
                    }
                }
            }
        }
    }
}
