//! Resource abstraction layer
//!
//! Every resource kind shares one contract: a typed record schema decoded at
//! the transport boundary, plus presentation configuration (columns, search
//! fields, metric cards, form fields) loaded from embedded JSON.
//!
//! # Architecture
//!
//! - [`kind`] - The closed set of resource kinds
//! - [`record`] - Typed schemas and decode-or-fail helpers
//! - [`registry`] - Loads and caches resource definitions from embedded JSON
//! - [`draft`] - Editable form copies and local validation
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`:
//! - `common.json` - Shared color maps
//! - `sites.json` - Dump sites, gutters, soak-aways
//! - `facilities.json` - Toilet facilities, open-defecation observations

pub mod draft;
pub mod kind;
pub mod record;
pub mod registry;

pub use draft::Draft;
pub use kind::ResourceKind;
pub use record::{
    decode_collection, decode_single, extract_json_value, split_envelope, Record, RecordData,
    RecordId,
};
pub use registry::*;
