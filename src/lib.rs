//! washpro
//!
//! Resource list and mutation coordinator for the WASH field-monitoring API:
//! typed resource records, page and metric derivations, and the modal
//! create/update/delete flow, behind an injectable transport.

pub mod api;
pub mod core;
pub mod error;
pub mod resource;

/// Version reported in the user agent and the header bar
pub const VERSION: &str = match option_env!("WASHPRO_VERSION") {
    Some(v) => v,
    None => "dev",
};
