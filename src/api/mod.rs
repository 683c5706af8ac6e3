//! Purpose: Define the public Rust API boundary for taxon.
//! Exports: Core types and the list operation used by the CLI.
//! Role: Public, additive-only surface over the core modules.
//! Invariants: The CLI reaches core functionality only through this module.

mod list;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::filter::{FilterMap, build_filter_map, parse_filter_arg};
pub use crate::core::format::{OutputFormat, SUPPORTED_OUTPUT_FORMATS, parse_output_format};
pub use crate::core::formatter::{
    Capabilities, DEFAULT_FIELDS, DisplayConfig, RecordFormatter, default_fields,
};
pub use crate::core::record::{FieldValue, Record};
pub use crate::core::registry::{CORE_TAXONOMIES, TaxonomyRegistry};
pub use crate::core::source::RecordSource;
pub use list::{
    ApiResult, ListOptions, RegistryRef, list_taxonomies, list_taxonomies_to, open_registry,
    parse_fields,
};
