// Core modules: records, filtering, sources, formatting, and error modeling.
pub mod error;
pub mod filter;
pub mod format;
pub mod formatter;
pub mod record;
pub mod registry;
pub mod source;
