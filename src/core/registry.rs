//! Purpose: In-process taxonomy registry used as the default record source.
//! Exports: `TaxonomyRegistry`, `CORE_TAXONOMIES`.
//! Role: Models the host's taxonomy registry: registration, defaults, and filtered lookup.
//! Invariants: A registry that never had anything registered is uninitialized and refuses lookups.
//! Invariants: Registration order is listing order; re-registering a name replaces in place.
//! Invariants: Registry files never partially load; any malformed entry rejects the whole file.
use std::io;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::filter::FilterMap;
use crate::core::formatter::Capabilities;
use crate::core::record::{FieldValue, Record};
use crate::core::source::RecordSource;

/// Host versions below this lack taxonomy descriptions.
const DESCRIPTION_MIN_VERSION: &[u64] = &[3, 7];

/// Names of the taxonomies every host registers at startup.
pub const CORE_TAXONOMIES: &[&str] = &[
    "category",
    "post_tag",
    "nav_menu",
    "link_category",
    "post_format",
];

#[derive(Clone, Debug, Default)]
pub struct TaxonomyRegistry {
    taxonomies: Option<Vec<Record>>,
    capabilities: Capabilities,
}

impl TaxonomyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_core_taxonomies() -> Self {
        let taxonomies = core_taxonomy_records()
            .into_iter()
            .zip(CORE_TAXONOMIES)
            .map(|(record, name)| apply_registration_defaults(record, name))
            .collect();
        Self {
            taxonomies: Some(taxonomies),
            capabilities: Capabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.taxonomies.is_some()
    }

    pub fn len(&self) -> usize {
        self.taxonomies.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn register(&mut self, record: Record) -> Result<(), Error> {
        let name = match record.get("name").and_then(FieldValue::as_str) {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("taxonomy registration requires a non-empty string `name`"));
            }
        };
        let record = apply_registration_defaults(record, &name);
        let taxonomies = self.taxonomies.get_or_insert_with(Vec::new);
        let slot = taxonomies.iter_mut().find(|existing| {
            existing.get("name").and_then(FieldValue::as_str) == Some(name.as_str())
        });
        match slot {
            Some(slot) => *slot = record,
            None => taxonomies.push(record),
        }
        Ok(())
    }

    /// Load a registry snapshot from a JSON file.
    ///
    /// The file is either an array of taxonomy objects or an object with a
    /// `taxonomies` array and an optional `host_version`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            let hint = if err.kind() == io::ErrorKind::NotFound {
                "Check the --registry path (or TAXON_REGISTRY), or omit it to list the built-in taxonomies."
            } else {
                "Check that the registry file is readable."
            };
            Error::new(ErrorKind::SourceUnavailable)
                .with_message("taxonomy registry is not available")
                .with_path(path)
                .with_hint(hint)
                .with_source(err)
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("registry file is not valid JSON")
                .with_path(path)
                .with_source(err)
        })?;
        let registry = Self::from_json(&value).map_err(|err| err.with_path(path))?;
        debug!(
            path = %path.display(),
            taxonomies = registry.len(),
            supports_description = registry.capabilities.supports_description,
            "loaded taxonomy registry"
        );
        Ok(registry)
    }

    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let (entries, host_version) = match value {
            Value::Array(entries) => (entries, None),
            Value::Object(map) => {
                let entries = map
                    .get("taxonomies")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        Error::new(ErrorKind::Corrupt)
                            .with_message("registry object must contain a `taxonomies` array")
                    })?;
                let host_version = match map.get("host_version") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(text)) => Some(text.clone()),
                    Some(Value::Number(num)) => Some(num.to_string()),
                    Some(_) => {
                        return Err(Error::new(ErrorKind::Corrupt)
                            .with_message("`host_version` must be a string"));
                    }
                };
                (entries, host_version)
            }
            _ => {
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message("registry must be a JSON array or object"));
            }
        };

        let capabilities = Capabilities {
            supports_description: host_version
                .as_deref()
                .is_none_or(supports_description),
        };
        let mut registry = Self::new().with_capabilities(capabilities);
        registry.taxonomies = Some(Vec::new());
        for (idx, entry) in entries.iter().enumerate() {
            let Value::Object(map) = entry else {
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message(format!("taxonomy entry {idx} is not an object")));
            };
            registry.register(record_from_object(map)).map_err(|_| {
                Error::new(ErrorKind::Corrupt)
                    .with_message(format!("taxonomy entry {idx} has no name"))
            })?;
        }
        Ok(registry)
    }
}

impl RecordSource for TaxonomyRegistry {
    fn fetch(&self, filters: &FilterMap) -> Result<Vec<Record>, Error> {
        let taxonomies = self.taxonomies.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::SourceUnavailable)
                .with_message("taxonomy registry is not initialized")
        })?;
        let matched = taxonomies
            .iter()
            .filter(|record| filters.matches(record))
            .cloned()
            .collect::<Vec<_>>();
        debug!(
            filters = filters.len(),
            matched = matched.len(),
            total = taxonomies.len(),
            "fetched taxonomies"
        );
        Ok(matched)
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

fn record_from_object(map: &Map<String, Value>) -> Record {
    let mut record = Record::new();
    for (key, value) in map {
        match FieldValue::from_json(value) {
            Some(field) => record.insert(key.clone(), field),
            None if value.is_null() => {}
            None => warn!(field = %key, "skipping registry attribute with no scalar value"),
        }
    }
    record
}

fn apply_registration_defaults(mut record: Record, name: &str) -> Record {
    if !record.contains("label") {
        record.insert("label", name);
    }
    if !record.contains("description") {
        record.insert("description", "");
    }
    if !record.contains("object_type") {
        record.insert("object_type", Vec::<String>::new());
    }
    if !record.contains("public") {
        record.insert("public", true);
    }
    if !record.contains("hierarchical") {
        record.insert("hierarchical", false);
    }
    if !record.contains("show_ui") {
        let public = record
            .get("public")
            .and_then(FieldValue::as_bool)
            .unwrap_or(true);
        record.insert("show_ui", public);
    }
    if !record.contains("show_tagcloud") {
        let show_ui = record
            .get("show_ui")
            .and_then(FieldValue::as_bool)
            .unwrap_or(true);
        record.insert("show_tagcloud", show_ui);
    }
    if !record.contains("_builtin") {
        record.insert("_builtin", false);
    }
    record
}

fn supports_description(version: &str) -> bool {
    match parse_version(version) {
        Some(parts) => !version_lt(&parts, DESCRIPTION_MIN_VERSION),
        None => {
            warn!(host_version = %version, "unrecognized host version; assuming current host");
            true
        }
    }
}

fn parse_version(version: &str) -> Option<Vec<u64>> {
    let mut parts = Vec::new();
    for segment in version.trim().split('.') {
        let digits = segment
            .chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>();
        if digits.is_empty() {
            break;
        }
        parts.push(digits.parse().ok()?);
        if digits.len() != segment.len() {
            break;
        }
    }
    if parts.is_empty() { None } else { Some(parts) }
}

// Missing trailing components count as zero, so 3.7 == 3.7.0.
fn version_lt(left: &[u64], right: &[u64]) -> bool {
    let len = left.len().max(right.len());
    for idx in 0..len {
        let lhs = left.get(idx).copied().unwrap_or(0);
        let rhs = right.get(idx).copied().unwrap_or(0);
        if lhs != rhs {
            return lhs < rhs;
        }
    }
    false
}

fn core_taxonomy_records() -> Vec<Record> {
    let post = || vec!["post".to_string()];
    vec![
        Record::new()
            .with("name", "category")
            .with("label", "Categories")
            .with("description", "")
            .with("object_type", post())
            .with("public", true)
            .with("hierarchical", true)
            .with("show_ui", true)
            .with("show_tagcloud", true)
            .with("show_in_nav_menus", true)
            .with("query_var", "category_name")
            .with("_builtin", true),
        Record::new()
            .with("name", "post_tag")
            .with("label", "Tags")
            .with("description", "")
            .with("object_type", post())
            .with("public", true)
            .with("hierarchical", false)
            .with("show_ui", true)
            .with("show_tagcloud", true)
            .with("show_in_nav_menus", true)
            .with("query_var", "tag")
            .with("_builtin", true),
        Record::new()
            .with("name", "nav_menu")
            .with("label", "Navigation Menus")
            .with("description", "")
            .with("object_type", vec!["nav_menu_item".to_string()])
            .with("public", false)
            .with("hierarchical", false)
            .with("show_ui", false)
            .with("show_tagcloud", false)
            .with("show_in_nav_menus", false)
            .with("query_var", false)
            .with("_builtin", true),
        Record::new()
            .with("name", "link_category")
            .with("label", "Link Categories")
            .with("description", "")
            .with("object_type", vec!["link".to_string()])
            .with("public", false)
            .with("hierarchical", false)
            .with("show_ui", true)
            .with("show_tagcloud", false)
            .with("show_in_nav_menus", false)
            .with("query_var", false)
            .with("_builtin", true),
        Record::new()
            .with("name", "post_format")
            .with("label", "Formats")
            .with("description", "")
            .with("object_type", post())
            .with("public", true)
            .with("hierarchical", false)
            .with("show_ui", false)
            .with("show_tagcloud", false)
            .with("show_in_nav_menus", false)
            .with("query_var", "post_format")
            .with("_builtin", true),
    ]
}
