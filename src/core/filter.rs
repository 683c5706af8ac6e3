//! Purpose: Build and evaluate key/value filter constraints for record sources.
//! Exports: `FilterMap`, `build_filter_map`, `parse_filter_arg`, `normalize_filter_key`, `RESERVED_FILTER_KEYS`, `LIST_FILTER_KEYS`.
//! Role: Glue between free-form `--<field>=<value>` flags and `RecordSource::fetch`.
//! Invariants: Reserved display flags never become filters.
//! Invariants: Keys unknown to every record pass through verbatim; they simply match nothing.
//! Invariants: A record matches only when every constraint holds (AND semantics).
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{FieldValue, Record};

/// Flag names that steer display and are never folded into filters.
pub const RESERVED_FILTER_KEYS: &[&str] = &["field", "fields", "format"];

/// Filter keys whose values the source stores as lists.
pub const LIST_FILTER_KEYS: &[&str] = &["object_type"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterMap {
    entries: Vec<(String, FieldValue)>,
}

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Later constraints on the same key replace earlier ones.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.entries.iter().all(|(key, required)| {
            record
                .get(key)
                .is_some_and(|actual| value_matches(actual, required))
        })
    }
}

fn value_matches(actual: &FieldValue, required: &FieldValue) -> bool {
    match (actual, required) {
        (FieldValue::Str(left), FieldValue::Str(right)) => left == right,
        (FieldValue::List(left), FieldValue::List(right)) => left == right,
        (FieldValue::Bool(left), FieldValue::Bool(right)) => left == right,
        (FieldValue::Bool(flag), FieldValue::Str(text))
        | (FieldValue::Str(text), FieldValue::Bool(flag)) => loose_bool(text) == Some(*flag),
        _ => false,
    }
}

fn loose_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "" | "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// `--object-type` and `--object_type` name the same attribute.
pub fn normalize_filter_key(key: &str) -> String {
    key.trim().trim_start_matches('-').replace('-', "_")
}

/// Parse a `FIELD=VALUE` pair; a bare `FIELD` means `FIELD=1`.
pub fn parse_filter_arg(input: &str) -> Result<(String, String), String> {
    let (key, value) = match input.split_once('=') {
        Some((key, value)) => (key, value),
        None => (input, "1"),
    };
    let key = normalize_filter_key(key);
    if key.is_empty() {
        return Err(format!("filter `{input}` is missing a field name"));
    }
    Ok((key, value.to_string()))
}

pub fn build_filter_map<I>(pairs: I) -> Result<FilterMap, Error>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut filters = FilterMap::new();
    for (key, value) in pairs {
        let key = normalize_filter_key(&key);
        if key.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("filter is missing a field name"));
        }
        if RESERVED_FILTER_KEYS.contains(&key.as_str()) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("`{key}` is a display option, not a filter"))
                .with_hint(format!("Use --{key}=<value> directly.")));
        }
        if LIST_FILTER_KEYS.contains(&key.as_str()) {
            filters.insert(key, FieldValue::List(vec![value]));
        } else {
            filters.insert(key, FieldValue::Str(value));
        }
    }
    Ok(filters)
}
