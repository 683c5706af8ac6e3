//! Purpose: Loosely-shaped output records with explicitly tagged field values.
//! Exports: `Record`, `FieldValue`.
//! Role: Common currency between record sources, filters, and the formatter.
//! Invariants: Field order is insertion order; inserting an existing name replaces in place.
//! Invariants: Values are only strings, booleans, or lists of strings.
use serde::Serialize;
use serde_json::Value;

/// Serializes natively: a JSON string, boolean, or array of strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Bool(bool),
    List(Vec<String>),
}

impl FieldValue {
    /// Display string used by the table and csv encodings.
    ///
    /// Lists are joined with `", "`; `true` renders as `1` and `false` as an
    /// empty cell.
    pub fn display_string(&self) -> String {
        match self {
            FieldValue::Str(text) => text.clone(),
            FieldValue::Bool(true) => "1".to_string(),
            FieldValue::Bool(false) => String::new(),
            FieldValue::List(items) => items.join(", "),
        }
    }

    /// Map a JSON value onto a field value.
    ///
    /// Numbers are stringified; arrays must hold only scalars. `null` and
    /// objects have no field representation and yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(FieldValue::Str(text.clone())),
            Value::Bool(flag) => Some(FieldValue::Bool(*flag)),
            Value::Number(num) => Some(FieldValue::Str(num.to_string())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => Some(text.clone()),
                    Value::Number(num) => Some(num.to_string()),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(FieldValue::List),
            Value::Null | Value::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

}

#[cfg(test)]
mod tests {
    use super::{FieldValue, Record};
    use serde_json::json;

    #[test]
    fn insert_replaces_in_place_and_keeps_order() {
        let mut record = Record::new().with("name", "category").with("public", true);
        record.insert("name", "post_tag");
        record.insert("label", "Tags");

        let names = record.field_names().collect::<Vec<_>>();
        assert_eq!(names, vec!["name", "public", "label"]);
        assert_eq!(record.get("name"), Some(&FieldValue::from("post_tag")));
    }

    #[test]
    fn display_string_follows_host_conventions() {
        assert_eq!(FieldValue::Bool(true).display_string(), "1");
        assert_eq!(FieldValue::Bool(false).display_string(), "");
        assert_eq!(
            FieldValue::List(vec!["post".to_string(), "page".to_string()]).display_string(),
            "post, page"
        );
        assert_eq!(FieldValue::List(Vec::new()).display_string(), "");
    }

    #[test]
    fn from_json_maps_scalars_and_rejects_objects() {
        assert_eq!(
            FieldValue::from_json(&json!(12)),
            Some(FieldValue::Str("12".to_string()))
        );
        assert_eq!(
            FieldValue::from_json(&json!(["post", 3])),
            Some(FieldValue::List(vec!["post".to_string(), "3".to_string()]))
        );
        assert_eq!(FieldValue::from_json(&json!([true])), None);
        assert_eq!(FieldValue::from_json(&json!({"singular": "Tag"})), None);
        assert_eq!(FieldValue::from_json(&json!(null)), None);
    }

    #[test]
    fn serializes_natively() {
        let value = serde_json::to_value(FieldValue::List(vec!["post".to_string()]))
            .expect("serialize");
        assert_eq!(value, json!(["post"]));
        let value = serde_json::to_value(FieldValue::Bool(false)).expect("serialize");
        assert_eq!(value, json!(false));
        let value = serde_json::to_value(FieldValue::from("Tags")).expect("serialize");
        assert_eq!(value, json!("Tags"));
    }
}
