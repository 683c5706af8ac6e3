//! Purpose: Render record sequences as table, csv, json, or a count.
//! Exports: `RecordFormatter`, `DisplayConfig`, `Capabilities`, `DEFAULT_FIELDS`, `default_fields`.
//! Role: Reusable output layer behind `taxonomy list`; knows nothing about where records come from.
//! Invariants: Field resolution order is single field, then requested fields, then defaults.
//! Invariants: Every resolved field is checked on every record before any byte is written.
//! Invariants: Output is deterministic for a fixed record sequence and config.
use std::io::{self, Write};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::core::error::{Error, ErrorKind};
use crate::core::format::OutputFormat;
use crate::core::record::Record;

/// Fields shown when the caller requests none.
pub const DEFAULT_FIELDS: &[&str] = &[
    "name",
    "label",
    "description",
    "object_type",
    "show_tagcloud",
    "hierarchical",
    "public",
];

/// Host capabilities that shape the default field list.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Capabilities {
    pub supports_description: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            supports_description: true,
        }
    }
}

pub fn default_fields(capabilities: Capabilities) -> Vec<String> {
    DEFAULT_FIELDS
        .iter()
        .filter(|field| capabilities.supports_description || **field != "description")
        .map(|field| field.to_string())
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayConfig {
    pub fields: Option<Vec<String>>,
    pub single_field: Option<String>,
    pub format: OutputFormat,
}

#[derive(Clone, Debug)]
pub struct RecordFormatter {
    config: DisplayConfig,
    default_fields: Vec<String>,
}

impl RecordFormatter {
    pub fn new(config: DisplayConfig, capabilities: Capabilities) -> Self {
        Self {
            config,
            default_fields: default_fields(capabilities),
        }
    }

    /// Active columns, in output order, with duplicates dropped.
    pub fn resolved_fields(&self) -> Vec<&str> {
        if let Some(single) = &self.config.single_field {
            return vec![single.as_str()];
        }
        let source = match &self.config.fields {
            Some(fields) if !fields.is_empty() => fields,
            _ => &self.default_fields,
        };
        let mut resolved: Vec<&str> = Vec::with_capacity(source.len());
        for field in source {
            if !resolved.contains(&field.as_str()) {
                resolved.push(field.as_str());
            }
        }
        resolved
    }

    pub fn render(&self, records: &[Record]) -> Result<String, Error> {
        let fields = self.resolved_fields();
        if self.config.format != OutputFormat::Count {
            check_fields(&fields, records)?;
        }

        let single = self.config.single_field.is_some();
        let output = match (self.config.format, single) {
            (OutputFormat::Count, _) => format!("{}\n", records.len()),
            (OutputFormat::Table, true) => render_lines(records, fields[0], sanitize_table_cell),
            (OutputFormat::Csv, true) => render_lines(records, fields[0], escape_csv_cell),
            (OutputFormat::Table, false) => render_table(&fields, &cell_matrix(&fields, records)),
            (OutputFormat::Csv, false) => render_csv(&fields, &cell_matrix(&fields, records)),
            (OutputFormat::Json, _) => render_json(&fields, records, single)?,
        };
        Ok(output)
    }

    pub fn write_to<W: Write>(&self, out: &mut W, records: &[Record]) -> Result<(), Error> {
        let rendered = self.render(records)?;
        out.write_all(rendered.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write output")
                    .with_source(err)
            })
    }

    /// Render to the process's standard output.
    pub fn display(&self, records: &[Record]) -> Result<(), Error> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.write_to(&mut lock, records)
    }
}

fn check_fields(fields: &[&str], records: &[Record]) -> Result<(), Error> {
    for record in records {
        if let Some(missing) = fields.iter().find(|field| !record.contains(field)) {
            let available = record.field_names().collect::<Vec<_>>().join(", ");
            return Err(Error::new(ErrorKind::UnknownField)
                .with_message(format!("invalid field: {missing}"))
                .with_field(*missing)
                .with_hint(format!("Available fields: {available}.")));
        }
    }
    Ok(())
}

// Callers run `check_fields` first, so lookups here always hit.
fn cell(record: &Record, field: &str) -> String {
    record
        .get(field)
        .map(|value| value.display_string())
        .unwrap_or_default()
}

fn cell_matrix(fields: &[&str], records: &[Record]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|record| fields.iter().map(|field| cell(record, field)).collect())
        .collect()
}

fn render_lines(records: &[Record], field: &str, encode: impl Fn(&str) -> String) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&encode(&cell(record, field)));
        out.push('\n');
    }
    out
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let column_count = headers.len();
    let mut sanitized_rows = Vec::with_capacity(rows.len());
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        let mut sanitized = Vec::with_capacity(column_count);
        for (idx, width) in widths.iter_mut().enumerate() {
            let value = row.get(idx).map(String::as_str).unwrap_or("");
            let cleaned = sanitize_table_cell(value);
            *width = (*width).max(cleaned.chars().count());
            sanitized.push(cleaned);
        }
        sanitized_rows.push(sanitized);
    }

    let mut out = String::new();
    let header_cells = headers
        .iter()
        .map(|header| header.to_string())
        .collect::<Vec<_>>();
    out.push_str(&format_table_line(&header_cells, &widths));
    out.push('\n');
    for row in sanitized_rows {
        out.push_str(&format_table_line(&row, &widths));
        out.push('\n');
    }
    out
}

fn sanitize_table_cell(value: &str) -> String {
    value.replace('\n', "\\n").replace('\r', "\\r")
}

fn format_table_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        line.push_str(cell);
        let cell_len = cell.chars().count();
        if *width > cell_len {
            line.push_str(&" ".repeat(*width - cell_len));
        }
    }
    line.truncate(line.trim_end().len());
    line
}

fn render_csv(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    push_csv_line(headers.iter().copied(), &mut out);
    for row in rows {
        push_csv_line(row.iter().map(String::as_str), &mut out);
    }
    out
}

fn push_csv_line<'a>(cells: impl Iterator<Item = &'a str>, out: &mut String) {
    for (idx, value) in cells.enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&escape_csv_cell(value));
    }
    out.push('\n');
}

fn escape_csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// A record restricted to the resolved fields, serialized in field order.
struct RecordView<'a> {
    record: &'a Record,
    fields: &'a [&'a str],
}

impl Serialize for RecordView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in self.fields {
            map.serialize_entry(field, &self.record.get(field))?;
        }
        map.end()
    }
}

fn render_json(fields: &[&str], records: &[Record], single: bool) -> Result<String, Error> {
    let encoded = if single {
        let values = records
            .iter()
            .map(|record| record.get(fields[0]))
            .collect::<Vec<_>>();
        serde_json::to_string(&values)
    } else {
        let views = records
            .iter()
            .map(|record| RecordView { record, fields })
            .collect::<Vec<_>>();
        serde_json::to_string(&views)
    };
    let encoded = encoded.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("json encode failed")
            .with_source(err)
    })?;
    Ok(format!("{encoded}\n"))
}

#[cfg(test)]
mod tests {
    use super::{
        Capabilities, DisplayConfig, RecordFormatter, default_fields, escape_csv_cell,
        render_table,
    };
    use crate::core::error::ErrorKind;
    use crate::core::format::OutputFormat;
    use crate::core::record::Record;

    fn category() -> Record {
        Record::new()
            .with("name", "category")
            .with("label", "Categories")
            .with("object_type", vec!["post".to_string()])
            .with("hierarchical", true)
            .with("public", true)
    }

    fn formatter(fields: &[&str], single: Option<&str>, format: OutputFormat) -> RecordFormatter {
        let fields = if fields.is_empty() {
            None
        } else {
            Some(fields.iter().map(|field| field.to_string()).collect())
        };
        RecordFormatter::new(
            DisplayConfig {
                fields,
                single_field: single.map(str::to_string),
                format,
            },
            Capabilities::default(),
        )
    }

    #[test]
    fn default_fields_drop_description_without_support() {
        let with = default_fields(Capabilities::default());
        assert!(with.iter().any(|field| field == "description"));
        let without = default_fields(Capabilities {
            supports_description: false,
        });
        assert_eq!(without.len(), with.len() - 1);
        assert!(!without.iter().any(|field| field == "description"));
    }

    #[test]
    fn single_field_overrides_fields() {
        let formatter = formatter(&["name", "public"], Some("label"), OutputFormat::Table);
        assert_eq!(formatter.resolved_fields(), vec!["label"]);
    }

    #[test]
    fn duplicate_fields_are_dropped() {
        let formatter = formatter(&["name", "public", "name"], None, OutputFormat::Csv);
        assert_eq!(formatter.resolved_fields(), vec!["name", "public"]);
    }

    #[test]
    fn table_renders_booleans_as_one() {
        let output = formatter(&["name", "public"], None, OutputFormat::Table)
            .render(&[category()])
            .expect("render");
        assert_eq!(output, "name      public\ncategory  1\n");
    }

    #[test]
    fn count_ignores_unknown_fields() {
        let output = formatter(&["missing"], Some("also_missing"), OutputFormat::Count)
            .render(&[category(), category()])
            .expect("render");
        assert_eq!(output, "2\n");
    }

    #[test]
    fn json_keeps_lists_native() {
        let output = formatter(&["name", "object_type"], None, OutputFormat::Json)
            .render(&[category()])
            .expect("render");
        assert_eq!(output, "[{\"name\":\"category\",\"object_type\":[\"post\"]}]\n");
    }

    #[test]
    fn single_field_csv_has_no_header() {
        let output = formatter(&[], Some("name"), OutputFormat::Csv)
            .render(&[category()])
            .expect("render");
        assert_eq!(output, "category\n");
    }

    #[test]
    fn single_field_json_is_flat() {
        let output = formatter(&[], Some("object_type"), OutputFormat::Json)
            .render(&[category()])
            .expect("render");
        assert_eq!(output, "[[\"post\"]]\n");
    }

    #[test]
    fn unknown_field_fails_before_output() {
        let mut sink = Vec::new();
        let err = formatter(&["name", "labels"], None, OutputFormat::Table)
            .write_to(&mut sink, &[category()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownField);
        assert_eq!(err.field(), Some("labels"));
        assert!(sink.is_empty());
    }

    #[test]
    fn empty_input_prints_header_or_empty_array() {
        let table = formatter(&["name"], None, OutputFormat::Table)
            .render(&[])
            .expect("render");
        assert_eq!(table, "name\n");
        let json = formatter(&["name"], None, OutputFormat::Json)
            .render(&[])
            .expect("render");
        assert_eq!(json, "[]\n");
        let single = formatter(&[], Some("name"), OutputFormat::Table)
            .render(&[])
            .expect("render");
        assert_eq!(single, "");
    }

    #[test]
    fn render_table_aligns_and_sanitizes_cells() {
        let output = render_table(
            &["NAME", "DETAIL"],
            &[
                vec!["a".to_string(), "line1\nline2".to_string()],
                vec!["long-name".to_string(), "ok".to_string()],
            ],
        );
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[0].contains("  DETAIL"));
        assert!(lines[1].contains("line1\\nline2"));
        assert!(lines[2].contains("long-name"));
        assert!(!lines[2].ends_with(' '));
    }

    #[test]
    fn csv_cells_are_quoted_when_needed() {
        assert_eq!(escape_csv_cell("post, page"), "\"post, page\"");
        assert_eq!(escape_csv_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv_cell("plain"), "plain");
    }
}
