//! Purpose: The `taxonomy list` operation as a library call.
//! Exports: `ListOptions`, `RegistryRef`, `open_registry`, `list_taxonomies`, `list_taxonomies_to`, `parse_fields`.
//! Role: Turns raw flag values into filters plus display config, fetches, and renders.
//! Invariants: `--format` is validated before the source is touched or any output is written.
//! Invariants: Exactly one fetch and one render per call; no state survives the call.
//! Invariants: List-valued fields reach the formatter unflattened.
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::filter::{FilterMap, build_filter_map};
use crate::core::format::parse_output_format;
use crate::core::formatter::{DisplayConfig, RecordFormatter};
use crate::core::record::Record;
use crate::core::registry::TaxonomyRegistry;
use crate::core::source::RecordSource;

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegistryRef {
    /// Taxonomies every host registers at startup.
    Core,
    File(PathBuf),
}

impl RegistryRef {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn from_option(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::file(path),
            None => Self::Core,
        }
    }
}

pub fn open_registry(registry: &RegistryRef) -> ApiResult<TaxonomyRegistry> {
    match registry {
        RegistryRef::Core => Ok(TaxonomyRegistry::with_core_taxonomies()),
        RegistryRef::File(path) => TaxonomyRegistry::load(path),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub filters: FilterMap,
    pub display: DisplayConfig,
}

impl ListOptions {
    /// Build options from raw flag values.
    ///
    /// `format` is parsed first so an unknown encoding fails before anything
    /// else is validated.
    pub fn from_flags<I>(
        filters: I,
        field: Option<String>,
        fields: Option<&str>,
        format: &str,
    ) -> ApiResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let format = parse_output_format(format)?;
        let fields = fields.map(parse_fields).transpose()?;
        let single_field = match field {
            Some(name) if name.trim().is_empty() => {
                return Err(Error::new(ErrorKind::Usage).with_message("--field requires a name"));
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };
        let filters = build_filter_map(filters)?;
        Ok(Self {
            filters,
            display: DisplayConfig {
                fields,
                single_field,
                format,
            },
        })
    }
}

pub fn parse_fields(input: &str) -> ApiResult<Vec<String>> {
    let fields = input
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if fields.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--fields requires at least one field name")
            .with_hint("Pass a comma-separated list, e.g. --fields=name,public."));
    }
    Ok(fields)
}

/// Fetch matching taxonomies and render them to stdout.
pub fn list_taxonomies(source: &dyn RecordSource, options: &ListOptions) -> ApiResult<usize> {
    let (formatter, records) = prepare(source, options)?;
    formatter.display(&records)?;
    Ok(records.len())
}

/// Same as [`list_taxonomies`], writing to `out` instead of stdout.
pub fn list_taxonomies_to<W: Write>(
    source: &dyn RecordSource,
    options: &ListOptions,
    out: &mut W,
) -> ApiResult<usize> {
    let (formatter, records) = prepare(source, options)?;
    formatter.write_to(out, &records)?;
    Ok(records.len())
}

fn prepare(
    source: &dyn RecordSource,
    options: &ListOptions,
) -> ApiResult<(RecordFormatter, Vec<Record>)> {
    let formatter = RecordFormatter::new(options.display.clone(), source.capabilities());
    let records = source.fetch(&options.filters)?;
    debug!(
        records = records.len(),
        format = %options.display.format,
        "listing taxonomies"
    );
    Ok((formatter, records))
}

#[cfg(test)]
mod tests {
    use super::{ListOptions, RegistryRef, list_taxonomies_to, open_registry, parse_fields};
    use crate::core::error::{Error, ErrorKind};
    use crate::core::filter::FilterMap;
    use crate::core::format::OutputFormat;
    use crate::core::formatter::Capabilities;
    use crate::core::record::{FieldValue, Record};
    use crate::core::source::RecordSource;
    use std::cell::RefCell;

    struct FakeSource {
        records: Vec<Record>,
        capabilities: Capabilities,
        seen: RefCell<Vec<FilterMap>>,
    }

    impl FakeSource {
        fn new(records: Vec<Record>) -> Self {
            Self {
                records,
                capabilities: Capabilities::default(),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl RecordSource for FakeSource {
        fn fetch(&self, filters: &FilterMap) -> Result<Vec<Record>, Error> {
            self.seen.borrow_mut().push(filters.clone());
            Ok(self
                .records
                .iter()
                .filter(|record| filters.matches(record))
                .cloned()
                .collect())
        }

        fn capabilities(&self) -> Capabilities {
            self.capabilities
        }
    }

    struct DownSource;

    impl RecordSource for DownSource {
        fn fetch(&self, _filters: &FilterMap) -> Result<Vec<Record>, Error> {
            Err(Error::new(ErrorKind::SourceUnavailable).with_message("registry not initialized"))
        }
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn genre() -> Record {
        Record::new()
            .with("name", "genre")
            .with("label", "Genres")
            .with("description", "Book genres")
            .with("object_type", vec!["book".to_string(), "film".to_string()])
            .with("show_tagcloud", false)
            .with("hierarchical", true)
            .with("public", true)
    }

    fn run(source: &dyn RecordSource, options: &ListOptions) -> Result<String, Error> {
        let mut out = Vec::new();
        list_taxonomies_to(source, options, &mut out)?;
        Ok(String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn object_type_flag_reaches_source_as_list() {
        let source = FakeSource::new(vec![genre()]);
        let options =
            ListOptions::from_flags(pairs(&[("object_type", "book")]), None, None, "count")
                .expect("options");
        assert_eq!(run(&source, &options).expect("run"), "0\n");
        let seen = source.seen.borrow();
        assert_eq!(
            seen[0].get("object_type"),
            Some(&FieldValue::List(vec!["book".to_string()]))
        );
    }

    #[test]
    fn default_table_lists_default_columns_with_joined_lists() {
        let source = FakeSource::new(vec![genre()]);
        let options = ListOptions::from_flags(Vec::new(), None, None, "table").expect("options");
        let output = run(&source, &options).expect("run");
        let lines = output.lines().collect::<Vec<_>>();
        assert!(lines[0].starts_with("name   label   description  object_type"));
        assert!(lines[1].contains("book, film"));
        assert!(lines[1].ends_with("1"));
    }

    #[test]
    fn missing_description_capability_drops_the_column() {
        let mut source = FakeSource::new(vec![genre()]);
        source.capabilities = Capabilities {
            supports_description: false,
        };
        let options = ListOptions::from_flags(Vec::new(), None, None, "csv").expect("options");
        let output = run(&source, &options).expect("run");
        assert_eq!(
            output.lines().next(),
            Some("name,label,object_type,show_tagcloud,hierarchical,public")
        );
    }

    #[test]
    fn invalid_format_wins_over_other_flag_errors() {
        let err = ListOptions::from_flags(pairs(&[("format", "csv")]), None, Some(""), "xml")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn unavailable_source_is_surfaced() {
        let options = ListOptions::from_flags(Vec::new(), None, None, "json").expect("options");
        let err = run(&DownSource, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    #[test]
    fn field_flags_populate_display_config() {
        let options = ListOptions::from_flags(
            Vec::new(),
            Some(" name ".to_string()),
            Some("name, public,"),
            "JSON",
        )
        .expect("options");
        assert_eq!(options.display.single_field.as_deref(), Some("name"));
        assert_eq!(
            options.display.fields,
            Some(vec!["name".to_string(), "public".to_string()])
        );
        assert_eq!(options.display.format, OutputFormat::Json);
    }

    #[test]
    fn parse_fields_rejects_empty_lists() {
        assert_eq!(parse_fields(" , ").unwrap_err().kind(), ErrorKind::Usage);
    }

    #[test]
    fn core_registry_ref_opens_builtins() {
        let registry = open_registry(&RegistryRef::from_option(None)).expect("registry");
        assert!(!registry.is_empty());
    }
}
