//! Purpose: Name the supported output encodings and parse them from flag values.
//! Exports: `OutputFormat`, `SUPPORTED_OUTPUT_FORMATS`, `parse_output_format`.
//! Role: Shared policy for `--format` validation across CLI and library callers.
//! Invariants: Unknown values fail with `InvalidFormat` before any output is produced.
//! Invariants: `table` is the default encoding.

use std::fmt;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
    Count,
}

pub const SUPPORTED_OUTPUT_FORMATS: &[&str] = &["table", "csv", "json", "count"];

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Count => "count",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn parse_output_format(input: &str) -> Result<OutputFormat, Error> {
    match input.trim().to_ascii_lowercase().as_str() {
        "table" => Ok(OutputFormat::Table),
        "csv" => Ok(OutputFormat::Csv),
        "json" => Ok(OutputFormat::Json),
        "count" => Ok(OutputFormat::Count),
        _ => Err(Error::new(ErrorKind::InvalidFormat)
            .with_message(format!("unsupported output format `{input}`"))
            .with_hint(format!(
                "Accepted values: {}.",
                SUPPORTED_OUTPUT_FORMATS.join(", ")
            ))),
    }
}
