//! Purpose: `taxon` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, renders listings on stdout.
//! Invariants: Listing output on stdout follows `--format` exactly; diagnostics go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Free-form `--<field>=<value>` flags under `taxonomy list` become filters.
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use taxon::api::{Error, ErrorKind, parse_filter_arg, to_exit_code};
use taxon::notice::{Notice, notice_json};

/// Long flags that keep their clap meaning under `taxonomy list`.
const CONTROL_FLAGS: &[&str] = &[
    "field", "fields", "format", "filter", "registry", "color", "help", "version",
];

/// Global flags whose value may follow as a separate token.
const GLOBAL_VALUE_FLAGS: &[&str] = &["--registry", "--color"];

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_env("TAXON_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command, cli.registry, color_mode)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

/// Rewrite argv so clap can parse free-form filters.
///
/// After `taxonomy list`, every `--<name>[=<value>]` whose name is not a
/// control flag becomes `--filter <name>[=<value>]`. Everything after a bare
/// `--` is left alone. The value of a space-separated global flag is never
/// taken for a subcommand name.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut normalized = Vec::new();
    let mut previous_positional: Option<String> = None;
    let mut in_list = false;
    let mut passthrough = false;
    let mut skip_value = false;

    for arg in args {
        let Some(text) = arg.to_str() else {
            normalized.push(arg);
            continue;
        };
        let text = match text {
            "---help" => "--help",
            "---version" => "--version",
            other => other,
        };
        if passthrough {
            normalized.push(OsString::from(text));
            continue;
        }
        if text == "--" {
            passthrough = true;
            normalized.push(OsString::from(text));
            continue;
        }
        if skip_value {
            skip_value = false;
            normalized.push(OsString::from(text));
            continue;
        }
        if GLOBAL_VALUE_FLAGS.contains(&text) {
            skip_value = true;
            normalized.push(OsString::from(text));
            continue;
        }
        if in_list {
            if let Some(filter) = fold_filter_flag(text) {
                normalized.push(OsString::from("--filter"));
                normalized.push(OsString::from(filter));
                continue;
            }
        }
        if !text.starts_with('-') {
            if previous_positional.as_deref() == Some("taxonomy") && text == "list" {
                in_list = true;
            }
            previous_positional = Some(text.to_string());
        }
        normalized.push(OsString::from(text));
    }
    normalized
}

fn fold_filter_flag(arg: &str) -> Option<String> {
    let body = arg.strip_prefix("--")?;
    if body.is_empty() || body.starts_with('-') {
        return None;
    }
    let name = body.split_once('=').map_or(body, |(name, _)| name);
    if CONTROL_FLAGS.contains(&name) {
        return None;
    }
    Some(body.to_string())
}

#[derive(Parser)]
#[command(
    name = "taxon",
    version,
    about = "List taxonomies registered with a content host",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Taxonomies come from a registry snapshot (--registry / TAXON_REGISTRY)
or, when none is given, from the host's built-in taxonomies.
"#,
    after_help = r#"EXAMPLES
  $ taxon taxonomy list
  $ taxon taxonomy list --format=csv
  $ taxon taxonomy list --object-type=post --fields=name,public
  $ taxon --registry ./taxonomies.json taxonomy list --format=json

LEARN MORE
  $ taxon <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "TAXON_REGISTRY",
        help = "Registry snapshot file (JSON); default: built-in taxonomies",
        value_hint = ValueHint::FilePath
    )]
    registry: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Manage taxonomies",
        after_help = r#"EXAMPLES
  $ taxon taxonomy list
  $ taxon taxonomy list --format=count"#
    )]
    Taxonomy {
        #[command(subcommand)]
        command: TaxonomyCommand,
    },
    #[command(
        about = "Print version info",
        long_about = r#"Print version info (JSON when stdout is not a terminal)."#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout."#,
        after_help = r#"EXAMPLES
  $ taxon completion bash > ~/.local/share/bash-completion/completions/taxon
  $ taxon completion zsh > ~/.zfunc/_taxon"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum TaxonomyCommand {
    #[command(
        about = "List taxonomies",
        long_about = r#"List registered taxonomies.

Any --<field>=<value> flag filters the listing; all filters must match."#,
        after_help = r#"EXAMPLES
  $ taxon taxonomy list --format=csv
  $ taxon taxonomy list --object-type=post --fields=name,public
  $ taxon taxonomy list --public --field=name

AVAILABLE FIELDS
  Shown by default: name, label, description, object_type,
  show_tagcloud, hierarchical, public

NOTES
  - Filters compare exactly; object_type must equal the whole list
  - Booleans render as 1 / empty in table and csv output
  - --field wins over --fields and drops the header"#
    )]
    List {
        #[arg(
            long = "filter",
            value_name = "FIELD=VALUE",
            value_parser = parse_filter_arg,
            help = "Filter by field (repeatable; same as --<field>=<value>)"
        )]
        filters: Vec<(String, String)>,
        #[arg(long, help = "Print the value of a single field for each taxonomy")]
        field: Option<String>,
        #[arg(long, help = "Limit output to these comma-separated fields")]
        fields: Option<String>,
        #[arg(long, default_value = "table", help = "Output format: table|csv|json|count")]
        format: String,
    },
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() == ErrorKind::Internal && err.hint().is_none() {
        return err.with_hint("Re-run with TAXON_LOG=debug for details.");
    }
    err
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("taxon {}", env!("CARGO_PKG_VERSION"));
    } else {
        let value = json!({
            "name": "taxon",
            "version": env!("CARGO_PKG_VERSION"),
        });
        println!("{value}");
    }
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {}", notice.message);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::InvalidFormat => "invalid output format".to_string(),
        ErrorKind::UnknownField => "unknown field".to_string(),
        ErrorKind::SourceUnavailable => "record source unavailable".to_string(),
        ErrorKind::Corrupt => "corrupt data".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(field) = err.field() {
        inner.insert("field".to_string(), json!(field));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(field) = err.field() {
        lines.push(format!(
            "{} {field}",
            colorize_label("field:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `taxon --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "taxon") else {
        return "Try `taxon --help`.".to_string();
    };

    let mut parts = Vec::new();
    for token in tokens.iter().skip(pos + 1) {
        if token.starts_with('-') || token.starts_with('<') || token.starts_with('[') {
            break;
        }
        parts.push(*token);
    }

    if parts.is_empty() {
        return "Try `taxon --help`.".to_string();
    }

    format!("Try `taxon {} --help`.", parts.join(" "))
}
