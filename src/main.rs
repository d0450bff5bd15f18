//! Purpose: `pgmcall` CLI entry point: inspect schemas and dry-run program calls.
//! Role: Binary crate root; parses args, loads config, dispatches, emits JSON on stdout.
//! Invariants: Commands emit JSON on stdout (pretty on a TTY, compact otherwise).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Logs go to stderr via `tracing`; stdout stays machine-readable.
use std::error::Error as StdError;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod schema_json;

use pgmcall::api::{
    Error, ErrorKind, LoopbackTransport, ParsedSchema, ProgramPath, SchemaParser, invoke,
    parse_input, to_exit_code,
};
use pgmcall::config::EngineConfig;
use schema_json::{schema_json, slots_json};

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

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
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
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `pgmcall --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let config = engine_config(cli.config.as_deref(), cli.ccsid, cli.library)
        .map_err(|err| (err, color_mode))?;

    command_dispatch::dispatch_command(cli.command, &config)
        .map_err(add_schema_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "pgmcall",
    version,
    about = "Marshal IBM i program parameters from JSON schemas",
    long_about = None,
    after_help = r#"EXAMPLES
  $ pgmcall describe orders.json
  $ pgmcall bind orders.json --input '{"id": "A1", "amt": "12.5"}'
  $ pgmcall echo orders.json --program ORD001 --input '{"id": "A1"}'

SCHEMA FORMAT
  A JSON array of field definitions, in call order:
    {"name": "id", "size": 5}                 text, 5 bytes
    {"amt": {"size": 7, "decimals": 2}}       packed decimal, 7 digits, 2 decimals
    {"addr": [{"name": "city", "size": 20}]}  struct of nested fields"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Engine config JSON file (keys: ccsid, library)",
        value_hint = ValueHint::FilePath
    )]
    config: Option<PathBuf>,
    #[arg(long, help = "Default CCSID for text fields: 37|500|871 (default: 871)")]
    ccsid: Option<u16>,
    #[arg(long, help = "Library for unqualified program names (default: *LIBL)")]
    library: Option<String>,
    #[arg(
        long,
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
    #[command(about = "Print the parsed parameter tree of a schema")]
    Describe {
        #[arg(help = "Schema file, or - for stdin", value_hint = ValueHint::FilePath)]
        schema: String,
    },
    #[command(about = "Encode input JSON into call slots and print them as hex")]
    Bind {
        #[arg(help = "Schema file, or - for stdin", value_hint = ValueHint::FilePath)]
        schema: String,
        #[command(flatten)]
        input: InputArgs,
    },
    #[command(
        about = "Bind, echo through a loopback transport, and print the assembled output",
        long_about = r#"Dry-run a program call without a host connection.

Every parameter's input bytes are handed back unchanged as its output bytes, so the
printed output shows exactly how the schema normalizes the given input."#
    )]
    Echo {
        #[arg(help = "Schema file, or - for stdin", value_hint = ValueHint::FilePath)]
        schema: String,
        #[arg(long, help = "Program name, optionally LIB/NAME")]
        program: String,
        #[command(flatten)]
        input: InputArgs,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    #[arg(long, help = "Input values as inline JSON object", conflicts_with = "input_file")]
    input: Option<String>,
    #[arg(
        long = "input-file",
        short = 'f',
        help = "Read input values from a JSON file",
        value_hint = ValueHint::FilePath
    )]
    input_file: Option<PathBuf>,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn engine_config(
    path: Option<&Path>,
    ccsid: Option<u16>,
    library: Option<String>,
) -> Result<EngineConfig, Error> {
    let mut config = match path {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    if let Some(ccsid) = ccsid {
        config.ccsid = ccsid;
    }
    if let Some(library) = library {
        config.library = library;
    }
    config.text_ccsid()?;
    Ok(config)
}

fn read_schema(source: &str, parser: &SchemaParser) -> Result<ParsedSchema, Error> {
    let text = if source == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read schema from stdin")
                .with_source(err)
        })?;
        text
    } else {
        std::fs::read_to_string(source).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read schema {source}"))
                .with_source(err)
        })?
    };
    ParsedSchema::parse_with(parser, &text)
}

fn read_input(args: &InputArgs) -> Result<Value, Error> {
    let text = match (&args.input, &args.input_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read input {}", path.display()))
                .with_source(err)
        })?,
        (None, None) => return Ok(Value::Object(Map::new())),
    };
    parse_input(&text).map_err(|err| err.with_hint("Pass a JSON object keyed by parameter name."))
}

fn add_schema_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Schema || err.hint().is_some() {
        return err;
    }
    err.with_hint("Run `pgmcall --help` for the schema format.")
}

fn emit_json(value: Value) {
    let encoded = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    let json = encoded.unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

/// Flattened view of an `Error` shared by the JSON and terminal renderings.
struct ErrorReport {
    kind: ErrorKind,
    message: String,
    details: Vec<(&'static str, String)>,
}

impl ErrorReport {
    fn from_error(err: &Error) -> Self {
        let message = err
            .message()
            .map(|message| message.trim_end().to_string())
            .unwrap_or_else(|| fallback_message(err.kind()).to_string());
        let mut details = Vec::new();
        details.extend(err.field().map(|field| ("field", field.to_string())));
        details.extend(err.hint().map(|hint| ("hint", hint.to_string())));
        let mut source = err.source();
        while let Some(cause) = source {
            details.push(("cause", cause.to_string()));
            source = cause.source();
        }
        Self {
            kind: err.kind(),
            message,
            details,
        }
    }

    fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    fn to_json(&self) -> Value {
        let mut inner = Map::new();
        inner.insert("kind".to_string(), json!(format!("{:?}", self.kind)));
        inner.insert("message".to_string(), json!(self.message));
        for key in ["field", "hint"] {
            if let Some(value) = self.detail(key) {
                inner.insert(key.to_string(), json!(value));
            }
        }
        let causes: Vec<&str> = self
            .details
            .iter()
            .filter(|(name, _)| *name == "cause")
            .map(|(_, value)| value.as_str())
            .collect();
        if !causes.is_empty() {
            inner.insert("causes".to_string(), json!(causes));
        }
        json!({ "error": Value::Object(inner) })
    }

    fn to_text(&self, use_color: bool) -> String {
        // Red for the headline, yellow for detail labels.
        let paint = |label: &str, code: &str| {
            if use_color {
                format!("\u{1b}[{code}m{label}:\u{1b}[0m")
            } else {
                format!("{label}:")
            }
        };
        let mut text = format!("{} {}", paint("error", "31"), self.message);
        for (name, value) in &self.details {
            let label = if *name == "cause" { "caused by" } else { *name };
            text.push('\n');
            text.push_str(&format!("{} {value}", paint(label, "33")));
        }
        text
    }
}

fn fallback_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::Io => "i/o error",
        ErrorKind::Schema => "invalid schema",
        ErrorKind::Encoding => "input does not fit the schema",
        ErrorKind::Decoding => "output does not match the schema",
        ErrorKind::RemoteCall => "program did not run",
    }
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let report = ErrorReport::from_error(err);
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", report.to_text(color_mode.use_color(is_tty)));
    } else {
        eprintln!("{}", report.to_json());
    }
}

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("error:").unwrap_or(line).trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}
