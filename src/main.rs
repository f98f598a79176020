//! Purpose: `summary-desk` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit JSON on stdout; pretty when stdout is a terminal.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code` or the orchestrator outcome.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::net::SocketAddr;

use clap::{Args, CommandFactory, Parser, Subcommand, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;

mod command_dispatch;
mod serve;

use summary_desk::api::{Error, ErrorKind, RemoteClient, Summary, to_exit_code};
use summary_desk::manager::{FormField, Outcome, StatusMessage, SummaryManager};

const DEFAULT_URL: &str = "http://127.0.0.1:4000";

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
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
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
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `summary-desk --help`."));
            }
        },
    };

    let context = Context {
        store: cli.store,
        url: cli.url,
    };
    command_dispatch::dispatch_command(cli.command, &context)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
}

#[derive(Parser)]
#[command(
    name = "summary-desk",
    version,
    about = "Store, search, and edit text summaries over a small JSON API",
    long_about = None,
    after_help = r#"EXAMPLES
  $ summary-desk serve --store ./summaries.jsonl
  $ summary-desk add --id S-1 --text "the quick brown fox" --summary "fox runs" --keywords "animal, speed" --rating 4.5
  $ summary-desk search animal
  $ summary-desk find --min-rating 1 --max-rating 3
  $ summary-desk update S-1 --rating 5
  $ summary-desk delete S-1"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "SUMMARY_DESK_STORE",
        default_value = "memory:",
        help = "Store URI for `serve`: memory:, file:///path, or a plain path"
    )]
    store: String,
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_URL,
        help = "Base URL of a running summary-desk server"
    )]
    url: String,

    #[command(subcommand)]
    command: Command,
}

struct Context {
    store: String,
    url: String,
}

impl Context {
    fn client(&self) -> Result<RemoteClient, Error> {
        RemoteClient::new(self.url.clone())
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Run the HTTP/JSON server",
        after_help = r#"EXAMPLES
  $ summary-desk serve
  $ summary-desk serve --bind 127.0.0.1:4100 --store file:///var/lib/summaries.jsonl
  $ summary-desk serve --cors-origin http://localhost:3000

NOTES
  - Binding a non-loopback address requires --allow-non-loopback.
  - Logging honors RUST_LOG (default: info)."#
    )]
    Serve {
        #[arg(long, default_value = serve::DEFAULT_BIND, help = "Address to listen on")]
        bind: String,
        #[arg(long, help = "Permit binding to a non-loopback address")]
        allow_non_loopback: bool,
        #[arg(long, default_value_t = serve::DEFAULT_MAX_BODY_BYTES, help = "Request body limit in bytes")]
        max_body_bytes: u64,
        #[arg(long = "cors-origin", help = "Allowed browser origin (repeatable)")]
        cors_origins: Vec<String>,
    },
    #[command(about = "Create a summary from form fields")]
    Add(FormArgs),
    #[command(
        arg_required_else_help = true,
        about = "Replace a summary; unspecified fields keep their stored values"
    )]
    Update {
        #[arg(id = "target_id", value_name = "ID", help = "Summary id to replace")]
        id: String,
        #[command(flatten)]
        form: FormArgs,
    },
    #[command(arg_required_else_help = true, about = "Delete a summary by id")]
    Delete {
        #[arg(help = "Summary id to delete")]
        id: String,
    },
    #[command(about = "Search by exact keyword; no keyword lists everything")]
    Search {
        #[arg(help = "Keyword to match exactly")]
        keyword: Option<String>,
    },
    #[command(about = "List all summaries, newest first")]
    List,
    #[command(arg_required_else_help = true, about = "Fetch one summary by id")]
    Get {
        #[arg(help = "Summary id")]
        id: String,
    },
    #[command(
        about = "Find summaries by one criterion",
        after_help = r#"EXAMPLES
  $ summary-desk find --text fox
  $ summary-desk find --keyword animal
  $ summary-desk find --timestamp 2024-01-01T00:00:00Z
  $ summary-desk find --min-rating 1 --max-rating 3"#
    )]
    Find(FindArgs),
    #[command(arg_required_else_help = true, about = "Generate shell completions")]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

/// Raw form fields, passed through to the orchestrator unvalidated.
#[derive(Args, Debug, Default)]
struct FormArgs {
    #[arg(long, help = "Summary id")]
    id: Option<String>,
    #[arg(long, help = "Original text")]
    text: Option<String>,
    #[arg(long, help = "Summary text")]
    summary: Option<String>,
    #[arg(long, help = "Comma-separated keywords")]
    keywords: Option<String>,
    #[arg(long, help = "Rating from 1 to 5")]
    rating: Option<String>,
    #[arg(long, help = "Word count (derived from --text when omitted)")]
    word_count: Option<String>,
}

impl FormArgs {
    fn fields(&self) -> [(FormField, Option<&String>); 6] {
        [
            (FormField::SummaryId, self.id.as_ref()),
            (FormField::OriginalText, self.text.as_ref()),
            (FormField::Summary, self.summary.as_ref()),
            (FormField::Keywords, self.keywords.as_ref()),
            (FormField::Rating, self.rating.as_ref()),
            (FormField::WordCount, self.word_count.as_ref()),
        ]
    }
}

#[derive(Args, Debug)]
struct FindArgs {
    #[arg(long, help = "Case-insensitive fragment of the original text")]
    text: Option<String>,
    #[arg(long, help = "Exact stored timestamp")]
    timestamp: Option<String>,
    #[arg(long, help = "Exact keyword")]
    keyword: Option<String>,
    #[arg(long, requires = "max_rating", help = "Inclusive lower rating bound")]
    min_rating: Option<f64>,
    #[arg(long, requires = "min_rating", help = "Inclusive upper rating bound")]
    max_rating: Option<f64>,
}

fn parse_bind(bind: &str) -> Result<SocketAddr, Error> {
    bind.parse().map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid bind address")
            .with_hint("Use a host:port value like 127.0.0.1:4000.")
    })
}

fn runtime() -> Result<tokio::runtime::Runtime, Error> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to start async runtime")
                .with_source(err)
        })
}

fn outcome_exit_code(outcome: Outcome) -> i32 {
    match outcome {
        Outcome::Succeeded => 0,
        Outcome::Rejected(_) => to_exit_code(ErrorKind::Usage),
        Outcome::NotFound => to_exit_code(ErrorKind::NotFound),
        Outcome::Failed => to_exit_code(ErrorKind::Internal),
    }
}

fn outcome_name(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Succeeded => "succeeded",
        Outcome::Rejected(_) => "rejected",
        Outcome::NotFound => "not_found",
        Outcome::Failed => "failed",
    }
}

fn status_json(status: Option<StatusMessage>) -> Value {
    match status {
        Some(message) => json!({
            "text": message.text,
            "severity": message.severity.as_str(),
        }),
        None => Value::Null,
    }
}

/// Report of one orchestrated action: outcome, status line, and the
/// result list the manager holds afterwards.
fn manager_report(manager: &SummaryManager<RemoteClient>, outcome: Outcome) -> Value {
    let mut report = Map::new();
    report.insert("outcome".to_string(), json!(outcome_name(outcome)));
    report.insert("status".to_string(), status_json(manager.status()));
    if let Outcome::Rejected(rejection) = outcome {
        report.insert("rejection".to_string(), json!(rejection.as_str()));
    }
    report.insert("summaries".to_string(), summaries_json(manager.results()));
    Value::Object(report)
}

fn summaries_json(records: &[Summary]) -> Value {
    serde_json::to_value(records).unwrap_or_else(|_| Value::Array(Vec::new()))
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
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
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::AlreadyExists => "already exists".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
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
    inner.insert("kind".to_string(), json!(err.kind().as_str()));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(id) = err.id() {
        inner.insert("id".to_string(), json!(id));
    }
    if let Some(line) = err.line() {
        inner.insert("line".to_string(), json!(line));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(id) = err.id() {
        lines.push(format!("id: {id}"));
    }
    for cause in error_causes(err) {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Io => err.with_hint("Is the server running? Start it with `summary-desk serve` or pass --url."),
        ErrorKind::Permission => {
            err.with_hint("Permission denied. Check store file permissions or pick another --store.")
        }
        ErrorKind::Corrupt => {
            err.with_hint("The store file has a malformed line. Fix or remove that line.")
        }
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_LOG=debug and share the command if it persists.",
    )
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
