mod replay;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use form_validation::{
    Document, MarkupFile, ReportStatus, ValidationConfig, ValidationReport, build_report,
    enable_validation, render_json, render_text,
};
use replay::{ReplayStep, apply_steps, parse_steps};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "FORMCHECK_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Live form validation checker",
    long_about = "Wires live validation into form markup, replays user input, and reports error display and submit-control state"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaKind {
    Markup,
    Config,
    Events,
}

#[derive(Subcommand)]
enum Command {
    /// Enable validation on a markup file and report the initial state.
    Check {
        /// Path to the markup JSON.
        #[arg(long, value_name = "MARKUP")]
        markup: PathBuf,
        /// Optional validation config JSON (defaults to the popup settings).
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Enable validation, apply scripted input steps, and report the result.
    Replay {
        /// Path to the markup JSON.
        #[arg(long, value_name = "MARKUP")]
        markup: PathBuf,
        /// JSON list of `{"input": SELECTOR, "value": TEXT}` / `{"clear": SELECTOR}` steps.
        #[arg(long, value_name = "EVENTS")]
        events: PathBuf,
        /// Optional validation config JSON (defaults to the popup settings).
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the JSON Schema of an input file format.
    Schema {
        #[arg(long, value_enum)]
        kind: SchemaKind,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Check {
            markup,
            config,
            format,
        } => run_check(&markup, config.as_deref(), format),
        Command::Replay {
            markup,
            events,
            config,
            format,
        } => run_replay(&markup, &events, config.as_deref(), format),
        Command::Schema { kind } => run_schema(kind),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> CliResult<ValidationConfig> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            Ok(ValidationConfig::from_json(&json)?)
        }
        None => Ok(ValidationConfig::default()),
    }
}

fn load_document(path: &Path) -> CliResult<Document> {
    let json = fs::read_to_string(path)?;
    let markup = MarkupFile::from_json(&json)?;
    Ok(markup.build()?)
}

fn wire(markup: &Path, config: &ValidationConfig) -> CliResult<Document> {
    let mut doc = load_document(markup)?;
    let root = doc.root();
    let forms = enable_validation(&mut doc, root, config)?;
    debug!(forms, markup = %markup.display(), "markup wired");
    Ok(doc)
}

fn run_check(markup: &Path, config: Option<&Path>, format: OutputFormat) -> CliResult<()> {
    let config = load_config(config)?;
    let doc = wire(markup, &config)?;
    print_report(&build_report(&doc, doc.root(), &config)?, format)
}

fn run_replay(
    markup: &Path,
    events: &Path,
    config: Option<&Path>,
    format: OutputFormat,
) -> CliResult<()> {
    let config = load_config(config)?;
    let mut doc = wire(markup, &config)?;
    let steps: Vec<ReplayStep> = parse_steps(&fs::read_to_string(events)?)?;
    apply_steps(&mut doc, &steps, &config)?;
    print_report(&build_report(&doc, doc.root(), &config)?, format)
}

fn run_schema(kind: SchemaKind) -> CliResult<()> {
    let schema = match kind {
        SchemaKind::Markup => schema_for!(MarkupFile),
        SchemaKind::Config => schema_for!(ValidationConfig),
        SchemaKind::Events => schema_for!(Vec<ReplayStep>),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn print_report(report: &ValidationReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Text => println!("{}", render_text(report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&render_json(report))?),
    }
    if report.status == ReportStatus::Blocked {
        debug!("at least one form is blocked");
    }
    Ok(())
}
