//! Sable CLI - API surface extraction and sample usage analysis.

mod formatters;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sable_core::diag::{ApiDiagnostic, DiagnosticLevel};
use sable_core::types::{ApiIndex, CrossLanguageMap, ExtractMode, ExtractOptions, UsageIndex};
use sable_engine::TsEngine;

#[derive(Parser, Debug)]
#[command(name = "sable")]
#[command(about = "Extracts the public API surface of a TypeScript package", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Package root directory to extract
    #[arg(value_name = "ROOT")]
    root: Option<PathBuf>,

    /// Emit the API graph as JSON (default)
    #[arg(long)]
    json: bool,

    /// Emit declaration-stub text instead of JSON
    #[arg(long)]
    stub: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Load sources or published declaration files
    #[arg(long, value_enum, default_value = "source")]
    mode: ModeArg,

    /// Declarations root for compiled mode
    #[arg(long, value_name = "PATH")]
    dts_root: Option<PathBuf>,

    /// Explicit manifest path (defaults to ROOT/package.json)
    #[arg(long, value_name = "PATH")]
    package_json: Option<PathBuf>,

    /// Cross-language ID map to join into the graph
    #[arg(long, value_name = "PATH")]
    id_map: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Analyze which API operations a directory of samples exercises
    Usage {
        /// ApiIndex JSON path, or `-` for stdin
        #[arg(value_name = "API_JSON")]
        api: String,

        /// Directory of sample source files
        #[arg(value_name = "SAMPLES_DIR")]
        samples: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Combine an API graph and a usage index into a coverage report
    Coverage {
        /// ApiIndex JSON path, or `-` for stdin
        #[arg(value_name = "API_JSON")]
        api: String,

        /// UsageIndex JSON path
        #[arg(value_name = "USAGE_JSON")]
        usage: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Source,
    Compiled,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        let diag = ApiDiagnostic {
            id: "FATAL".to_string(),
            level: DiagnosticLevel::Error,
            message: format!("{err:#}"),
            type_name: None,
        };
        emit_diagnostic(&diag);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Usage {
            api,
            samples,
            pretty,
        }) => run_usage(&api, &samples, pretty),
        Some(Command::Coverage { api, usage, pretty }) => run_coverage(&api, &usage, pretty),
        None => run_extract(cli),
    }
}

fn run_extract(cli: Cli) -> Result<()> {
    let root = cli
        .root
        .clone()
        .context("a package root directory is required")?;

    let cross_language_map = match &cli.id_map {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read id map {}", path.display()))?;
            let map: CrossLanguageMap =
                serde_json::from_str(&text).context("invalid cross-language map")?;
            Some(map)
        }
        None => None,
    };

    let options = ExtractOptions {
        root,
        mode: match cli.mode {
            ModeArg::Source => ExtractMode::Source,
            ModeArg::Compiled => ExtractMode::Compiled,
        },
        declarations_root: cli.dts_root.clone(),
        manifest_path: cli.package_json.clone(),
        cross_language_map,
        ..Default::default()
    };

    let engine = TsEngine::new()?;
    let index = engine.extract(options)?;

    for diagnostic in &index.diagnostics {
        emit_diagnostic(diagnostic);
    }

    if cli.stub {
        print!("{}", formatters::stub::render_stub(&index));
    } else {
        println!("{}", formatters::json::render(&index, cli.pretty)?);
    }
    Ok(())
}

fn run_usage(api: &str, samples: &std::path::Path, pretty: bool) -> Result<()> {
    let index = load_api_index(api)?;
    let usage = sable_usage::analyze_usage(&index, samples, &Default::default())?;
    println!("{}", formatters::json::render(&usage, pretty)?);
    Ok(())
}

fn run_coverage(api: &str, usage_path: &std::path::Path, pretty: bool) -> Result<()> {
    let index = load_api_index(api)?;
    let usage_text = std::fs::read_to_string(usage_path)
        .with_context(|| format!("cannot read usage index {}", usage_path.display()))?;
    let usage: UsageIndex =
        serde_json::from_str(&usage_text).context("invalid usage index JSON")?;

    let report = sable_usage::build_coverage(&index, &usage);
    println!("{}", formatters::json::render(&report, pretty)?);
    Ok(())
}

/// Load an ApiIndex from a path, or from stdin when the path is `-`.
fn load_api_index(path: &str) -> Result<ApiIndex> {
    let text = if path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("cannot read API index from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("cannot read API index {path}"))?
    };
    serde_json::from_str(&text).context("invalid API index JSON")
}

/// One structured diagnostic per line on the sideband stream.
fn emit_diagnostic(diagnostic: &ApiDiagnostic) {
    if let Ok(line) = serde_json::to_string(diagnostic) {
        eprintln!("{line}");
    }
}
