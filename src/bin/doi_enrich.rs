use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use doi_enrich::app::{App, RunSummary};
use doi_enrich::config::{ConfigLoader, ConfigOverrides};
use doi_enrich::domain::{Acceptance, Variant};
use doi_enrich::error::EnrichError;
use doi_enrich::http::ReqwestClient;
use doi_enrich::input::read_dois;
use doi_enrich::output::{JsonOutput, OutputMode};
use doi_enrich::tui::{FilePicker, Tui};

#[derive(Parser)]
#[command(name = "doi-enrich")]
#[command(about = "Look up title, abstract and citation data for a CSV list of DOIs")]
#[command(version, author)]
struct Cli {
    /// CSV file with a DOI column; opens a file picker when omitted.
    #[arg(long, short)]
    input: Option<Utf8PathBuf>,

    /// Output path (default: output.csv).
    #[arg(long, short)]
    output: Option<Utf8PathBuf>,

    #[arg(long)]
    variant: Option<Variant>,

    #[arg(long)]
    acceptance: Option<Acceptance>,

    #[arg(long)]
    config: Option<String>,

    /// No TUI: progress goes to the log and a JSON summary to stdout.
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<EnrichError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &EnrichError) -> u8 {
    match error {
        EnrichError::ConfigRead(_)
        | EnrichError::ConfigParse(_)
        | EnrichError::InvalidProvider(_) => 2,
        EnrichError::InputRead { .. } | EnrichError::OutputWrite { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::builder()
        .with_default_directive(default_log_level(cli.non_interactive).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(
        cli.config.as_deref(),
        ConfigOverrides {
            variant: cli.variant,
            acceptance: cli.acceptance,
            output: cli.output,
        },
    )
    .map_err(miette::Report::new)?;

    let input = match (cli.input, output_mode) {
        (Some(path), _) => Some(path),
        (None, OutputMode::Interactive) => FilePicker::new(&Utf8PathBuf::from(".")).pick()?,
        (None, OutputMode::NonInteractive) => None,
    };
    let Some(input) = input else {
        println!("❌ {}.", capitalize(&EnrichError::NoFileSelected.to_string()));
        return Ok(());
    };

    let dois = match read_dois(&input) {
        Ok(dois) => dois,
        Err(err) if err.is_input_error() => {
            println!("❌ {}.", capitalize(&err.to_string()));
            return Ok(());
        }
        Err(err) => return Err(miette::Report::new(err)),
    };
    if dois.is_empty() {
        println!("❌ No DOIs found in {input}.");
        return Ok(());
    }
    tracing::info!(count = dois.len(), input = %input, "DOIs loaded");

    let client = ReqwestClient::new(&config).map_err(miette::Report::new)?;
    let app = App::from_config(&config, Arc::new(client));
    let output = config.output.clone();

    let result = match output_mode {
        OutputMode::NonInteractive => {
            let result = app
                .enrich(&dois, &output, &JsonOutput)
                .map_err(miette::Report::new)?;
            JsonOutput::print_summary(&result.summary).into_diagnostic()?;
            result
        }
        OutputMode::Interactive => {
            let mut tui = Tui::new();
            tui.run(move |sink| app.enrich(&dois, &output, sink))?
        }
    };

    if matches!(output_mode, OutputMode::Interactive) {
        print_summary(&result.summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!(
        "{green}✅ Exported to {}{reset}",
        summary.output.as_deref().unwrap_or("output.csv")
    );
    println!(
        "{cyan}   {} DOIs, {} resolved{reset}",
        summary.total, summary.resolved
    );
    for (provider, count) in &summary.by_provider {
        println!("{cyan}   • {provider}: {count}{reset}");
    }
    if summary.unresolved > 0 {
        println!("{yellow}⚠️ Not found: {}{reset}", summary.unresolved);
    }
}

/// Level used when `RUST_LOG` is unset. The TUI owns the terminal, so it
/// shows provider failures in its own log pane instead.
fn default_log_level(non_interactive: bool) -> LevelFilter {
    if non_interactive {
        LevelFilter::WARN
    } else {
        LevelFilter::ERROR
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
