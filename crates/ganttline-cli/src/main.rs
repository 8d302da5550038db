//! ganttline CLI - Gantt task model and layout engine
//!
//! Command-line interface for turning CSV task rows into a Gantt model and
//! for driving its collapse state.

mod input;
mod report;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ganttline_core::{Clock, FixedClock, SystemClock};
use ganttline_layout::{GanttEngine, GanttModel, PersistedCollapse, UpdateOutcome};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ganttline")]
#[command(author, version, about = "Gantt task model and layout engine", long_about = None)]
struct Cli {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Inputs shared by every command
#[derive(clap::Args)]
struct Source {
    /// CSV file with one task per row
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Settings file (TOML)
    #[arg(short, long, env = "GANTTLINE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Persisted collapsed task list (JSON array of names)
    #[arg(short, long, default_value = "[]")]
    collapsed: String,

    /// Sort sibling tasks by name (asc, desc)
    #[arg(long, value_parser = input::parse_sort)]
    sort: Option<ganttline_core::SortDirection>,

    /// Current time for rows without a start date (YYYY-MM-DD[ HH:MM[:SS]])
    #[arg(long, value_parser = input::parse_now)]
    now: Option<chrono::NaiveDateTime>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the task model and layout
    Build {
        #[command(flatten)]
        source: Source,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Toggle a task's collapse state and print the list to persist
    Toggle {
        #[command(flatten)]
        source: Source,

        /// Task name to toggle
        #[arg(value_name = "NAME", required_unless_present = "all")]
        name: Option<String>,

        /// Collapse every parent, or expand all when anything is collapsed
        #[arg(long, conflicts_with = "name")]
        all: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Some(Commands::Build {
            source,
            format,
            output,
        }) => cmd_build(&source, format, output.as_deref()),
        Some(Commands::Toggle { source, name, all }) => cmd_toggle(&source, name.as_deref(), all),
        None => {
            println!("ganttline - Gantt task model and layout engine");
            println!("Run with --help for usage information");
            Ok(())
        }
    }
}

/// Run one full update from the command-line inputs
fn load(source: &Source) -> Result<(GanttEngine, GanttModel)> {
    let settings = input::read_settings(source.settings.as_deref())?;
    let table = input::read_rows(&source.file, source.sort)?;

    // Validate up front so a typo is reported instead of silently ignored
    let persisted = PersistedCollapse::new(source.collapsed.clone(), "cli");
    persisted.collapsed().context("Invalid --collapsed list")?;

    let clock: Box<dyn Clock> = match source.now {
        Some(now) => Box::new(FixedClock(now)),
        None => Box::new(SystemClock),
    };
    let mut engine = GanttEngine::new(settings).with_boxed_clock(clock);
    let model = match engine.update(&table, &persisted) {
        UpdateOutcome::Rendered(model) => model,
        UpdateOutcome::Echo => bail!("Refresh was treated as an echo"),
    };
    info!(
        file = %source.file.display(),
        tasks = model.tasks.len(),
        rows = model.grouped.len(),
        "model built"
    );
    Ok((engine, model))
}

fn cmd_build(source: &Source, format: Format, output: Option<&Path>) -> Result<()> {
    let (_, model) = load(source)?;
    let rendered = match format {
        Format::Text => report::render_text(&model),
        Format::Json => {
            let mut json =
                serde_json::to_string_pretty(&model).context("Failed to serialize model")?;
            json.push('\n');
            json
        }
    };

    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn cmd_toggle(source: &Source, name: Option<&str>, all: bool) -> Result<()> {
    let (mut engine, _) = load(source)?;
    let transition = match (name, all) {
        (_, true) => engine.toggle_all(),
        (Some(name), false) => engine.toggle(name),
        (None, false) => bail!("Give a task name or --all"),
    };
    let Some(transition) = transition else {
        bail!("Nothing to toggle: '{}' has no visible children", name.unwrap_or("*"));
    };

    let collapsed = transition.persisted.collapsed()?;
    println!("{}", serde_json::to_string(&collapsed)?);
    Ok(())
}
