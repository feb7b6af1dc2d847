use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use mmash_dataset::archive::HttpArchiveClient;
use mmash_dataset::config::{ConfigLoader, DEFAULT_ROOT, DatasetConfig};
use mmash_dataset::dataset::{MmashDataset, ProgressSink};
use mmash_dataset::error::MmashError;
use mmash_dataset::output::{JsonOutput, LoadSummary, OutputMode, StderrProgress};

#[derive(Parser)]
#[command(name = "mmash")]
#[command(about = "Fetch the MMASH dataset and load per-subject tables")]
#[command(version, author)]
struct Cli {
    /// Storage root; the archive is extracted under <root>/MMASH.
    #[arg(long, default_value = DEFAULT_ROOT)]
    root: String,

    /// Tables to load: sleep, activity, user_info, questionnaire, rr.
    #[arg(long, value_delimiter = ',')]
    tables: Vec<String>,

    #[arg(long)]
    dev: bool,

    /// JSON configuration file; replaces --root, --tables and --dev.
    #[arg(long)]
    config: Option<String>,

    /// Alternative archive location.
    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<MmashError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MmashError) -> u8 {
    match error {
        MmashError::MissingTables { .. }
        | MmashError::UnsupportedTable { .. }
        | MmashError::ConfigRead(_)
        | MmashError::ConfigParse(_) => 2,
        MmashError::ArchiveHttp(_) | MmashError::ArchiveStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::resolve(path)?,
        None => DatasetConfig::new(cli.root.as_str(), &cli.tables, cli.dev)?,
    };
    if let Some(url) = cli.url {
        config = config.with_archive_url(url);
    }

    let client = HttpArchiveClient::new()?;
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Interactive => &StderrProgress,
        OutputMode::NonInteractive => &JsonOutput,
    };
    let dataset = MmashDataset::new(config, &client, sink)?;

    JsonOutput::print_summary(&LoadSummary::from(&dataset)).into_diagnostic()?;
    Ok(())
}
