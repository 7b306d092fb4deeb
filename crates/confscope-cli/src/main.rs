//! confscope CLI
//!
//! Produces one configuration file per scope combination declared in a
//! manifest:
//!
//! ```text
//! confscope web.config web.manifest.xml out/ --parallel true
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use colored::Colorize;
use confscope_cli::{transform_files, CliConfig, OutputStatus};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "confscope")]
#[command(
    author,
    version,
    about = "Generate per-scope configuration files from a master document and a manifest"
)]
struct Cli {
    /// Master document to transform
    master: PathBuf,

    /// Manifest declaring aliases, scopes and edits
    manifest: PathBuf,

    /// Output directory (defaults to the master's directory)
    output_dir: Option<PathBuf>,

    /// Transform scopes in parallel
    #[arg(long, value_name = "BOOL")]
    parallel: Option<bool>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?.with_env_overrides()?;
    let parallel = config.resolve_parallel(cli.parallel);
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&cli.master));

    let report = transform_files(
        &cli.master,
        &cli.manifest,
        &output_dir,
        parallel,
        &config.vocabulary,
    )
    .with_context(|| {
        format!(
            "failed to transform {} with {}",
            cli.master.display(),
            cli.manifest.display()
        )
    })?;

    for output in &report.outputs {
        let label = match output.status {
            OutputStatus::Written => "wrote".green().bold(),
            OutputStatus::Unchanged => "unchanged".yellow(),
        };
        println!("{} {}", label, output.path.display());
    }
    println!(
        "{} {} written, {} unchanged",
        "done".green().bold(),
        report.written().count(),
        report.unchanged().count()
    );
    Ok(())
}

fn default_output_dir(master: &Path) -> PathBuf {
    master
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
