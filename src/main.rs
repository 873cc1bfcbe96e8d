//! confseal: encrypt or decrypt named sections of a configuration file.
#![allow(clippy::multiple_crate_versions)]

use clap::Parser;
use confseal::orchestrator::Orchestrator;
use confseal::resolver::SectionPath;
use confseal::{config, input, report};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "confseal")]
#[command(
    about = "Encrypt or decrypt named sections of a configuration file",
    long_about = None
)]
struct Args {
    /// Operation to apply: -e to encrypt, -d to decrypt
    #[arg(value_name = "MODE", allow_hyphen_values = true)]
    mode: String,

    /// Folder containing the configuration file
    #[arg(value_name = "CONFIG_FOLDER")]
    folder: PathBuf,

    /// Preferences file to load instead of ./confseal.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Name of the configuration file inside the folder
    #[arg(long, value_name = "NAME")]
    file_name: Option<String>,

    /// Section path to manage (repeatable), replacing the configured list
    #[arg(long = "section", value_name = "PATH")]
    sections: Vec<String>,

    /// Provider used to protect sections
    #[arg(long, value_name = "NAME")]
    provider: Option<String>,

    /// File holding the hex-encoded protection key
    #[arg(long, value_name = "FILE")]
    key_file: Option<PathBuf>,

    /// Print the pending edits instead of writing the file
    #[arg(long)]
    dry_run: bool,

    /// Print the run result as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> confseal::Result<ExitCode> {
    let mut cfg = config::Config::load(args.config.as_deref())?;

    // Override config with command line args
    if let Some(file_name) = args.file_name {
        cfg.file_name = file_name;
    }
    if !args.sections.is_empty() {
        cfg.sections = args.sections;
    }
    if let Some(provider) = args.provider {
        cfg.provider = provider;
    }
    if let Some(key_file) = args.key_file {
        cfg.key_file = Some(key_file.display().to_string());
    }

    let document_path = input::find_document(&args.folder, &cfg.file_name)?;
    let sections = cfg
        .sections
        .iter()
        .map(|path| SectionPath::parse(path))
        .collect();
    let orchestrator =
        Orchestrator::new(sections, cfg.provider.clone(), cfg.providers()?).dry_run(args.dry_run);

    let (result, document) = orchestrator.run(&document_path, &args.mode)?;

    let plan = (args.dry_run && result.modified).then(|| document.edit_plan());
    if args.json {
        let json = report::render_json(&result, plan.as_ref()).map_err(io::Error::other)?;
        println!("{json}");
    } else {
        for line in report::render(&result) {
            println!("{line}");
        }
        if let Some(plan) = plan {
            let json = serde_json::to_string_pretty(&plan).map_err(io::Error::other)?;
            println!("{json}");
        }
    }

    if result.mode.is_none() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
