// bases/device_renamer/src/main.rs
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

mod config;
mod directory;
mod error;
mod executor;
mod hardware;
mod host;
mod pipeline;
mod scheduler;
mod settings;
mod tag;
mod transcript;

use config::{CliArgs, Config};
use host::PowerShellHost;
use pipeline::{Pipeline, EXIT_FAILURE};
use transcript::Transcript;

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = if std::env::args_os().len() > 1 {
        Config::from_args(args)
    } else {
        // Started by the scheduled task, or by hand without options
        let mut dirs: Vec<PathBuf> = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(PathBuf::from))
            .into_iter()
            .collect();
        dirs.push(args.install_dir.clone());

        match Config::unattended(args, &dirs).await {
            Ok(config) => config,
            Err(e) => {
                init_tracing(None);
                error!("Could not load saved settings: {}", e);
                std::process::exit(EXIT_FAILURE);
            }
        }
    };

    // Exit codes outside u8 (1641) rule out `ExitCode`; the transcript is
    // closed inside `run`, before the process goes away.
    let code = run(&config).await;
    std::process::exit(code)
}

async fn run(config: &Config) -> i32 {
    let transcript = if config.is_dry_run() {
        None
    } else {
        match Transcript::open(&config.log_dir).await {
            Ok(transcript) => Some(transcript),
            Err(e) => {
                init_tracing(None);
                error!("Could not start transcript: {}", e);
                return EXIT_FAILURE;
            }
        }
    };

    init_tracing(transcript.as_ref());
    if let Some(transcript) = &transcript {
        info!("Transcript: {}", transcript.path().display());
    }

    let code = reconcile(config).await;

    if let Some(transcript) = transcript {
        transcript.finish(code);
    }
    code
}

async fn reconcile(config: &Config) -> i32 {
    if config.is_dry_run() {
        warn!("TEST MODE: the decision is reported, nothing is changed");
    } else {
        info!(
            "Starting device name reconciliation \
             (install dir {}, prefix filter {:?}, form-factor prefix {})",
            config.install_dir.display(),
            config.name_prefix.as_deref().unwrap_or_default(),
            config.naming.form_factor_prefix
        );
        match tag::write_install_tag(&config.install_dir).await {
            Ok(path) => info!("Install tag: {}", path.display()),
            Err(e) => {
                error!("Could not write install tag: {}", e);
                return EXIT_FAILURE;
            }
        }
    }

    let self_path = match std::env::current_exe() {
        Ok(path) => path,
        Err(e) => {
            error!("Could not locate own executable: {}", e);
            return EXIT_FAILURE;
        }
    };

    let host = PowerShellHost::new();
    let report = Pipeline::new(&host, config).run(&self_path).await;
    let code = report.exit_code();
    info!("Run complete: {}, exit code {}", report.outcome, code);
    code
}

/// Console output always; the transcript file gets the same lines without color
fn init_tracing(transcript: Option<&Transcript>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rename_device=info".into());

    let file_layer = transcript.map(|transcript| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(transcript.writer())
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
}
