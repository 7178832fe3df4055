// bases/device_renamer/src/config.rs
use crate::error::Result;
use crate::settings::{self, SavedSettings};
use clap::Parser;
use identity_primitives::NamingScheme;
use std::path::PathBuf;
use std::time::Duration;

/// Default stable location for the executable copy, lock and install tag
pub const DEFAULT_INSTALL_DIR: &str = r"C:\ProgramData\DeviceRenamer";

/// Default restart grace window shown to the interactive user
pub const DEFAULT_RESTART_DELAY_SECS: u64 = 600;

/// Execution mode for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Compute and report the decision without touching the device
    DryRun,
    /// Rename, register the scheduled task, write transcript and tag
    Apply,
}

/// Renamer configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub execution_mode: ExecutionMode,

    /// Only act on devices whose current name starts with this
    pub name_prefix: Option<String>,

    pub naming: NamingScheme,

    pub install_dir: PathBuf,

    pub log_dir: PathBuf,

    pub restart_delay: Duration,
}

/// Rename this device to its hardware-derived canonical name
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Only run when the current computer name starts with PREFIX
    ///
    /// A device whose name does not match is left alone and the run still
    /// exits successfully.
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Test mode - report the decision without renaming or scheduling
    #[arg(long, alias = "dry-run")]
    pub test: bool,

    /// Prepend a one-letter form-factor prefix (D, L or V) to the name
    #[arg(long)]
    pub form_factor_prefix: bool,

    /// Stable directory for the scheduled copy of this program
    #[arg(long, value_name = "DIR", default_value = DEFAULT_INSTALL_DIR)]
    pub install_dir: PathBuf,

    /// Transcript directory (defaults to <INSTALL_DIR>\Logs)
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Seconds between a successful rename and the forced restart
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_RESTART_DELAY_SECS)]
    pub restart_delay: u64,
}

impl Config {
    /// Create configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Self {
        let execution_mode = if args.test {
            ExecutionMode::DryRun
        } else {
            ExecutionMode::Apply
        };

        let naming = if args.form_factor_prefix {
            NamingScheme::default().with_form_factor_prefix()
        } else {
            NamingScheme::default()
        };

        // An empty filter would match everything anyway
        let name_prefix = args
            .prefix
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        let log_dir = args
            .log_dir
            .unwrap_or_else(|| args.install_dir.join("Logs"));

        Self {
            execution_mode,
            name_prefix,
            naming,
            install_dir: args.install_dir,
            log_dir,
            restart_delay: Duration::from_secs(args.restart_delay),
        }
    }

    /// Apply-mode configuration for a run started without options, from the
    /// settings saved in `install_dir`
    pub fn from_saved(install_dir: PathBuf, saved: SavedSettings) -> Self {
        Self {
            execution_mode: ExecutionMode::Apply,
            name_prefix: saved.name_prefix,
            naming: saved.naming,
            install_dir,
            log_dir: saved.log_dir,
            restart_delay: Duration::from_secs(saved.restart_delay_secs),
        }
    }

    /// Configuration for a run started without options: the settings saved
    /// in the first of `dirs` that has them, else the defaults in `args`
    pub async fn unattended(args: CliArgs, dirs: &[PathBuf]) -> Result<Self> {
        Ok(match settings::find_saved(dirs).await? {
            Some((install_dir, saved)) => Self::from_saved(install_dir, saved),
            None => Self::from_args(args),
        })
    }

    /// The options a scheduled run must reproduce
    pub fn saved_settings(&self) -> SavedSettings {
        SavedSettings {
            name_prefix: self.name_prefix.clone(),
            naming: self.naming,
            log_dir: self.log_dir.clone(),
            restart_delay_secs: self.restart_delay.as_secs(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.execution_mode == ExecutionMode::DryRun
    }

    /// Whether the prefix filter lets a device with this name through
    pub fn accepts_name(&self, current_name: &str) -> bool {
        match &self.name_prefix {
            None => true,
            Some(prefix) => current_name
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix)),
        }
    }
}
