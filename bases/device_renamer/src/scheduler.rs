//! Self-healing scheduler
//!
//! Makes sure a recurring task re-runs the whole pipeline until the device
//! converges. Registration is idempotent: an existing task is never touched
//! or duplicated.
//!
//! The presence check and the registration run under an exclusive lock file
//! in the install directory. Two invocations firing together (logon and
//! startup triggers) therefore cannot both register; the loser reports
//! `ScheduleStatus::Contended` and leaves registration to the holder.
//!
//! The holder also saves the run's settings for the task's option-less
//! runs, whether or not the task already existed.

use crate::error::{RenamerError, Result};
use crate::host::HostPlatform;
use crate::settings::SavedSettings;
use chrono::NaiveTime;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Well-known identity of the recurring task
pub const TASK_NAME: &str = "DeviceNameReconciliation";

const LOCK_FILE_NAME: &str = "registration.lock";

/// Hour and minute of the daily trigger
const DAILY_AT: (u32, u32) = (12, 0);

/// Upper bound of the random delay on logon and startup triggers
const RANDOM_DELAY: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskTrigger {
    Daily { at: NaiveTime },
    AtLogon { random_delay: Duration },
    AtStartup { random_delay: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPrincipal {
    pub user_id: String,
    pub highest_privileges: bool,
}

impl TaskPrincipal {
    pub fn local_system() -> Self {
        Self {
            user_id: "SYSTEM".to_string(),
            highest_privileges: true,
        }
    }
}

/// A recurring re-invocation of this program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTaskSpec {
    pub name: String,
    pub program: PathBuf,
    pub arguments: Vec<String>,
    pub triggers: Vec<TaskTrigger>,
    pub principal: TaskPrincipal,
}

impl ScheduledTaskSpec {
    /// The reconciliation task: daily, at logon and at startup, as SYSTEM,
    /// with no arguments so every scheduled run uses the defaults
    pub fn reconciliation(program: PathBuf) -> Self {
        let (hour, minute) = DAILY_AT;
        Self {
            name: TASK_NAME.to_string(),
            program,
            arguments: Vec::new(),
            triggers: vec![
                TaskTrigger::Daily {
                    at: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default(),
                },
                TaskTrigger::AtLogon {
                    random_delay: RANDOM_DELAY,
                },
                TaskTrigger::AtStartup {
                    random_delay: RANDOM_DELAY,
                },
            ],
            principal: TaskPrincipal::local_system(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    /// The task already existed and was left untouched
    AlreadyPresent,
    /// The task was absent and has been registered
    Registered,
    /// Another invocation holds the registration lock
    Contended,
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleStatus::AlreadyPresent => write!(f, "already present"),
            ScheduleStatus::Registered => write!(f, "registered"),
            ScheduleStatus::Contended => write!(f, "registration held by another run"),
        }
    }
}

/// Exclusive lock held for the duration of a presence check + registration
#[derive(Debug)]
struct RegistrationLock {
    file: File,
}

impl RegistrationLock {
    /// Returns `None` when another process holds the lock
    fn try_acquire(path: &Path) -> Result<Option<Self>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| RenamerError::Lock {
                path: path.to_path_buf(),
                source: e,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file })),
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => Err(RenamerError::Lock {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

/// Whether a failed lock attempt means another holder, as opposed to an
/// I/O problem
fn is_contended(error: &std::io::Error) -> bool {
    let contended = fs2::lock_contended_error();
    error.raw_os_error().is_some() && error.raw_os_error() == contended.raw_os_error()
}

impl Drop for RegistrationLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release registration lock: {}", e);
        }
    }
}

pub struct SelfHealingScheduler<'a, H> {
    host: &'a H,
    install_dir: PathBuf,
}

impl<'a, H: HostPlatform> SelfHealingScheduler<'a, H> {
    pub fn new(host: &'a H, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            host,
            install_dir: install_dir.into(),
        }
    }

    /// Ensure the reconciliation task exists, registering it if absent.
    ///
    /// `self_path` is the running executable; a copy of it in the install
    /// directory is what the task invokes, with `settings` next to it.
    pub async fn ensure_scheduled(
        &self,
        self_path: &Path,
        settings: &SavedSettings,
    ) -> Result<ScheduleStatus> {
        self.ensure(self_path, settings)
            .await
            .map_err(|e| RenamerError::scheduler(TASK_NAME, e))
    }

    async fn ensure(&self, self_path: &Path, settings: &SavedSettings) -> Result<ScheduleStatus> {
        tokio::fs::create_dir_all(&self.install_dir)
            .await
            .map_err(|e| RenamerError::io("create install directory", e))?;

        let Some(_lock) = RegistrationLock::try_acquire(&self.install_dir.join(LOCK_FILE_NAME))?
        else {
            warn!("Another run is registering '{}', skipping", TASK_NAME);
            return Ok(ScheduleStatus::Contended);
        };

        settings.save(&self.install_dir).await?;

        if self.host.task_exists(TASK_NAME).await? {
            info!("Scheduled task '{}' already present", TASK_NAME);
            return Ok(ScheduleStatus::AlreadyPresent);
        }

        info!("Scheduled task '{}' missing, registering", TASK_NAME);
        self.host.restrict_directory(&self.install_dir).await?;
        let program = self.install_copy(self_path).await?;

        let spec = ScheduledTaskSpec::reconciliation(program);
        self.host.register_task(&spec).await?;
        info!(
            "Registered '{}' running {} as {}",
            spec.name,
            spec.program.display(),
            spec.principal.user_id
        );

        Ok(ScheduleStatus::Registered)
    }

    /// Copy the running program into the install directory
    async fn install_copy(&self, self_path: &Path) -> Result<PathBuf> {
        let file_name = self_path.file_name().ok_or_else(|| {
            RenamerError::io(
                "resolve executable name",
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} has no file name", self_path.display()),
                ),
            )
        })?;
        let destination = self.install_dir.join(file_name);

        if is_same_file(self_path, &destination).await {
            debug!("Already running from {}", destination.display());
            return Ok(destination);
        }

        tokio::fs::copy(self_path, &destination).await.map_err(|e| {
            RenamerError::io(format!("copy executable to {}", destination.display()), e)
        })?;
        info!("Copied {} to {}", self_path.display(), destination.display());

        Ok(destination)
    }
}

async fn is_same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
